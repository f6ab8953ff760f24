mod commands;
mod config;
mod presentation;
mod session;

use std::io;

use clap::Parser;
use commands::{Command, HELP};
use config::{Cli, StationConfig};
use presentation::{ConsolePresentation, Presentation};
use session::Station;
use station_ingest_core::log_line;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{self, MissedTickBehavior};

// The UI side is a single-threaded cooperative loop; the producer gets its
// own OS thread.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "fatal");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = StationConfig::resolve(&cli)?;
    tracing::debug!(?cfg, "configuration");

    let mut ui = ConsolePresentation::new(io::stdout(), cfg.display_interval(), cfg.json);
    let mut station = Station::new(&cfg);
    ui.append_log(log_line("System initialized. Waiting for connection..."));
    if cfg.auto_connect {
        station.connect(&mut ui)?;
    }

    let mut ui_tick = time::interval(cfg.consumer_period());
    ui_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let run_for = cfg.run_for();
    let deadline = async move {
        match run_for {
            Some(d) => time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = ui_tick.tick() => station.tick(&mut ui),
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(text)) => {
                    if !handle_line(&text, &mut station, &mut ui) {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => break,
            _ = &mut deadline => break,
        }
    }

    station.shutdown(&mut ui);
    Ok(())
}

/// Returns false when the operator asked to quit.
fn handle_line(text: &str, station: &mut Station, ui: &mut dyn Presentation) -> bool {
    let cmd = match text.parse::<Command>() {
        Ok(cmd) => cmd,
        Err(e) => {
            ui.append_log(log_line(&e.to_string()));
            return true;
        }
    };
    let outcome = match cmd {
        Command::Toggle => station.toggle_connection(ui),
        Command::Connect => station.connect(ui),
        Command::Disconnect => {
            station.disconnect(ui);
            Ok(())
        }
        Command::Status => {
            let s = station.status();
            ui.append_log(log_line(&format!(
                "Status | connected: {} | session: {} | points: {} | dropped: {} | elapsed: {}",
                s.connected,
                s.session,
                s.points,
                s.dropped,
                s.elapsed.as_deref().unwrap_or("-")
            )));
            Ok(())
        }
        Command::Help => {
            ui.append_log(log_line(HELP));
            Ok(())
        }
        Command::Quit => return false,
    };
    if let Err(e) = outcome {
        tracing::warn!(error = %e, "command failed");
    }
    true
}
