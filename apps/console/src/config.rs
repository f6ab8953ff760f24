use std::{path::{Path, PathBuf}, time::Duration};

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use station_ingest_core::ProducerConfig;
use station_ingest_sim::SimConfig;

#[derive(Parser, Debug, Default)]
#[command(name = "station-console", about = "Rocket ground station (simulated telemetry)")]
pub struct Cli {
    /// JSON config file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sampling rate of the telemetry producer
    #[arg(long)]
    pub producer_hz: Option<f64>,

    /// Rate of the UI drain/redraw tick
    #[arg(long)]
    pub consumer_hz: Option<f64>,

    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Points kept on the altitude chart
    #[arg(long)]
    pub series_capacity: Option<usize>,

    /// Countdown origin in seconds
    #[arg(long)]
    pub t_minus: Option<f64>,

    /// Seed the simulator for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Connect immediately instead of waiting for a command
    #[arg(long)]
    pub connect: bool,

    /// Exit after this many seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Emit chart snapshots as NDJSON on stdout
    #[arg(long)]
    pub json: bool,

    /// -v debug, -vv trace (RUST_LOG wins when set)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a positive, finite rate (got {value})")]
    Rate { field: &'static str, value: f64 },
    #[error("{field} must be at least 1")]
    Capacity { field: &'static str },
    #[error("{field} of {value} Hz gives a tick period that is zero or too long")]
    Period { field: &'static str, value: f64 },
    #[error("run duration must be positive and representable (got {0})")]
    Duration(f64),
}

/// Tick period for a rate, if it is a usable non-zero `Duration`.
fn period_of(rate_hz: f64) -> Option<Duration> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rate_hz).ok().filter(|p| !p.is_zero())
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    pub producer_rate_hz: f64,
    pub consumer_rate_hz: f64,
    pub queue_capacity: usize,
    pub series_capacity: usize,
    pub launch_t_minus_s: f64,
    /// How often the operator log gets a "Telemetry updated" line.
    pub telemetry_log_interval_ms: u64,
    /// How often the console repaints the readout panel.
    pub display_interval_ms: u64,
    pub auto_connect: bool,
    pub run_for_s: Option<f64>,
    pub json: bool,
    pub sim: SimConfig,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            producer_rate_hz: 60.0,
            consumer_rate_hz: 60.0,
            queue_capacity: 256,
            series_capacity: series::DEFAULT_CAPACITY,
            launch_t_minus_s: 60.0,
            telemetry_log_interval_ms: 1000,
            display_interval_ms: 1000,
            auto_connect: false,
            run_for_s: None,
            json: false,
            sim: SimConfig::default(),
        }
    }
}

impl StationConfig {
    /// Defaults, then the optional config file, then command-line flags.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut cfg = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        cfg.apply(cli);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply(&mut self, cli: &Cli) {
        if let Some(v) = cli.producer_hz { self.producer_rate_hz = v; }
        if let Some(v) = cli.consumer_hz { self.consumer_rate_hz = v; }
        if let Some(v) = cli.queue_capacity { self.queue_capacity = v; }
        if let Some(v) = cli.series_capacity { self.series_capacity = v; }
        if let Some(v) = cli.t_minus { self.launch_t_minus_s = v; }
        if let Some(v) = cli.duration { self.run_for_s = Some(v); }
        if cli.seed.is_some() { self.sim.seed = cli.seed; }
        self.auto_connect |= cli.connect;
        self.json |= cli.json;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("producer_rate_hz", self.producer_rate_hz),
            ("consumer_rate_hz", self.consumer_rate_hz),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Rate { field, value });
            }
            if period_of(value).is_none() {
                return Err(ConfigError::Period { field, value });
            }
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Capacity { field: "queue_capacity" });
        }
        if self.series_capacity == 0 {
            return Err(ConfigError::Capacity { field: "series_capacity" });
        }
        if let Some(d) = self.run_for_s {
            if !d.is_finite() || d <= 0.0 || Duration::try_from_secs_f64(d).is_err() {
                return Err(ConfigError::Duration(d));
            }
        }
        Ok(())
    }

    pub fn producer(&self) -> ProducerConfig {
        ProducerConfig::from_rate_hz(self.producer_rate_hz, self.launch_t_minus_s)
    }

    /// Falls back to 60 Hz for a rate `validate` would refuse.
    pub fn consumer_period(&self) -> Duration {
        period_of(self.consumer_rate_hz).unwrap_or_else(|| Duration::from_secs_f64(1.0 / 60.0))
    }

    pub fn telemetry_log_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_log_interval_ms)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_s.and_then(|d| Duration::try_from_secs_f64(d).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = StationConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.series_capacity, 100);
        assert_eq!(cfg.consumer_period(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = StationConfig::from_json(r#"{ "queue_capacity": 32, "sim": { "seed": 9 } }"#).unwrap();
        assert_eq!(cfg.queue_capacity, 32);
        assert_eq!(cfg.sim.seed, Some(9));
        assert_eq!(cfg.producer_rate_hz, 60.0);
        assert_eq!(cfg.sim.altitude_m, 0.0..=1000.0);
    }

    #[test]
    fn flags_override_file_values() {
        let mut cfg = StationConfig::from_json(r#"{ "producer_rate_hz": 10.0 }"#).unwrap();
        let cli = Cli::parse_from(["station-console", "--producer-hz", "30", "--seed", "3", "--connect"]);
        cfg.apply(&cli);
        assert_eq!(cfg.producer_rate_hz, 30.0);
        assert_eq!(cfg.sim.seed, Some(3));
        assert!(cfg.auto_connect);
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = StationConfig { producer_rate_hz: 0.0, ..StationConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Rate { field: "producer_rate_hz", .. })));

        let cfg = StationConfig { queue_capacity: 0, ..StationConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::Capacity { field: "queue_capacity" }));

        let cfg = StationConfig { run_for_s: Some(-1.0), ..StationConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::Duration(-1.0)));
    }

    #[test]
    fn rejects_rates_with_unusable_periods() {
        let cfg = StationConfig { consumer_rate_hz: 1e300, ..StationConfig::default() };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Period { field: "consumer_rate_hz", value: 1e300 })
        );
        assert!(!cfg.consumer_period().is_zero());

        let cfg = StationConfig { producer_rate_hz: 1e-300, ..StationConfig::default() };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Period { field: "producer_rate_hz", value: 1e-300 })
        );
        assert!(!cfg.producer().period.is_zero());
    }

    #[test]
    fn rejects_unrepresentable_duration() {
        let cfg = StationConfig { run_for_s: Some(1e30), ..StationConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::Duration(1e30)));
        assert_eq!(cfg.run_for(), None);

        let cfg = StationConfig { run_for_s: Some(2.5), ..StationConfig::default() };
        assert_eq!(cfg.run_for(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn resolve_without_file_uses_flags() {
        let cli = Cli::parse_from(["station-console", "--series-capacity", "50", "--json"]);
        let cfg = StationConfig::resolve(&cli).unwrap();
        assert_eq!(cfg.series_capacity, 50);
        assert!(cfg.json);
    }
}
