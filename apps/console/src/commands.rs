// apps/console/src/commands.rs
use std::str::FromStr;

/// Operator input read from stdin, one per line. Stands in for the
/// Connect/Disconnect button of a windowed front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Toggle,
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown command `{0}` (try `help`)")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "t" | "toggle" => Ok(Command::Toggle),
            "c" | "connect" => Ok(Command::Connect),
            "d" | "disconnect" => Ok(Command::Disconnect),
            "s" | "status" => Ok(Command::Status),
            "h" | "help" | "?" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

pub const HELP: &str = "commands: [enter]/toggle, connect, disconnect, status, help, quit";
