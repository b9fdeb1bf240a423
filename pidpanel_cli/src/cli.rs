//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pidpanel_core::Direction;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pidpanel", version, about = "Control panel for a serial DC motor PID controller")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit frames, summaries and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Which endpoint to talk to.
#[derive(Args, Debug, Clone, Default)]
pub struct Target {
    /// Serial port (e.g. /dev/ttyACM0); falls back to serial.port from the config
    #[arg(long, value_name = "PORT", conflicts_with = "sim")]
    pub port: Option<String>,
    /// Use the built-in simulated motor controller
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DirArg {
    Cw,
    Ccw,
}

impl From<DirArg> for Direction {
    fn from(d: DirArg) -> Self {
        match d {
            DirArg::Cw => Direction::Cw,
            DirArg::Ccw => Direction::Ccw,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: Target,
    /// Target speed sent as R=<rpm>
    #[arg(long, value_name = "RPM", allow_negative_numbers = true)]
    pub rpm: f64,
    /// Proportional gain; any of --kp/--ki/--kd sends all three (missing ones as 0)
    #[arg(long, value_name = "KP")]
    pub kp: Option<f64>,
    #[arg(long, value_name = "KI")]
    pub ki: Option<f64>,
    #[arg(long, value_name = "KD")]
    pub kd: Option<f64>,
    /// Rotation direction
    #[arg(long, value_enum, value_name = "DIR")]
    pub dir: Option<DirArg>,
    /// Stop after this many milliseconds; runs until Ctrl-C when omitted
    #[arg(long = "duration-ms", value_name = "MS")]
    pub duration_ms: Option<u64>,
    /// Override refresh.period_ms
    #[arg(long = "refresh-ms", value_name = "MS")]
    pub refresh_ms: Option<u64>,
}

impl RunArgs {
    /// Gains to send, if any were given.
    pub fn pid(&self) -> Option<(f64, f64, f64)> {
        if self.kp.is_none() && self.ki.is_none() && self.kd.is_none() {
            return None;
        }
        Some((
            self.kp.unwrap_or(0.0),
            self.ki.unwrap_or(0.0),
            self.kd.unwrap_or(0.0),
        ))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available serial ports
    Ports {
        /// List the simulated port instead
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
    /// Connect, apply a setpoint, run the motor and stream frames
    Run(RunArgs),
    /// Interactive command console reading from stdin
    Console {
        #[command(flatten)]
        target: Target,
    },
    /// Validate config; with --sim also perform a short simulated run
    SelfCheck {
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn pid_is_sent_only_when_given() {
        let cli = Cli::parse_from(["pidpanel", "run", "--sim", "--rpm", "100"]);
        let Commands::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.pid(), None);

        let cli = Cli::parse_from(["pidpanel", "run", "--sim", "--rpm", "100", "--ki", "0.5"]);
        let Commands::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.pid(), Some((0.0, 0.5, 0.0)));
    }

    #[test]
    fn port_and_sim_conflict() {
        let res = Cli::try_parse_from(["pidpanel", "console", "--sim", "--port", "/dev/ttyACM0"]);
        assert!(res.is_err());
    }
}
