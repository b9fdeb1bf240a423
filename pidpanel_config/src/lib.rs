#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the motor control panel.
//!
//! Every table and key is optional; `Config::default()` is the configuration
//! used when no file is given. `validate()` enforces ranges after parsing.
use serde::Deserialize;
use std::time::Duration;

/// Fixed link speed of the motor controller firmware.
pub const DEFAULT_BAUD: u32 = 9600;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialCfg {
    /// Port used when the CLI is not given `--port`.
    pub port: Option<String>,
    pub baud: u32,
    /// Upper bound of a single blocking line read (ms).
    pub read_timeout_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD,
            read_timeout_ms: 1000,
        }
    }
}

impl SerialCfg {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProtocolCfg {
    /// Pause after every outbound command so the device can process it (ms).
    pub settle_ms: u64,
}

impl Default for ProtocolCfg {
    fn default() -> Self {
        Self { settle_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshCfg {
    /// Snapshot/render cadence (ms).
    pub period_ms: u64,
}

impl Default for RefreshCfg {
    fn default() -> Self {
        Self { period_ms: 1000 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated motor controller.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Interval between streamed `RPM:` lines (ms).
    pub line_interval_ms: u64,
    /// Natural frequency of the simulated speed response (Hz).
    pub natural_freq_hz: f64,
    /// Damping ratio; below 1.0 the step response overshoots.
    pub damping: f64,
    /// Emit one `Dir:` line every N `RPM:` lines.
    pub direction_every: u32,
    /// Interleave malformed lines into the stream.
    pub inject_garbage: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            line_interval_ms: 50,
            natural_freq_hz: 1.5,
            damping: 0.45,
            direction_every: 10,
            inject_garbage: false,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub serial: SerialCfg,
    pub protocol: ProtocolCfg,
    pub refresh: RefreshCfg,
    pub logging: Logging,
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > 60_000 {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>60s)");
        }
        if let Some(port) = &self.serial.port {
            if port.trim().is_empty() {
                eyre::bail!("serial.port must not be empty when set");
            }
        }

        // Protocol
        if self.protocol.settle_ms > 10_000 {
            eyre::bail!("protocol.settle_ms is unreasonably large (>10s)");
        }

        // Refresh
        if self.refresh.period_ms == 0 {
            eyre::bail!("refresh.period_ms must be >= 1");
        }
        if self.refresh.period_ms > 60_000 {
            eyre::bail!("refresh.period_ms is unreasonably large (>60s)");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref() {
            if !matches!(rotation, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
            }
        }

        // Simulator
        if self.sim.line_interval_ms == 0 {
            eyre::bail!("sim.line_interval_ms must be >= 1");
        }
        if !(self.sim.natural_freq_hz.is_finite() && self.sim.natural_freq_hz > 0.0) {
            eyre::bail!("sim.natural_freq_hz must be > 0.0");
        }
        if !(self.sim.damping.is_finite() && self.sim.damping > 0.0) {
            eyre::bail!("sim.damping must be > 0.0");
        }
        if self.sim.direction_every == 0 {
            eyre::bail!("sim.direction_every must be >= 1");
        }

        Ok(())
    }
}
