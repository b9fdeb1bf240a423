//! Runtime settings of a panel session.
//!
//! Separate from the TOML schema in `pidpanel_config`; see `conversions` for
//! the mapping.

use std::time::Duration;

/// Link and pacing parameters for a `PanelSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCfg {
    pub baud: u32,
    /// Upper bound of one blocking read; also bounds how long a stop waits.
    pub read_timeout: Duration,
    /// Pause after each delivered command.
    pub settle: Duration,
    pub refresh_period: Duration,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            baud: 9600,
            read_timeout: Duration::from_secs(1),
            settle: Duration::from_millis(100),
            refresh_period: Duration::from_secs(1),
        }
    }
}
