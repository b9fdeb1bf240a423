//! `From` implementations bridging `pidpanel_config` types to runtime types.

use crate::config::SessionCfg;
use std::time::Duration;

impl From<&pidpanel_config::Config> for SessionCfg {
    fn from(c: &pidpanel_config::Config) -> Self {
        Self {
            baud: c.serial.baud,
            read_timeout: c.serial.read_timeout(),
            settle: Duration::from_millis(c.protocol.settle_ms),
            refresh_period: Duration::from_millis(c.refresh.period_ms),
        }
    }
}

/// Parameters for the simulated controller.
#[cfg(feature = "hardware-errors")]
pub fn sim_params(c: &pidpanel_config::SimCfg) -> pidpanel_hardware::SimParams {
    pidpanel_hardware::SimParams {
        line_interval: Duration::from_millis(c.line_interval_ms),
        natural_freq_hz: c.natural_freq_hz,
        damping: c.damping,
        direction_every: c.direction_every,
        inject_garbage: c.inject_garbage,
    }
}
