//! Resolve `--port`/`--sim` and the config into an opener and a port name.

use crate::cli::Target;
use pidpanel_config::Config;
use pidpanel_core::conversions::sim_params;
use pidpanel_hardware::{SIM_PORT, SerialOpener, SimulatedOpener};
use pidpanel_traits::LinkOpener;
use std::sync::Arc;

pub fn opener(cfg: &Config, sim: bool) -> Arc<dyn LinkOpener> {
    if sim {
        Arc::new(SimulatedOpener::new(sim_params(&cfg.sim)))
    } else {
        Arc::new(SerialOpener)
    }
}

/// Opener plus the port to connect to, if one is known.
pub fn resolve(cfg: &Config, target: &Target) -> (Arc<dyn LinkOpener>, Option<String>) {
    let port = if target.sim {
        Some(SIM_PORT.to_string())
    } else {
        target.port.clone().or_else(|| cfg.serial.port.clone())
    };
    (opener(cfg, target.sim), port)
}
