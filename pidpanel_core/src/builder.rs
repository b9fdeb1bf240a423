//! Type-state builder for `PanelSession`.
//!
//! `build()` is only available once a link opener has been supplied.
//! `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use pidpanel_traits::LinkOpener;
use pidpanel_traits::clock::{Clock, MonotonicClock};

use crate::config::SessionCfg;
use crate::error::{BuildError, Result};
use crate::session::PanelSession;
use crate::transport::Transport;
use crate::types::ControllerSetpoint;

pub struct Missing;
pub struct Set;

pub struct PanelSessionBuilder<O> {
    opener: Option<Arc<dyn LinkOpener>>,
    cfg: SessionCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    setpoint: ControllerSetpoint,
    _o: PhantomData<O>,
}

impl Default for PanelSessionBuilder<Missing> {
    fn default() -> Self {
        Self {
            opener: None,
            cfg: SessionCfg::default(),
            clock: None,
            setpoint: ControllerSetpoint::default(),
            _o: PhantomData,
        }
    }
}

impl PanelSession {
    pub fn builder() -> PanelSessionBuilder<Missing> {
        PanelSessionBuilder::default()
    }
}

fn validate_and_build(
    opener: Arc<dyn LinkOpener>,
    cfg: SessionCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    setpoint: ControllerSetpoint,
) -> Result<PanelSession> {
    if cfg.baud == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "baud must be > 0",
        )));
    }
    if cfg.read_timeout.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "read timeout must be > 0",
        )));
    }
    if cfg.refresh_period.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "refresh period must be > 0",
        )));
    }
    let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
    let transport = Transport::new(opener, cfg.baud, cfg.read_timeout);
    Ok(PanelSession::from_parts(
        transport,
        setpoint,
        cfg.settle,
        cfg.refresh_period,
        clock,
    ))
}

impl<O> PanelSessionBuilder<O> {
    pub fn try_build(self) -> Result<PanelSession> {
        let opener = self
            .opener
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOpener))?;
        validate_and_build(opener, self.cfg, self.clock, self.setpoint)
    }

    pub fn with_config(mut self, cfg: SessionCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.cfg.baud = baud;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.read_timeout = timeout;
        self
    }

    /// Pause after each delivered command. Zero disables it.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.cfg.settle = settle;
        self
    }

    pub fn with_refresh_period(mut self, period: Duration) -> Self {
        self.cfg.refresh_period = period;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Initial setpoint shown before anything is sent.
    pub fn with_setpoint(mut self, setpoint: ControllerSetpoint) -> Self {
        self.setpoint = setpoint;
        self
    }
}

impl PanelSessionBuilder<Missing> {
    pub fn with_opener(self, opener: Arc<dyn LinkOpener>) -> PanelSessionBuilder<Set> {
        PanelSessionBuilder {
            opener: Some(opener),
            cfg: self.cfg,
            clock: self.clock,
            setpoint: self.setpoint,
            _o: PhantomData,
        }
    }
}

impl PanelSessionBuilder<Set> {
    pub fn build(self) -> Result<PanelSession> {
        self.try_build()
    }
}
