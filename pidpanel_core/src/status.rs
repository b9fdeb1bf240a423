//! Connection and motor run states shown on the panel.

/// Whether a serial endpoint is open. Drives the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// LED colour of the status indicator.
    pub fn led(self) -> &'static str {
        match self {
            ConnectionState::Connected => "green",
            ConnectionState::Disconnected => "red",
        }
    }
}

/// Whether the motor was last told to run. Gates the acquisition loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorRunState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        })
    }
}

impl std::fmt::Display for MotorRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MotorRunState::Running => "running",
            MotorRunState::Stopped => "stopped",
        })
    }
}
