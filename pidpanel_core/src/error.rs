use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PanelError {
    /// The serial endpoint could not be opened.
    #[error("connection error: {0}")]
    Connection(String),
    #[error("not connected to a motor controller")]
    NotConnected,
    #[error("timeout waiting for serial data")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing link opener")]
    MissingOpener,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
