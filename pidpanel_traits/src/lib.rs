pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// One open, newline-delimited serial endpoint.
pub trait LineLink: Send {
    /// Block for at most `timeout` waiting for the next complete line.
    ///
    /// Returns `Ok(None)` when no line arrived in time. The terminator and any
    /// trailing `\r` are stripped; bytes that are not valid UTF-8 yield an empty line.
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Write `line` followed by a `\n` terminator.
    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// A second handle onto the same endpoint, so one thread can block in
    /// `read_line` while another writes.
    fn try_clone_link(
        &self,
    ) -> Result<Box<dyn LineLink>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Enumerates and opens serial endpoints.
pub trait LinkOpener: Send + Sync {
    fn list_ports(&self) -> Vec<String>;

    fn open(
        &self,
        port: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn LineLink>, Box<dyn std::error::Error + Send + Sync>>;
}
