//! Owns the serial connection and hands out line reads and writes.
//!
//! The link is split into two handles at connect time: the reader is used
//! only by the acquisition thread, the writer by command senders. A read can
//! therefore block for the full read timeout without holding up a command.

use crate::error::{PanelError, Result};
use crate::hw_error::{map_hw_error, map_open_error};
use crate::status::ConnectionState;
use crate::util::lock;
use pidpanel_traits::{LineLink, LinkOpener};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Result of a single blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Nothing arrived within the read timeout.
    Timeout,
    /// No endpoint is open, or it failed and was closed.
    Closed,
}

/// Keeps a reader counted in [`Transport::active_readers`] until dropped.
#[derive(Debug)]
pub struct ReaderGuard(Arc<Transport>);

impl std::ops::Deref for ReaderGuard {
    type Target = Transport;

    fn deref(&self) -> &Transport {
        &self.0
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        self.0.readers.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct Transport {
    opener: Arc<dyn LinkOpener>,
    baud: u32,
    read_timeout: Duration,
    writer: Mutex<Option<Box<dyn LineLink>>>,
    reader: Mutex<Option<Box<dyn LineLink>>>,
    port: Mutex<Option<String>>,
    connected: AtomicBool,
    readers: AtomicUsize,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("baud", &self.baud)
            .field("read_timeout", &self.read_timeout)
            .field("port", &self.port())
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .field("readers", &self.active_readers())
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(opener: Arc<dyn LinkOpener>, baud: u32, read_timeout: Duration) -> Self {
        Self {
            opener,
            baud,
            read_timeout,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            port: Mutex::new(None),
            connected: AtomicBool::new(false),
            readers: AtomicUsize::new(0),
        }
    }

    pub fn list_ports(&self) -> Vec<String> {
        self.opener.list_ports()
    }

    /// Open `port`, replacing any endpoint that is already open.
    pub fn connect(&self, port: &str) -> Result<()> {
        if self.is_connected() {
            self.disconnect();
        }
        let link = self
            .opener
            .open(port, self.baud, self.read_timeout)
            .map_err(|e| eyre::Report::new(map_open_error(port, e.as_ref())))?;
        let reader = link
            .try_clone_link()
            .map_err(|e| eyre::Report::new(map_open_error(port, e.as_ref())))?;

        *lock(&self.writer) = Some(link);
        *lock(&self.reader) = Some(reader);
        *lock(&self.port) = Some(port.to_string());
        self.connected.store(true, Ordering::Release);
        tracing::info!(port, baud = self.baud, "connected");
        Ok(())
    }

    /// Close the endpoint. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        let was = self.connected.swap(false, Ordering::AcqRel);
        lock(&self.writer).take();
        // A reader blocked in read_line holds this lock; it notices the
        // cleared flag and drops its handle when the read returns.
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        let port = lock(&self.port).take();
        if was {
            tracing::info!(port = port.as_deref().unwrap_or(""), "disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn port(&self) -> Option<String> {
        lock(&self.port).clone()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Register a reading loop for as long as the returned guard lives.
    pub fn attach_reader(self: &Arc<Self>) -> ReaderGuard {
        let n = self.readers.fetch_add(1, Ordering::AcqRel) + 1;
        if n > 1 {
            tracing::warn!(readers = n, "more than one reader attached to the transport");
        }
        ReaderGuard(Arc::clone(self))
    }

    /// Number of reading loops currently attached.
    pub fn active_readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Block up to the read timeout for the next line.
    ///
    /// A read failure other than a timeout closes the connection.
    pub fn read_line(&self) -> ReadOutcome {
        if !self.is_connected() {
            return ReadOutcome::Closed;
        }
        let mut guard = lock(&self.reader);
        let Some(link) = guard.as_mut() else {
            return ReadOutcome::Closed;
        };
        let res = link.read_line(self.read_timeout);
        if !self.is_connected() {
            guard.take();
            return ReadOutcome::Closed;
        }
        match res {
            Ok(Some(line)) => ReadOutcome::Line(line),
            Ok(None) => ReadOutcome::Timeout,
            Err(e) => match map_hw_error(e.as_ref()) {
                PanelError::Timeout => ReadOutcome::Timeout,
                err => {
                    tracing::error!(error = %err, "serial read failed; closing connection");
                    guard.take();
                    drop(guard);
                    self.disconnect();
                    ReadOutcome::Closed
                }
            },
        }
    }

    /// Write one command line. Returns whether it was handed to the link.
    ///
    /// Nothing is sent while disconnected; the command is dropped with a
    /// warning.
    pub fn send_line(&self, line: &str) -> bool {
        let mut guard = lock(&self.writer);
        let Some(link) = guard.as_mut().filter(|_| self.is_connected()) else {
            tracing::warn!(command = line, "not connected; command dropped");
            return false;
        };
        match link.write_line(line) {
            Ok(()) => {
                tracing::debug!(command = line, "sent");
                true
            }
            Err(e) => {
                tracing::warn!(command = line, error = %map_hw_error(e.as_ref()), "write failed");
                false
            }
        }
    }
}
