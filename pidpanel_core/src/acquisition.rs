//! Background acquisition of telemetry lines.
//!
//! Spawns one thread that performs the bounded blocking reads, decodes each
//! line and appends RPM samples to the shared buffer. Direction feedback is
//! published through a [`DirectionCell`].
//!
//! Each `Acquisition` owns exactly one thread, which is signalled and joined
//! when the `Acquisition` is dropped. The thread re-checks its shutdown flag
//! after every read, so a stop takes effect within one read timeout.
use crate::buffer::SampleBuffer;
use crate::codec::{Direction, Telemetry, decode_line};
use crate::transport::{ReadOutcome, Transport};
use pidpanel_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;

/// Latest device-reported direction, shared lock-free with readers.
#[derive(Debug, Default)]
pub struct DirectionCell(AtomicU8);

impl DirectionCell {
    const NONE: u8 = 0;
    const CW: u8 = 1;
    const CCW: u8 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, d: Direction) {
        let v = match d {
            Direction::Cw => Self::CW,
            Direction::Ccw => Self::CCW,
        };
        self.0.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<Direction> {
        match self.0.load(Ordering::Relaxed) {
            Self::CW => Some(Direction::Cw),
            Self::CCW => Some(Direction::Ccw),
            _ => None,
        }
    }

    pub fn clear(&self) {
        self.0.store(Self::NONE, Ordering::Relaxed);
    }
}

pub struct Acquisition {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl Acquisition {
    /// Start the loop on a thread named `acquisition`. Sample timestamps are
    /// seconds since this call.
    pub fn spawn<C: Clock + Send + 'static>(
        transport: Arc<Transport>,
        buffer: Arc<SampleBuffer>,
        direction: Arc<DirectionCell>,
        clock: C,
    ) -> std::io::Result<Self> {
        let builder = std::thread::Builder::new().name("acquisition".into());
        Self::spawn_with(builder, transport, buffer, direction, clock)
    }

    /// Like [`Acquisition::spawn`] with a caller-configured thread builder.
    ///
    /// The transport counts this loop as an attached reader from now until
    /// the thread exits.
    pub fn spawn_with<C: Clock + Send + 'static>(
        builder: std::thread::Builder,
        transport: Arc<Transport>,
        buffer: Arc<SampleBuffer>,
        direction: Arc<DirectionCell>,
        clock: C,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let reader = transport.attach_reader();
        let epoch = clock.now();

        let join_handle = builder.spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Acquire) {
                    tracing::debug!("acquisition received shutdown signal");
                    break;
                }

                let line = match reader.read_line() {
                    ReadOutcome::Line(line) => line,
                    ReadOutcome::Timeout => continue,
                    ReadOutcome::Closed => {
                        tracing::debug!("transport closed; acquisition exiting");
                        break;
                    }
                };

                // A stop issued during the read must not let a late sample in.
                if shutdown_clone.load(Ordering::Acquire) {
                    break;
                }

                match decode_line(&line) {
                    Ok(Some(Telemetry::Rpm(rpm))) => {
                        let t = clock.secs_since(epoch);
                        tracing::trace!(t, rpm, "sample");
                        buffer.append(t, rpm);
                    }
                    Ok(Some(Telemetry::Direction(d))) => direction.publish(d),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(line = %line, error = %e, "discarding telemetry line");
                    }
                }
            }
            tracing::trace!("acquisition thread exiting cleanly");
        })?;

        Ok(Self {
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// True once the thread has exited, e.g. after the transport closed.
    pub fn is_finished(&self) -> bool {
        self.join_handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Ask the loop to exit after its current read without waiting for it.
    pub fn signal(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Signal the loop and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "acquisition thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_cell_roundtrip() {
        let cell = DirectionCell::new();
        assert_eq!(cell.get(), None);
        cell.publish(Direction::Ccw);
        assert_eq!(cell.get(), Some(Direction::Ccw));
        cell.publish(Direction::Cw);
        assert_eq!(cell.get(), Some(Direction::Cw));
        cell.clear();
        assert_eq!(cell.get(), None);
    }
}
