//! Periodic snapshot, metrics and render cycle.
//!
//! The scheduler ticks on a fixed period for as long as it lives, whether or
//! not the motor is running. Each tick takes one [`Frame`] from its source
//! and hands the derived plot and labels to the two output collaborators.

use crate::buffer::Sample;
use crate::codec::Direction;
use crate::metrics::{self, Metrics};
use crate::status::{ConnectionState, MotorRunState};
use crate::types::ControllerSetpoint;
use crate::util::fmt2;
use crossbeam_channel as xch;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Everything one tick renders, taken at a single point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub samples: Vec<Sample>,
    pub setpoint: ControllerSetpoint,
    pub connection: ConnectionState,
    pub run_state: MotorRunState,
    pub reported_direction: Option<Direction>,
    pub metrics: Metrics,
}

impl Frame {
    /// Build a frame, computing metrics from the given snapshot.
    pub fn new(
        samples: Vec<Sample>,
        setpoint: ControllerSetpoint,
        connection: ConnectionState,
        run_state: MotorRunState,
        reported_direction: Option<Direction>,
    ) -> Self {
        let metrics = metrics::compute(&samples, setpoint.target_rpm);
        Self {
            samples,
            setpoint,
            connection,
            run_state,
            reported_direction,
            metrics,
        }
    }

    /// RPM of the newest sample, 0 when there is none.
    pub fn current_rpm(&self) -> i32 {
        self.samples.last().map_or(0, |s| s.rpm)
    }

    pub fn plot(&self) -> PlotFrame {
        PlotFrame {
            times: self.samples.iter().map(|s| s.elapsed_s).collect(),
            rpm: self.samples.iter().map(|s| s.rpm).collect(),
            error: metrics::error_series(&self.samples, self.setpoint.target_rpm),
            annotations: vec![
                format!("Current RPM: {}", self.current_rpm()),
                format!("Direction: {}", self.setpoint.direction),
            ],
        }
    }

    pub fn labels(&self) -> MetricLabels {
        MetricLabels {
            steady_state_error: fmt2(self.metrics.steady_state_error),
            sampling_time: fmt2(self.metrics.sampling_time),
            peak_time: fmt2(self.metrics.peak_time),
            rise_time: fmt2(self.metrics.rise_time),
            overshoot: fmt2(self.metrics.overshoot),
            current_rpm: self.current_rpm().to_string(),
            direction: self.setpoint.direction.to_string(),
            reported_direction: self
                .reported_direction
                .map_or_else(String::new, |d| d.label().to_string()),
            led: self.connection.led(),
        }
    }
}

/// Series and annotations for the plot renderer. All series have equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotFrame {
    pub times: Vec<f64>,
    pub rpm: Vec<i32>,
    /// `target - rpm` per sample.
    pub error: Vec<f64>,
    pub annotations: Vec<String>,
}

/// Formatted text for the metrics display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLabels {
    pub steady_state_error: String,
    pub sampling_time: String,
    pub peak_time: String,
    pub rise_time: String,
    pub overshoot: String,
    pub current_rpm: String,
    pub direction: String,
    /// Empty until the device has reported a direction.
    pub reported_direction: String,
    pub led: &'static str,
}

pub trait PlotRenderer: Send {
    fn render_plot(&mut self, plot: &PlotFrame);
}

pub trait MetricsDisplay: Send {
    fn show_metrics(&mut self, labels: &MetricLabels);
}

/// Produces the frame for a tick.
pub trait FrameSource: Send + Sync {
    fn frame(&self) -> Frame;
}

/// Run one tick synchronously.
pub fn tick_once<S: FrameSource + ?Sized>(
    source: &S,
    renderer: &mut dyn PlotRenderer,
    display: &mut dyn MetricsDisplay,
) -> Frame {
    let frame = source.frame();
    renderer.render_plot(&frame.plot());
    display.show_metrics(&frame.labels());
    frame
}

pub struct RefreshScheduler {
    stop_tx: Option<xch::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Start ticking every `period`. The first tick fires one period after spawn.
    pub fn spawn<S, R, D>(
        source: Arc<S>,
        period: Duration,
        mut renderer: R,
        mut display: D,
    ) -> std::io::Result<Self>
    where
        S: FrameSource + ?Sized + 'static,
        R: PlotRenderer + 'static,
        D: MetricsDisplay + 'static,
    {
        let (stop_tx, stop_rx) = xch::bounded::<()>(1);
        let ticker = xch::tick(period);

        let join_handle = std::thread::Builder::new()
            .name("refresh".into())
            .spawn(move || {
                loop {
                    xch::select! {
                        recv(ticker) -> _ => {
                            let frame = tick_once(&*source, &mut renderer, &mut display);
                            tracing::trace!(samples = frame.samples.len(), "refresh tick");
                        }
                        // Explicit stop or the scheduler was dropped.
                        recv(stop_rx) -> _ => break,
                    }
                }
                tracing::trace!("refresh thread exiting cleanly");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the select.
        self.stop_tx.take();
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "refresh thread panicked");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
