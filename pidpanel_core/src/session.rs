//! The panel's session context and command-dispatch surface.
//!
//! A `PanelSession` owns the transport, the sample buffer, the setpoint and
//! the acquisition loop. Command senders, the acquisition thread and the
//! refresh thread all share it by reference.

use crate::acquisition::{Acquisition, DirectionCell};
use crate::buffer::{Sample, SampleBuffer};
use crate::codec::{Command, Direction};
use crate::error::{PanelError, Result};
use crate::refresh::{Frame, FrameSource};
use crate::status::{ConnectionState, MotorRunState};
use crate::transport::Transport;
use crate::types::ControllerSetpoint;
use crate::util::lock;
use pidpanel_traits::clock::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RunSlot {
    state: MotorRunState,
    acquisition: Option<Acquisition>,
}

pub struct PanelSession {
    transport: Arc<Transport>,
    buffer: Arc<SampleBuffer>,
    direction: Arc<DirectionCell>,
    setpoint: Mutex<ControllerSetpoint>,
    run: Mutex<RunSlot>,
    // Mirror of `run.state` so readers never wait on a stop in progress.
    running: AtomicBool,
    command_lock: Mutex<()>,
    settle: Duration,
    refresh_period: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for PanelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelSession")
            .field("transport", &self.transport)
            .field("samples", &self.buffer.len())
            .field("setpoint", &self.setpoint())
            .field("run_state", &self.run_state())
            .field("settle", &self.settle)
            .finish_non_exhaustive()
    }
}

impl PanelSession {
    pub(crate) fn from_parts(
        transport: Transport,
        setpoint: ControllerSetpoint,
        settle: Duration,
        refresh_period: Duration,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            buffer: Arc::new(SampleBuffer::new()),
            direction: Arc::new(DirectionCell::new()),
            setpoint: Mutex::new(setpoint),
            run: Mutex::new(RunSlot::default()),
            running: AtomicBool::new(false),
            command_lock: Mutex::new(()),
            settle,
            refresh_period,
            clock,
        }
    }

    pub fn list_ports(&self) -> Vec<String> {
        self.transport.list_ports()
    }

    /// Open `port`. An existing connection is closed first.
    ///
    /// On failure the session stays disconnected and the error downcasts to
    /// [`PanelError::Connection`].
    pub fn connect(&self, port: &str) -> Result<()> {
        self.reap_dead_run(&mut lock(&self.run));
        if self.transport.is_connected() {
            self.disconnect();
        }
        self.transport.connect(port)
    }

    /// Stop acquisition and close the port. Samples are kept.
    pub fn disconnect(&self) {
        let mut run = lock(&self.run);
        let acquisition = run.acquisition.take();
        if let Some(acq) = &acquisition {
            acq.signal();
        }
        // Closing first makes a blocked read return Closed.
        self.transport.disconnect();
        drop(acquisition);
        run.state = MotorRunState::Stopped;
        self.running.store(false, Ordering::Release);
    }

    /// Send the three gains as `Kp=`, `Ki=`, `Kd=` in that order.
    ///
    /// Returns whether all three were handed to the link.
    pub fn set_pid(&self, kp: f64, ki: f64, kd: f64) -> bool {
        {
            let mut sp = lock(&self.setpoint);
            sp.kp = kp;
            sp.ki = ki;
            sp.kd = kd;
        }
        let _serial = lock(&self.command_lock);
        let a = self.send_locked(Command::Kp(kp));
        let b = self.send_locked(Command::Ki(ki));
        let c = self.send_locked(Command::Kd(kd));
        a && b && c
    }

    pub fn set_rpm(&self, target_rpm: f64) -> bool {
        lock(&self.setpoint).target_rpm = target_rpm;
        self.send(Command::TargetRpm(target_rpm))
    }

    pub fn set_direction(&self, direction: Direction) -> bool {
        lock(&self.setpoint).direction = direction;
        self.send(Command::Direction(direction))
    }

    /// Send `C=GO` and start the acquisition loop.
    ///
    /// A no-op while already running, so at most one loop ever reads the
    /// transport. Fails with [`PanelError::NotConnected`] without sending
    /// anything when no port is open.
    pub fn start(&self) -> Result<()> {
        let mut run = lock(&self.run);
        self.reap_dead_run(&mut run);
        if run.state == MotorRunState::Running {
            tracing::debug!("start ignored; already running");
            return Ok(());
        }
        if !self.transport.is_connected() {
            return Err(eyre::Report::new(PanelError::NotConnected));
        }
        if !self.send(Command::Go) {
            return Err(eyre::Report::new(PanelError::Transport(
                "failed to send C=GO".into(),
            )));
        }
        let acquisition = match Acquisition::spawn(
            Arc::clone(&self.transport),
            Arc::clone(&self.buffer),
            Arc::clone(&self.direction),
            Arc::clone(&self.clock),
        ) {
            Ok(acq) => acq,
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn acquisition thread; stopping motor");
                self.send(Command::Stop);
                return Err(eyre::Report::new(PanelError::State(format!(
                    "acquisition thread could not be started: {e}"
                ))));
            }
        };
        run.acquisition = Some(acquisition);
        run.state = MotorRunState::Running;
        self.running.store(true, Ordering::Release);
        tracing::info!(setpoint = ?self.setpoint(), "motor started");
        Ok(())
    }

    /// Send `C=STOP`, end the acquisition loop and clear the samples and the
    /// reported direction.
    ///
    /// Returns once the loop has exited, which takes at most one read timeout.
    pub fn stop(&self) {
        let mut run = lock(&self.run);
        self.send(Command::Stop);
        if let Some(acq) = run.acquisition.take() {
            acq.stop();
        }
        self.buffer.reset();
        self.direction.clear();
        run.state = MotorRunState::Stopped;
        self.running.store(false, Ordering::Release);
        tracing::info!("motor stopped");
    }

    /// Clear the samples without touching the motor.
    pub fn reset(&self) {
        self.buffer.reset();
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.buffer.snapshot()
    }

    pub fn setpoint(&self) -> ControllerSetpoint {
        *lock(&self.setpoint)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// `Running` only while the motor was started and the port is still open.
    pub fn run_state(&self) -> MotorRunState {
        if self.running.load(Ordering::Acquire) && self.transport.is_connected() {
            MotorRunState::Running
        } else {
            MotorRunState::Stopped
        }
    }

    pub fn reported_direction(&self) -> Option<Direction> {
        self.direction.get()
    }

    pub fn port(&self) -> Option<String> {
        self.transport.port()
    }

    pub fn refresh_period(&self) -> Duration {
        self.refresh_period
    }

    /// Reading loops attached to the transport; at most one while running.
    pub fn active_readers(&self) -> usize {
        self.transport.active_readers()
    }

    /// Drop a Running state whose loop ended because the link failed.
    fn reap_dead_run(&self, run: &mut RunSlot) {
        if run.state != MotorRunState::Running {
            return;
        }
        let alive = self.transport.is_connected()
            && run.acquisition.as_ref().is_some_and(|a| !a.is_finished());
        if alive {
            return;
        }
        tracing::debug!("reaping run whose link was lost");
        run.acquisition.take();
        run.state = MotorRunState::Stopped;
        self.running.store(false, Ordering::Release);
    }

    fn send(&self, cmd: Command) -> bool {
        let _serial = lock(&self.command_lock);
        self.send_locked(cmd)
    }

    fn send_locked(&self, cmd: Command) -> bool {
        let delivered = self.transport.send_line(&cmd.to_string());
        if delivered {
            self.clock.sleep(self.settle);
        }
        delivered
    }
}

impl FrameSource for PanelSession {
    fn frame(&self) -> Frame {
        Frame::new(
            self.snapshot(),
            self.setpoint(),
            self.connection_state(),
            self.run_state(),
            self.reported_direction(),
        )
    }
}

impl Drop for PanelSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
