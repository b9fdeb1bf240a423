//! Simulated motor controller.
//!
//! Speaks the same line protocol as the firmware: accepts `Kp=`, `Ki=`, `Kd=`,
//! `R=`, `D=` and `C=GO|STOP` commands and, while running, streams `RPM:<int>`
//! lines plus a periodic `Dir:<-1|1>` line. Speed follows a damped
//! second-order step response toward the commanded RPM.

use pidpanel_traits::{LineLink, LinkOpener};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::HwError;
use crate::util::remaining_until;

/// Name of the single port exposed by [`SimulatedOpener`].
pub const SIM_PORT: &str = "sim0";

/// Integration step of the speed model.
const MAX_STEP: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct SimParams {
    pub line_interval: Duration,
    pub natural_freq_hz: f64,
    pub damping: f64,
    pub direction_every: u32,
    pub inject_garbage: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            line_interval: Duration::from_millis(50),
            natural_freq_hz: 1.5,
            damping: 0.45,
            direction_every: 10,
            inject_garbage: false,
        }
    }
}

/// Gains as last written by the host. The simulated plant ignores them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug)]
struct Device {
    params: SimParams,
    gains: SimGains,
    target_rpm: f64,
    /// -1 for CW, 1 for CCW, as the firmware reports it.
    dir_code: i8,
    running: bool,
    rpm: f64,
    rpm_rate: f64,
    last_step: Instant,
    next_emit: Instant,
    emitted: u64,
    outbox: VecDeque<String>,
    closed: bool,
}

impl Device {
    fn new(params: SimParams) -> Self {
        let now = Instant::now();
        Self {
            params,
            gains: SimGains::default(),
            target_rpm: 0.0,
            dir_code: -1,
            running: false,
            rpm: 0.0,
            rpm_rate: 0.0,
            last_step: now,
            next_emit: now,
            emitted: 0,
            outbox: VecDeque::new(),
            closed: false,
        }
    }

    fn apply(&mut self, line: &str) {
        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!(line, "sim: ignoring command without '='");
            return;
        };
        let value = value.trim();
        match key.trim() {
            "Kp" => self.gains.kp = value.parse().unwrap_or(self.gains.kp),
            "Ki" => self.gains.ki = value.parse().unwrap_or(self.gains.ki),
            "Kd" => self.gains.kd = value.parse().unwrap_or(self.gains.kd),
            "R" => self.target_rpm = value.parse().unwrap_or(self.target_rpm),
            "D" => match value {
                "CW" => self.dir_code = -1,
                "CCW" => self.dir_code = 1,
                other => tracing::debug!(value = other, "sim: unknown direction"),
            },
            "C" => match value {
                "GO" => {
                    let now = Instant::now();
                    self.running = true;
                    self.last_step = now;
                    self.next_emit = now;
                }
                "STOP" => {
                    self.running = false;
                    self.rpm = 0.0;
                    self.rpm_rate = 0.0;
                }
                other => tracing::debug!(value = other, "sim: unknown control word"),
            },
            other => tracing::debug!(key = other, "sim: unknown command key"),
        }
    }

    /// Integrate x'' = wn^2 (r - x) - 2 zeta wn x' up to `now`.
    fn advance(&mut self, now: Instant) {
        let wn = 2.0 * std::f64::consts::PI * self.params.natural_freq_hz;
        let zeta = self.params.damping;
        let mut left = now.saturating_duration_since(self.last_step);
        while !left.is_zero() {
            let dt = left.min(MAX_STEP);
            let h = dt.as_secs_f64();
            let accel = wn * wn * (self.target_rpm - self.rpm) - 2.0 * zeta * wn * self.rpm_rate;
            self.rpm_rate += accel * h;
            self.rpm += self.rpm_rate * h;
            left -= dt;
        }
        self.last_step = now;
    }

    fn emit_due(&mut self, now: Instant) {
        // Nobody read for a while: resume the stream from now instead of
        // replaying every missed line.
        if self.running
            && now.saturating_duration_since(self.next_emit) > self.params.line_interval
        {
            self.advance(now);
            self.next_emit = now;
        }
        while self.running && self.next_emit <= now {
            let at = self.next_emit;
            self.advance(at.max(self.last_step));
            self.outbox.push_back(format!("RPM:{}", self.rpm.round() as i64));
            self.emitted += 1;
            if self.params.inject_garbage {
                self.outbox.push_back("RPM:??".to_string());
                self.outbox.push_back("boot ok".to_string());
            }
            if self.emitted % u64::from(self.params.direction_every.max(1)) == 0 {
                self.outbox.push_back(format!("Dir:{}", self.dir_code));
            }
            self.next_emit = at + self.params.line_interval;
        }
    }
}

fn lock(device: &Mutex<Device>) -> MutexGuard<'_, Device> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One handle onto a simulated device. Clones share the device.
pub struct SimulatedLink {
    device: Arc<Mutex<Device>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl LineLink for SimulatedLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let deadline = Instant::now() + timeout;
        loop {
            let wait = {
                let mut dev = lock(&self.device);
                if dev.closed {
                    return Err(Box::new(HwError::Disconnected));
                }
                dev.emit_due(Instant::now());
                if let Some(line) = dev.outbox.pop_front() {
                    return Ok(Some(line));
                }
                let Some(left) = remaining_until(deadline) else {
                    return Ok(None);
                };
                if dev.running {
                    left.min(dev.next_emit.saturating_duration_since(Instant::now()))
                } else {
                    left
                }
            };
            std::thread::sleep(wait.max(Duration::from_micros(200)));
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut dev = lock(&self.device);
        if dev.closed {
            return Err(Box::new(HwError::Disconnected));
        }
        let now = Instant::now();
        dev.emit_due(now);
        dev.advance(now);
        dev.apply(line.trim());
        drop(dev);
        journal_push(&self.journal, line);
        Ok(())
    }

    fn try_clone_link(
        &self,
    ) -> Result<Box<dyn LineLink>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Box::new(SimulatedLink {
            device: Arc::clone(&self.device),
            journal: Arc::clone(&self.journal),
        }))
    }
}

fn journal_push(journal: &Mutex<Vec<String>>, line: &str) {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(line.to_string());
}

/// Opens simulated devices on [`SIM_PORT`]. Every `open` powers up a fresh device.
#[derive(Clone)]
pub struct SimulatedOpener {
    params: SimParams,
    journal: Arc<Mutex<Vec<String>>>,
    current: Arc<Mutex<Option<Arc<Mutex<Device>>>>>,
}

impl SimulatedOpener {
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            journal: Arc::new(Mutex::new(Vec::new())),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Every command line received by any device opened through this opener, in order.
    pub fn journal(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Gains held by the most recently opened device.
    pub fn gains(&self) -> Option<SimGains> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().map(|d| lock(d).gains)
    }

    /// Simulate the cable being pulled: every handle on the current device starts failing.
    pub fn unplug(&self) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dev) = current.as_ref() {
            lock(dev).closed = true;
        }
    }
}

impl Default for SimulatedOpener {
    fn default() -> Self {
        Self::new(SimParams::default())
    }
}

impl LinkOpener for SimulatedOpener {
    fn list_ports(&self) -> Vec<String> {
        vec![SIM_PORT.to_string()]
    }

    fn open(
        &self,
        port: &str,
        _baud: u32,
        _read_timeout: Duration,
    ) -> Result<Box<dyn LineLink>, Box<dyn std::error::Error + Send + Sync>> {
        if port != SIM_PORT {
            return Err(Box::new(HwError::Serial(format!(
                "no such simulated port: {port}"
            ))));
        }
        let device = Arc::new(Mutex::new(Device::new(self.params.clone())));
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&device));
        tracing::info!(port, "simulated motor controller attached");
        Ok(Box::new(SimulatedLink {
            device,
            journal: Arc::clone(&self.journal),
        }))
    }
}
