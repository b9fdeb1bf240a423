//! Test and helper mocks for pidpanel_core.
//!
//! `ScriptedOpener` hands out links that replay queued lines (or stream one
//! line at a fixed interval), record every written line and count reads.

use crate::util::lock;
use pidpanel_traits::{LineLink, LinkOpener};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Default)]
struct Script {
    lines: VecDeque<String>,
    stream: Option<(String, Duration)>,
    written: Vec<String>,
    opened: Vec<String>,
    total_reads: usize,
    break_reads: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedOpener {
    script: Arc<Mutex<Script>>,
    ports: Vec<String>,
    fail_open: bool,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// An opener whose `open` always fails.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, ports: &[&str]) -> Self {
        self.ports = ports.iter().map(|p| (*p).to_string()).collect();
        self
    }

    pub fn push_line(&self, line: &str) {
        lock(&self.script).lines.push_back(line.to_string());
    }

    /// Once the queue is empty, return `line` every `interval`.
    pub fn stream(&self, line: &str, interval: Duration) {
        lock(&self.script).stream = Some((line.to_string(), interval));
    }

    /// Make every following read fail as if the cable was pulled.
    pub fn break_link(&self) {
        lock(&self.script).break_reads = true;
    }

    pub fn written(&self) -> Vec<String> {
        lock(&self.script).written.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        lock(&self.script).opened.clone()
    }

    pub fn total_reads(&self) -> usize {
        lock(&self.script).total_reads
    }
}

impl LinkOpener for ScriptedOpener {
    fn list_ports(&self) -> Vec<String> {
        self.ports.clone()
    }

    fn open(
        &self,
        port: &str,
        _baud: u32,
        _read_timeout: Duration,
    ) -> Result<Box<dyn LineLink>, BoxError> {
        if self.fail_open {
            return Err(Box::new(std::io::Error::other("no such device")));
        }
        lock(&self.script).opened.push(port.to_string());
        Ok(Box::new(ScriptedLink {
            script: Arc::clone(&self.script),
        }))
    }
}

pub struct ScriptedLink {
    script: Arc<Mutex<Script>>,
}

impl ScriptedLink {
    fn poll(&self) -> Result<Option<String>, BoxError> {
        let mut s = lock(&self.script);
        if s.break_reads {
            return Err(Box::new(std::io::Error::other("link lost")));
        }
        Ok(s.lines.pop_front())
    }
}

impl LineLink for ScriptedLink {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        lock(&self.script).total_reads += 1;
        let deadline = Instant::now() + timeout;
        loop {
            match self.poll() {
                Ok(Some(line)) => break Ok(Some(line)),
                Err(e) => break Err(e),
                Ok(None) => {}
            }
            let stream = lock(&self.script).stream.clone();
            let now = Instant::now();
            if now >= deadline {
                break Ok(None);
            }
            let left = deadline - now;
            match stream {
                Some((line, interval)) if interval <= left => {
                    std::thread::sleep(interval);
                    break Ok(Some(line));
                }
                _ => std::thread::sleep(left.min(Duration::from_millis(2))),
            }
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        lock(&self.script).written.push(line.to_string());
        Ok(())
    }

    fn try_clone_link(&self) -> Result<Box<dyn LineLink>, BoxError> {
        Ok(Box::new(ScriptedLink {
            script: Arc::clone(&self.script),
        }))
    }
}
