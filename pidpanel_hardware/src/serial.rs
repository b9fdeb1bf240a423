//! Serial port backend built on the `serialport` crate.

use pidpanel_traits::{LineLink, LinkOpener};
use serialport::SerialPort;
use std::collections::HashSet;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::error::HwError;
use crate::framer::LineFramer;
use crate::util::remaining_until;

/// Sort key so that ttyACM* ports come first, then ttyUSB*, then everything
/// else by name. Numeric suffixes sort numerically.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

fn sort_ports(mut names: Vec<String>) -> Vec<String> {
    names.sort_by_key(|n| port_sort_key(n));
    names.dedup();
    names
}

/// List serial ports known to the OS, with /dev fallbacks on Linux.
pub fn list_ports() -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    match serialport::available_ports() {
        Ok(ports) => {
            for info in ports {
                seen.insert(info.port_name);
            }
        }
        Err(e) => tracing::debug!(error = %e, "serial port enumeration failed"),
    }

    // Boards that enumerate late or without udev metadata still show up in /dev.
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    seen.insert(format!("/dev/{fname}"));
                }
            }
        }
    }

    sort_ports(seen.into_iter().collect())
}

/// An open serial port speaking the newline-delimited protocol.
pub struct SerialLink {
    name: String,
    port: Box<dyn SerialPort>,
    framer: LineFramer,
}

impl SerialLink {
    pub fn open(name: &str, baud: u32, read_timeout: Duration) -> Result<Self, HwError> {
        // 8N1, no flow control
        let port = serialport::new(name, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(read_timeout)
            .open()?;
        tracing::debug!(port = name, baud, ?read_timeout, "serial port opened");
        Ok(Self {
            name: name.to_string(),
            port,
            framer: LineFramer::new(),
        })
    }
}

impl LineLink for SerialLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(line) = self.framer.next_line() {
            return Ok(Some(line));
        }
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 256];
        while let Some(left) = remaining_until(deadline) {
            self.port.set_timeout(left).map_err(HwError::from)?;
            match self.port.read(&mut chunk) {
                Ok(0) => continue,
                Ok(n) => {
                    self.framer.push(&chunk[..n]);
                    if let Some(line) = self.framer.next_line() {
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::warn!(port = %self.name, "serial device went away");
                    return Err(Box::new(HwError::Disconnected));
                }
                Err(e) => return Err(Box::new(HwError::Io(e))),
            }
        }
        tracing::trace!(
            port = %self.name,
            partial = self.framer.pending_len(),
            "no complete line before timeout"
        );
        Ok(None)
    }

    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // No flush: tcdrain can stall on some USB CDC adapters.
        let framed = format!("{line}\n");
        self.port
            .write_all(framed.as_bytes())
            .map_err(|e| Box::new(HwError::Io(e)) as Box<dyn std::error::Error + Send + Sync>)
    }

    fn try_clone_link(
        &self,
    ) -> Result<Box<dyn LineLink>, Box<dyn std::error::Error + Send + Sync>> {
        let port = self.port.try_clone().map_err(HwError::from)?;
        Ok(Box::new(SerialLink {
            name: self.name.clone(),
            port,
            framer: LineFramer::new(),
        }))
    }
}

/// Opens real serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl LinkOpener for SerialOpener {
    fn list_ports(&self) -> Vec<String> {
        list_ports()
    }

    fn open(
        &self,
        port: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn LineLink>, Box<dyn std::error::Error + Send + Sync>> {
        let link = SerialLink::open(port, baud, read_timeout)?;
        Ok(Box::new(link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
            "/dev/ttyACM0",
        ];
        let sorted = sort_ports(names.into_iter().map(String::from).collect());
        assert_eq!(
            sorted,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn list_ports_does_not_panic() {
        for port in list_ports() {
            println!("Found port: {port}");
        }
    }

    #[test]
    fn opening_missing_port_fails() {
        let err = SerialOpener
            .open("/dev/pidpanel-no-such-port", 9600, Duration::from_millis(10))
            .err()
            .expect("missing port must not open");
        assert!(!err.to_string().is_empty());
    }
}
