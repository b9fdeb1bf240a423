//! Line protocol spoken with the motor controller.
//!
//! Outbound commands are `key=value` lines. Inbound lines are classified by
//! prefix: `RPM:<int>` carries a speed sample and `Dir:<int>` the direction
//! feedback. Anything else is reported as a [`DecodeError`] and skipped by
//! the caller.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rotation direction as commanded (`D=CW|CCW`) or reported (`Dir:<int>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Cw,
    Ccw,
}

impl Direction {
    /// Firmware feedback code: `-1` is clockwise, every other value counter-clockwise.
    pub fn from_device_code(code: i64) -> Self {
        if code == -1 {
            Direction::Cw
        } else {
            Direction::Ccw
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Cw => "CW",
            Direction::Ccw => "CCW",
        }
    }

    /// Long form used by the direction feedback label.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Cw => "Clockwise (CW)",
            Direction::Ccw => "Counter-Clockwise (CCW)",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CW" => Ok(Direction::Cw),
            "CCW" => Ok(Direction::Ccw),
            _ => Err(DecodeError::Unrecognized(s.to_string())),
        }
    }
}

/// Outbound command. `Display` yields the wire text without terminator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Kp(f64),
    Ki(f64),
    Kd(f64),
    TargetRpm(f64),
    Direction(Direction),
    Go,
    Stop,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Kp(v) => write!(f, "Kp={v}"),
            Command::Ki(v) => write!(f, "Ki={v}"),
            Command::Kd(v) => write!(f, "Kd={v}"),
            Command::TargetRpm(v) => write!(f, "R={v}"),
            Command::Direction(d) => write!(f, "D={d}"),
            Command::Go => f.write_str("C=GO"),
            Command::Stop => f.write_str("C=STOP"),
        }
    }
}

/// A decoded inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Telemetry {
    Rpm(i32),
    Direction(Direction),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized line: {0:?}")]
    Unrecognized(String),
    #[error("malformed {kind} payload: {line:?}")]
    MalformedPayload { kind: &'static str, line: String },
}

/// Decode one inbound line.
///
/// `Ok(None)` for a blank line (including undecodable bytes, which the link
/// delivers as an empty string).
pub fn decode_line(line: &str) -> Result<Option<Telemetry>, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with("RPM") {
        let rpm = int_payload(line, "RPM")?;
        let rpm = i32::try_from(rpm).map_err(|_| malformed("RPM", line))?;
        Ok(Some(Telemetry::Rpm(rpm)))
    } else if line.starts_with("Dir") {
        let code = int_payload(line, "Dir")?;
        Ok(Some(Telemetry::Direction(Direction::from_device_code(code))))
    } else {
        Err(DecodeError::Unrecognized(line.to_string()))
    }
}

/// `<prefix>:<int>` with exactly two colon-separated fields.
fn int_payload(line: &str, kind: &'static str) -> Result<i64, DecodeError> {
    let mut fields = line.split(':');
    let (Some(_), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed(kind, line));
    };
    value.trim().parse::<i64>().map_err(|_| malformed(kind, line))
}

fn malformed(kind: &'static str, line: &str) -> DecodeError {
    DecodeError::MalformedPayload {
        kind,
        line: line.to_string(),
    }
}
