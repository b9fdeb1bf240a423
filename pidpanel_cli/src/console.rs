//! `pidpanel console`: a line-oriented command surface over a session.

use crate::error_fmt::humanize;
use crate::render::{labels_line, plot_line};
use pidpanel_core::{Direction, FrameSource, PanelSession};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Ports,
    Connect(Option<String>),
    Disconnect,
    Pid(f64, f64, f64),
    Rpm(f64),
    Dir(Direction),
    Start,
    Stop,
    Reset,
    Status,
    Metrics,
    Help,
    Quit,
}

pub const HELP: &str = "commands: ports | connect [PORT] | disconnect | pid KP KI KD | rpm R | dir cw|ccw | start | stop | reset | status | metrics | help | quit";

fn num(word: Option<&str>, what: &str) -> Result<f64, String> {
    let w = word.ok_or_else(|| format!("missing {what}"))?;
    w.parse::<f64>()
        .map_err(|_| format!("{what} must be a number, got {w:?}"))
}

/// Parse one console line. `Ok(None)` for blank lines and `#` comments.
pub fn parse_action(line: &str) -> Result<Option<UiAction>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let cmd = words.next().unwrap_or_default().to_ascii_lowercase();
    let action = match cmd.as_str() {
        "ports" => UiAction::Ports,
        "connect" => UiAction::Connect(words.next().map(str::to_string)),
        "disconnect" => UiAction::Disconnect,
        "pid" => UiAction::Pid(
            num(words.next(), "KP")?,
            num(words.next(), "KI")?,
            num(words.next(), "KD")?,
        ),
        "rpm" => UiAction::Rpm(num(words.next(), "RPM")?),
        "dir" => {
            let w = words.next().ok_or("missing direction (cw|ccw)")?;
            UiAction::Dir(w.parse().map_err(|_| format!("unknown direction {w:?}"))?)
        }
        "start" => UiAction::Start,
        "stop" => UiAction::Stop,
        "reset" => UiAction::Reset,
        "status" => UiAction::Status,
        "metrics" => UiAction::Metrics,
        "help" | "?" => UiAction::Help,
        "quit" | "exit" => UiAction::Quit,
        other => return Err(format!("unknown command {other:?}")),
    };
    if words.next().is_some() {
        return Err(format!("too many arguments for {cmd}"));
    }
    Ok(Some(action))
}

fn delivered(ok: bool) -> &'static str {
    if ok { "sent" } else { "not connected; command dropped" }
}

/// Execute one action. Returns false when the console should exit.
pub fn dispatch<W: Write>(
    session: &PanelSession,
    action: UiAction,
    default_port: Option<&str>,
    json: bool,
    out: &mut W,
) -> std::io::Result<bool> {
    match action {
        UiAction::Ports => {
            let ports = session.list_ports();
            if ports.is_empty() {
                writeln!(out, "No ports available")?;
            }
            for p in ports {
                writeln!(out, "{p}")?;
            }
        }
        UiAction::Connect(port) => {
            let Some(port) = port.as_deref().or(default_port) else {
                writeln!(out, "usage: connect PORT")?;
                return Ok(true);
            };
            match session.connect(port) {
                Ok(()) => writeln!(out, "connected to {port} [{}]", session.connection_state().led())?,
                Err(e) => writeln!(out, "[{}] {}", session.connection_state().led(), humanize(&e))?,
            }
        }
        UiAction::Disconnect => {
            session.disconnect();
            writeln!(out, "disconnected [{}]", session.connection_state().led())?;
        }
        UiAction::Pid(kp, ki, kd) => {
            let ok = session.set_pid(kp, ki, kd);
            writeln!(out, "pid Kp={kp} Ki={ki} Kd={kd}: {}", delivered(ok))?;
        }
        UiAction::Rpm(r) => {
            let ok = session.set_rpm(r);
            writeln!(out, "rpm {r}: {}", delivered(ok))?;
        }
        UiAction::Dir(d) => {
            let ok = session.set_direction(d);
            writeln!(out, "dir {d}: {}", delivered(ok))?;
        }
        UiAction::Start => match session.start() {
            Ok(()) => writeln!(out, "motor {}", session.run_state())?,
            Err(e) => writeln!(out, "{}", humanize(&e))?,
        },
        UiAction::Stop => {
            session.stop();
            writeln!(out, "motor {}", session.run_state())?;
        }
        UiAction::Reset => {
            session.reset();
            writeln!(out, "plot reset")?;
        }
        UiAction::Status => {
            let sp = session.setpoint();
            writeln!(
                out,
                "[{}] {} port={} motor={} Kp={} Ki={} Kd={} R={} D={} samples={}",
                session.connection_state().led(),
                session.connection_state(),
                session.port().unwrap_or_else(|| "-".into()),
                session.run_state(),
                sp.kp,
                sp.ki,
                sp.kd,
                sp.target_rpm,
                sp.direction,
                session.snapshot().len(),
            )?;
        }
        UiAction::Metrics => {
            let frame = session.frame();
            writeln!(out, "{}", plot_line(&frame.plot(), json))?;
            writeln!(out, "{}", labels_line(&frame.labels(), json))?;
        }
        UiAction::Help => writeln!(out, "{HELP}")?,
        UiAction::Quit => return Ok(false),
    }
    Ok(true)
}

/// Read commands until `quit` or end of input.
pub fn run_console<R: BufRead, W: Write>(
    session: &PanelSession,
    input: R,
    out: &mut W,
    default_port: Option<&str>,
    json: bool,
) -> std::io::Result<()> {
    writeln!(out, "{HELP}")?;
    for line in input.lines() {
        let line = line?;
        match parse_action(&line) {
            Ok(None) => {}
            Ok(Some(action)) => {
                tracing::debug!(?action, "console command");
                if !dispatch(session, action, default_port, json, out)? {
                    break;
                }
            }
            Err(hint) => writeln!(out, "{hint}; type `help` for commands")?,
        }
        out.flush()?;
    }
    if session.run_state() == pidpanel_core::MotorRunState::Running {
        session.stop();
    }
    session.disconnect();
    Ok(())
}
