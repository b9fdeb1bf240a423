//! `pidpanel run`: one motor run from setpoint to final metrics.

use crate::cli::RunArgs;
use crate::render::{ConsoleMetrics, ConsolePlot, summary};
use crate::target;
use pidpanel_config::Config;
use pidpanel_core::{Frame, FrameSource, PanelError, PanelSession, RefreshScheduler, SessionCfg};
use pidpanel_traits::LinkOpener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Poll interval of the run loop while waiting for the duration or Ctrl-C.
const POLL: Duration = Duration::from_millis(20);

pub fn build_session(
    cfg: &Config,
    opener: Arc<dyn LinkOpener>,
    refresh_ms: Option<u64>,
) -> eyre::Result<PanelSession> {
    let mut session_cfg = SessionCfg::from(cfg);
    if let Some(ms) = refresh_ms {
        session_cfg.refresh_period = Duration::from_millis(ms);
    }
    PanelSession::builder()
        .with_opener(opener)
        .with_config(session_cfg)
        .build()
}

/// Send the requested gains, direction and target. Returns each command
/// group with whether it reached the link.
pub fn apply_setpoint(session: &PanelSession, args: &RunArgs) -> Vec<(&'static str, bool)> {
    let mut sent = Vec::new();
    if let Some((kp, ki, kd)) = args.pid() {
        sent.push(("pid", session.set_pid(kp, ki, kd)));
    }
    if let Some(dir) = args.dir {
        sent.push(("direction", session.set_direction(dir.into())));
    }
    sent.push(("rpm", session.set_rpm(args.rpm)));
    sent
}

pub fn run(
    cfg: &Config,
    args: &RunArgs,
    json: bool,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<Frame> {
    let (opener, port) = target::resolve(cfg, &args.target);
    let port = port.ok_or_else(|| {
        eyre::Report::new(PanelError::Config(
            "no serial port given; pass --port, --sim or set serial.port".into(),
        ))
    })?;
    let session = Arc::new(build_session(cfg, opener, args.refresh_ms)?);

    session.connect(&port)?;
    for (what, delivered) in apply_setpoint(&session, args) {
        if !delivered {
            tracing::warn!(command = what, port = %port, "setpoint not delivered before run");
        }
    }
    session.start()?;

    let scheduler = match RefreshScheduler::spawn(
        Arc::clone(&session),
        session.refresh_period(),
        ConsolePlot::stdout(json),
        ConsoleMetrics::stdout(json),
    ) {
        Ok(s) => s,
        Err(e) => {
            session.stop();
            session.disconnect();
            return Err(eyre::Report::new(e).wrap_err("failed to start refresh thread"));
        }
    };

    let began = Instant::now();
    let deadline = args.duration_ms.map(|ms| began + Duration::from_millis(ms));
    let mut link_lost = false;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted; stopping motor");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if !session.connection_state().is_connected() {
            link_lost = true;
            break;
        }
        std::thread::sleep(POLL);
    }

    // Capture before stop, which clears the samples.
    let frame = session.frame();
    scheduler.stop();
    session.stop();
    session.disconnect();
    tracing::info!(
        samples = frame.samples.len(),
        elapsed_ms = began.elapsed().as_millis() as u64,
        "run finished"
    );
    println!("{}", summary(&frame, Some(&port), json));

    if link_lost {
        return Err(eyre::Report::new(PanelError::Transport(
            "connection lost during run".into(),
        )));
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use pidpanel_core::mocks::ScriptedOpener;

    fn run_args(argv: &[&str]) -> RunArgs {
        match Cli::parse_from(argv).cmd {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    fn session(opener: &ScriptedOpener) -> PanelSession {
        PanelSession::builder()
            .with_opener(Arc::new(opener.clone()))
            .with_settle(Duration::ZERO)
            .build()
            .unwrap()
    }

    #[test]
    fn setpoint_reports_undelivered_commands() {
        let opener = ScriptedOpener::new();
        let s = session(&opener);
        let args = run_args(&["pidpanel", "run", "--sim", "--rpm", "80", "--kp", "1", "--dir", "ccw"]);
        let sent = apply_setpoint(&s, &args);
        assert_eq!(sent, vec![("pid", false), ("direction", false), ("rpm", false)]);
        assert!(opener.written().is_empty());
    }

    #[test]
    fn setpoint_is_sent_in_order_when_connected() {
        let opener = ScriptedOpener::new();
        let s = session(&opener);
        s.connect("mock0").unwrap();
        let args = run_args(&["pidpanel", "run", "--sim", "--rpm", "80", "--kd", "0.5"]);
        let sent = apply_setpoint(&s, &args);
        assert!(sent.iter().all(|(_, ok)| *ok));
        assert_eq!(opener.written(), vec!["Kp=0", "Ki=0", "Kd=0.5", "R=80"]);
    }
}
