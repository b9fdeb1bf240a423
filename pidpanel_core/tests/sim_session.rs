//! End-to-end runs against the simulated motor controller.

use pidpanel_core::conversions::sim_params;
use pidpanel_core::{ConnectionState, Direction, PanelSession, SessionCfg};
use pidpanel_hardware::{SIM_PORT, SimParams, SimulatedOpener};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_params() -> SimParams {
    SimParams {
        line_interval: Duration::from_millis(10),
        direction_every: 3,
        ..SimParams::default()
    }
}

fn session(opener: &SimulatedOpener) -> PanelSession {
    PanelSession::builder()
        .with_opener(Arc::new(opener.clone()))
        .with_config(SessionCfg {
            read_timeout: Duration::from_millis(50),
            settle: Duration::ZERO,
            ..SessionCfg::default()
        })
        .build()
        .unwrap()
}

fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn streams_rpm_toward_target() {
    let opener = SimulatedOpener::new(fast_params());
    let s = session(&opener);
    s.connect(SIM_PORT).unwrap();
    s.set_pid(2.0, 0.5, 0.1);
    s.set_rpm(100.0);
    s.set_direction(Direction::Ccw);
    s.start().unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        s.snapshot().iter().any(|x| x.rpm > 50)
    }));
    assert!(wait_until(Duration::from_secs(1), || {
        s.reported_direction() == Some(Direction::Ccw)
    }));

    let gains = opener.gains().unwrap();
    assert_eq!((gains.kp, gains.ki, gains.kd), (2.0, 0.5, 0.1));

    s.stop();
    assert!(s.snapshot().is_empty());
    assert_eq!(opener.journal().last().map(String::as_str), Some("C=STOP"));
}

#[test]
fn garbage_lines_do_not_break_acquisition() {
    let opener = SimulatedOpener::new(SimParams {
        inject_garbage: true,
        ..fast_params()
    });
    let s = session(&opener);
    s.connect(SIM_PORT).unwrap();
    s.set_rpm(80.0);
    s.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || s.snapshot().len() >= 10));
    s.stop();
}

#[test]
fn unplug_is_detected() {
    let opener = SimulatedOpener::new(fast_params());
    let s = session(&opener);
    s.connect(SIM_PORT).unwrap();
    s.start().unwrap();
    assert!(wait_until(Duration::from_secs(2), || !s.snapshot().is_empty()));
    opener.unplug();
    assert!(wait_until(Duration::from_secs(1), || {
        s.connection_state() == ConnectionState::Disconnected
    }));
}

#[test]
fn unknown_port_fails_to_connect() {
    let s = session(&SimulatedOpener::default());
    assert!(s.connect("/dev/nope").is_err());
    assert_eq!(s.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn config_defaults_map_to_sim_params() {
    let p = sim_params(&pidpanel_config::SimCfg::default());
    assert_eq!(p.line_interval, SimParams::default().line_interval);
    assert_eq!(p.damping, SimParams::default().damping);
}
