use pidpanel_core::mocks::ScriptedOpener;
use pidpanel_core::{ConnectionState, PanelError, ReadOutcome, Transport};
use std::sync::Arc;
use std::time::Duration;

fn transport(opener: &ScriptedOpener) -> Transport {
    Transport::new(Arc::new(opener.clone()), 9600, Duration::from_millis(20))
}

#[test]
fn connect_failure_is_a_connection_error() {
    let t = Transport::new(
        Arc::new(ScriptedOpener::failing()),
        9600,
        Duration::from_millis(20),
    );
    let err = t.connect("/dev/ttyACM9").unwrap_err();
    match err.downcast_ref::<PanelError>() {
        Some(PanelError::Connection(msg)) => assert!(msg.contains("/dev/ttyACM9")),
        other => panic!("expected Connection, got {other:?}"),
    }
    assert_eq!(t.state(), ConnectionState::Disconnected);
    assert_eq!(t.port(), None);
}

#[test]
fn reads_lines_then_times_out() {
    let opener = ScriptedOpener::new();
    opener.push_line("RPM:1");
    let t = transport(&opener);
    t.connect("mock0").unwrap();
    assert_eq!(t.state(), ConnectionState::Connected);
    assert_eq!(t.port().as_deref(), Some("mock0"));
    assert_eq!(t.read_line(), ReadOutcome::Line("RPM:1".into()));
    assert_eq!(t.read_line(), ReadOutcome::Timeout);
}

#[test]
fn sends_only_while_connected() {
    let opener = ScriptedOpener::new();
    let t = transport(&opener);
    assert!(!t.send_line("C=GO"));
    t.connect("mock0").unwrap();
    assert!(t.send_line("R=100"));
    t.disconnect();
    assert!(!t.send_line("C=STOP"));
    assert_eq!(opener.written(), vec!["R=100".to_string()]);
}

#[test]
fn disconnect_is_idempotent_and_closes_reads() {
    let opener = ScriptedOpener::new();
    let t = transport(&opener);
    t.disconnect();
    t.connect("mock0").unwrap();
    t.disconnect();
    t.disconnect();
    assert_eq!(t.read_line(), ReadOutcome::Closed);
    assert_eq!(t.state(), ConnectionState::Disconnected);
}

#[test]
fn read_failure_closes_the_connection() {
    let opener = ScriptedOpener::new();
    let t = transport(&opener);
    t.connect("mock0").unwrap();
    opener.break_link();
    assert_eq!(t.read_line(), ReadOutcome::Closed);
    assert!(!t.is_connected());
}

#[test]
fn reconnect_replaces_the_link() {
    let opener = ScriptedOpener::new();
    let t = transport(&opener);
    t.connect("a").unwrap();
    t.connect("b").unwrap();
    assert_eq!(opener.opened(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(t.port().as_deref(), Some("b"));
}
