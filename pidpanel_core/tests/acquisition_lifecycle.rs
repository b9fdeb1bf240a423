//! Acquisition thread lifecycle: decoding, shutdown and closed transports.

use pidpanel_core::mocks::ScriptedOpener;
use pidpanel_core::{Acquisition, DirectionCell, Direction, SampleBuffer, Transport};
use pidpanel_traits::clock::MonotonicClock;
use std::sync::Arc;
use std::time::{Duration, Instant};

const READ_TIMEOUT: Duration = Duration::from_millis(50);

fn connected(opener: &ScriptedOpener) -> Arc<Transport> {
    let t = Transport::new(Arc::new(opener.clone()), 9600, READ_TIMEOUT);
    t.connect("mock0").unwrap();
    Arc::new(t)
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
fn decodes_lines_and_skips_garbage() {
    let opener = ScriptedOpener::new();
    for line in ["RPM:abc", "hello", "", "RPM:7", "Dir:-1", "RPM:1:2", "RPM:9"] {
        opener.push_line(line);
    }
    let transport = connected(&opener);
    let buffer = Arc::new(SampleBuffer::new());
    let direction = Arc::new(DirectionCell::new());

    let acq = Acquisition::spawn(
        Arc::clone(&transport),
        Arc::clone(&buffer),
        Arc::clone(&direction),
        MonotonicClock::new(),
    )
    .unwrap();
    assert!(wait_until(Duration::from_secs(2), || buffer.len() == 2));
    drop(acq);

    let rpm: Vec<i32> = buffer.snapshot().iter().map(|s| s.rpm).collect();
    assert_eq!(rpm, vec![7, 9]);
    assert_eq!(direction.get(), Some(Direction::Cw));
}

#[test]
fn stop_halts_growth_within_one_read_timeout() {
    let opener = ScriptedOpener::new();
    opener.stream("RPM:100", Duration::from_millis(2));
    let transport = connected(&opener);
    let buffer = Arc::new(SampleBuffer::new());

    let acq = Acquisition::spawn(
        transport,
        Arc::clone(&buffer),
        Arc::new(DirectionCell::new()),
        MonotonicClock::new(),
    )
    .unwrap();
    assert!(wait_until(Duration::from_secs(2), || buffer.len() >= 5));

    let begin = Instant::now();
    acq.stop();
    assert!(begin.elapsed() <= READ_TIMEOUT + Duration::from_millis(200));

    let frozen = buffer.len();
    std::thread::sleep(READ_TIMEOUT * 3);
    assert_eq!(buffer.len(), frozen);
}

#[test]
fn timestamps_are_non_decreasing_and_start_near_zero() {
    let opener = ScriptedOpener::new();
    opener.stream("RPM:1", Duration::from_millis(3));
    let transport = connected(&opener);
    let buffer = Arc::new(SampleBuffer::new());
    let acq = Acquisition::spawn(
        transport,
        Arc::clone(&buffer),
        Arc::new(DirectionCell::new()),
        MonotonicClock::new(),
    )
    .unwrap();
    assert!(wait_until(Duration::from_secs(2), || buffer.len() >= 10));
    drop(acq);

    let snap = buffer.snapshot();
    assert!(snap[0].elapsed_s >= 0.0 && snap[0].elapsed_s < 1.0);
    for pair in snap.windows(2) {
        assert!(pair[0].elapsed_s <= pair[1].elapsed_s);
    }
}

#[test]
fn loop_exits_when_transport_disconnects() {
    let opener = ScriptedOpener::new();
    let transport = connected(&opener);
    let acq = Acquisition::spawn(
        Arc::clone(&transport),
        Arc::new(SampleBuffer::new()),
        Arc::new(DirectionCell::new()),
        MonotonicClock::new(),
    )
    .unwrap();
    assert!(!acq.is_finished());
    transport.disconnect();
    assert!(wait_until(READ_TIMEOUT * 4, || acq.is_finished()));
}

#[test]
fn loop_exits_when_link_fails() {
    let opener = ScriptedOpener::new();
    let transport = connected(&opener);
    let acq = Acquisition::spawn(
        Arc::clone(&transport),
        Arc::new(SampleBuffer::new()),
        Arc::new(DirectionCell::new()),
        MonotonicClock::new(),
    )
    .unwrap();
    opener.break_link();
    assert!(wait_until(READ_TIMEOUT * 4, || acq.is_finished()));
    assert!(!transport.is_connected());
}

#[test]
fn repeated_spawn_and_drop_does_not_hang() {
    let opener = ScriptedOpener::new();
    let transport = connected(&opener);
    for _ in 0..10 {
        let acq = Acquisition::spawn(
            Arc::clone(&transport),
            Arc::new(SampleBuffer::new()),
            Arc::new(DirectionCell::new()),
            MonotonicClock::new(),
        )
        .unwrap();
        assert_eq!(transport.active_readers(), 1);
        std::thread::sleep(Duration::from_millis(5));
        drop(acq);
        assert_eq!(transport.active_readers(), 0);
    }
}

#[test]
fn reader_count_tracks_every_live_loop() {
    let opener = ScriptedOpener::new();
    let transport = connected(&opener);
    let spawn = || {
        Acquisition::spawn(
            Arc::clone(&transport),
            Arc::new(SampleBuffer::new()),
            Arc::new(DirectionCell::new()),
            MonotonicClock::new(),
        )
        .unwrap()
    };
    let first = spawn();
    let second = spawn();
    std::thread::sleep(Duration::from_millis(100));
    assert!(!first.is_finished() && !second.is_finished());
    assert_eq!(transport.active_readers(), 2);

    drop(second);
    assert_eq!(transport.active_readers(), 1);
    transport.disconnect();
    assert!(wait_until(READ_TIMEOUT * 4, || first.is_finished()));
    assert!(wait_until(Duration::from_millis(200), || transport.active_readers() == 0));
}

#[test]
fn spawn_failure_is_reported_and_detaches() {
    let opener = ScriptedOpener::new();
    let transport = connected(&opener);
    // No address space can hold this stack, so the OS refuses the thread.
    let builder = std::thread::Builder::new().stack_size(1 << 60);
    let res = Acquisition::spawn_with(
        builder,
        Arc::clone(&transport),
        Arc::new(SampleBuffer::new()),
        Arc::new(DirectionCell::new()),
        MonotonicClock::new(),
    );
    assert!(res.is_err());
    assert_eq!(transport.active_readers(), 0);
    assert_eq!(opener.total_reads(), 0);
}
