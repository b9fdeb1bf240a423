use std::time::{Duration, Instant};

use pidpanel_hardware::util::remaining_until;

#[test]
fn remaining_until_future_deadline() {
    let deadline = Instant::now() + Duration::from_millis(200);
    let left = remaining_until(deadline).expect("deadline in the future");
    assert!(left <= Duration::from_millis(200));
    assert!(left > Duration::from_millis(100));
}

#[test]
fn remaining_until_past_deadline_is_none() {
    let deadline = Instant::now();
    std::thread::sleep(Duration::from_millis(2));
    assert!(remaining_until(deadline).is_none());
}
