use std::time::{Duration, Instant};

/// Time left until `deadline`, or `None` once it has passed.
#[inline]
pub fn remaining_until(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() { None } else { Some(left) }
}
