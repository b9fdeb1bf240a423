//! Step-response statistics over a buffer snapshot.

use crate::buffer::Sample;

/// Fraction of the target speed that counts as "risen".
pub const RISE_FRACTION: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub steady_state_error: f64,
    pub sampling_time: f64,
    pub peak_time: f64,
    pub rise_time: f64,
    /// `max(rpm) - target`. Negative while the target has not been reached.
    pub overshoot: f64,
}

/// Compute all five statistics from one snapshot.
///
/// An empty snapshot yields all zeros whatever the target.
pub fn compute(samples: &[Sample], target_rpm: f64) -> Metrics {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Metrics::default();
    };

    // First occurrence wins on ties.
    let peak = samples
        .iter()
        .fold(first, |best, s| if s.rpm > best.rpm { s } else { best });

    let rise_time = samples
        .iter()
        .find(|s| f64::from(s.rpm) >= RISE_FRACTION * target_rpm)
        .map_or(0.0, |s| s.elapsed_s);

    Metrics {
        steady_state_error: (target_rpm - f64::from(last.rpm)).abs(),
        sampling_time: if samples.len() >= 2 {
            last.elapsed_s - first.elapsed_s
        } else {
            0.0
        },
        peak_time: peak.elapsed_s,
        rise_time,
        overshoot: f64::from(peak.rpm) - target_rpm,
    }
}

/// Per-sample tracking error `target - rpm`, aligned with the snapshot.
pub fn error_series(samples: &[Sample], target_rpm: f64) -> Vec<f64> {
    samples
        .iter()
        .map(|s| target_rpm - f64::from(s.rpm))
        .collect()
}
