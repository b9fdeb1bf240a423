//! Time-stamped RPM samples shared between the acquisition loop and readers.

use crate::util::lock;
use std::sync::Mutex;

/// One RPM reading, stamped with seconds since the acquisition loop started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub elapsed_s: f64,
    pub rpm: i32,
}

/// Append-only sample history for the current run.
///
/// Readers always get a consistent copy: `times[i]` and `rpm[i]` come from
/// the same append, and the two series never differ in length.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Mutex<Vec<Sample>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. A timestamp earlier than the last one is clamped so
    /// the series stays non-decreasing.
    pub fn append(&self, elapsed_s: f64, rpm: i32) {
        let mut samples = lock(&self.samples);
        let elapsed_s = match samples.last() {
            Some(last) if elapsed_s < last.elapsed_s || elapsed_s.is_nan() => last.elapsed_s,
            _ if elapsed_s.is_nan() => 0.0,
            _ => elapsed_s,
        };
        samples.push(Sample { elapsed_s, rpm });
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        lock(&self.samples).clone()
    }

    /// Drop every sample and return what was held.
    pub fn reset(&self) -> Vec<Sample> {
        std::mem::take(&mut *lock(&self.samples))
    }

    pub fn len(&self) -> usize {
        lock(&self.samples).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.samples).is_empty()
    }
}
