//! Small shared helpers for pidpanel_core.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every value guarded in this crate stays consistent between statements,
/// so a poisoned guard is still safe to use.
#[inline]
pub fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Format a metric value the way the panel labels show it.
#[inline]
pub fn fmt2(v: f64) -> String {
    format!("{v:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn lock_survives_poisoning() {
        let m = Arc::new(Mutex::new(5));
        let m2 = Arc::clone(&m);
        let _ = std::thread::spawn(move || {
            let _g = m2.lock().unwrap();
            panic!("poison it");
        })
        .join();
        assert!(m.is_poisoned());
        assert_eq!(*lock(&m), 5);
    }

    #[test]
    fn fmt2_rounds_to_two_places() {
        assert_eq!(fmt2(0.0), "0.00");
        assert_eq!(fmt2(1.005_1), "1.01");
        assert_eq!(fmt2(-12.5), "-12.50");
    }
}
