use pidpanel_core::Sample;
use pidpanel_core::metrics::{Metrics, compute, error_series};
use proptest::prelude::*;
use rstest::rstest;

fn samples(points: &[(f64, i32)]) -> Vec<Sample> {
    points
        .iter()
        .map(|&(elapsed_s, rpm)| Sample { elapsed_s, rpm })
        .collect()
}

#[test]
fn step_response_example() {
    let m = compute(&samples(&[(0.0, 50), (1.0, 90), (2.0, 100)]), 100.0);
    assert_eq!(
        m,
        Metrics {
            steady_state_error: 0.0,
            sampling_time: 2.0,
            peak_time: 2.0,
            rise_time: 1.0,
            overshoot: 0.0,
        }
    );
}

#[rstest]
#[case(0.0)]
#[case(100.0)]
#[case(-50.0)]
fn empty_snapshot_is_all_zero(#[case] target: f64) {
    assert_eq!(compute(&[], target), Metrics::default());
}

#[test]
fn single_sample_has_no_sampling_time() {
    let m = compute(&samples(&[(0.4, 80)]), 100.0);
    assert_eq!(m.sampling_time, 0.0);
    assert_eq!(m.steady_state_error, 20.0);
    assert_eq!(m.peak_time, 0.4);
    assert_eq!(m.rise_time, 0.0);
    assert_eq!(m.overshoot, -20.0);
}

#[test]
fn peak_takes_first_of_equal_maxima() {
    let m = compute(&samples(&[(0.0, 10), (0.5, 120), (1.0, 120), (1.5, 100)]), 100.0);
    assert_eq!(m.peak_time, 0.5);
    assert_eq!(m.overshoot, 20.0);
    assert_eq!(m.rise_time, 0.5);
    assert_eq!(m.steady_state_error, 0.0);
}

#[test]
fn overshoot_is_negative_when_target_never_reached() {
    let m = compute(&samples(&[(0.0, 10), (1.0, 40), (2.0, 60)]), 100.0);
    assert_eq!(m.overshoot, -40.0);
    assert_eq!(m.rise_time, 0.0);
}

#[test]
fn rise_threshold_is_inclusive() {
    let m = compute(&samples(&[(0.0, 0), (0.2, 89), (0.3, 90), (0.4, 95)]), 100.0);
    assert_eq!(m.rise_time, 0.3);
}

#[test]
fn error_series_is_target_minus_rpm() {
    let e = error_series(&samples(&[(0.0, 0), (1.0, 110)]), 100.0);
    assert_eq!(e, vec![100.0, -10.0]);
}

fn arb_series() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec((0.0f64..0.5, -2000i32..2000), 1..64).prop_map(|steps| {
        let mut t = 0.0;
        steps
            .into_iter()
            .map(|(dt, rpm)| {
                t += dt;
                Sample { elapsed_s: t, rpm }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn metrics_stay_within_the_series(series in arb_series(), target in -2000.0f64..2000.0) {
        let m = compute(&series, target);
        let first = series[0].elapsed_s;
        let last = series[series.len() - 1].elapsed_s;

        prop_assert!(m.steady_state_error >= 0.0);
        prop_assert!(m.sampling_time >= 0.0);
        prop_assert!((m.sampling_time - (last - first)).abs() < 1e-9);
        prop_assert!(m.peak_time >= first && m.peak_time <= last);
        prop_assert!(m.rise_time == 0.0 || (m.rise_time >= first && m.rise_time <= last));

        let max = series.iter().map(|s| s.rpm).max().unwrap_or_default();
        prop_assert_eq!(m.overshoot, f64::from(max) - target);
    }

    #[test]
    fn metrics_are_deterministic(series in arb_series(), target in 0.0f64..1500.0) {
        prop_assert_eq!(compute(&series, target), compute(&series, target));
    }
}
