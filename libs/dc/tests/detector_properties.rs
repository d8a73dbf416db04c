//! Property-based invariants of the directional-change detector.

use proptest::prelude::*;
use tickflow_dc::{DcDetector, DcEvent, DcEventKind, Trend};

/// A tick stream with non-decreasing timestamps and finite positive
/// prices, the domain over which the detector guarantees its
/// invariants.
fn tick_streams() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0i64..1_000_000, 1.0f64..10_000.0), 0..400).prop_map(|mut ticks| {
        let mut clock = 0i64;
        for (dt, _) in ticks.iter_mut() {
            clock += *dt;
            *dt = clock;
        }
        ticks
    })
}

fn thetas() -> impl Strategy<Value = f64> {
    0.0005f64..0.2
}

fn run(theta: f64, ticks: &[(i64, f64)]) -> (DcDetector, Vec<DcEvent>) {
    let mut detector = DcDetector::new(theta).expect("strategy generates valid thetas");
    let events = ticks
        .iter()
        .filter_map(|&(ts, price)| detector.process_tick(ts, price))
        .collect();
    (detector, events)
}

proptest! {
    /// Invariant 1: processing never panics and the trend stays in its
    /// three-value domain.
    #[test]
    fn trend_domain_holds(theta in thetas(), ticks in tick_streams()) {
        let (detector, _) = run(theta, &ticks);
        prop_assert!(matches!(
            detector.trend(),
            Trend::Unknown | Trend::Up | Trend::Down
        ));
    }

    /// Invariant 2: consecutive events alternate kind, and each event
    /// was confirmed by a move of at least theta against the extreme
    /// that closed the prior trend.
    #[test]
    fn events_alternate(theta in thetas(), ticks in tick_streams()) {
        let (_, events) = run(theta, &ticks);
        for pair in events.windows(2) {
            prop_assert_ne!(pair[0].kind, pair[1].kind);
        }
    }

    /// Invariant 3: from the second event on, the closed trend spans at
    /// least one threshold unit. (The first event measures against the
    /// seed tick, which is not a trend extreme.)
    #[test]
    fn extent_is_at_least_one_threshold_unit(theta in thetas(), ticks in tick_streams()) {
        let (_, events) = run(theta, &ticks);
        for event in events.iter().skip(1) {
            prop_assert!(
                event.tmv_ext >= 1.0 - 1e-9,
                "tmv_ext {} below one threshold unit",
                event.tmv_ext
            );
        }
    }

    /// Invariant 4: reset restores determinism: the same input yields
    /// the same event sequence.
    #[test]
    fn reset_is_deterministic(theta in thetas(), ticks in tick_streams()) {
        let mut detector = DcDetector::new(theta).expect("valid theta");
        let first: Vec<DcEvent> = ticks
            .iter()
            .filter_map(|&(ts, price)| detector.process_tick(ts, price))
            .collect();

        detector.reset();
        let second: Vec<DcEvent> = ticks
            .iter()
            .filter_map(|&(ts, price)| detector.process_tick(ts, price))
            .collect();

        prop_assert_eq!(first, second);
    }

    /// Durations are non-negative whenever timestamps are
    /// non-decreasing, and analytics are always finite.
    #[test]
    fn analytics_stay_finite(theta in thetas(), ticks in tick_streams()) {
        let (_, events) = run(theta, &ticks);
        for event in &events {
            prop_assert!(event.duration >= 0);
            prop_assert!(event.tmv_ext.is_finite());
            prop_assert!(event.time_adjusted_return.is_finite());
            prop_assert!(matches!(
                event.kind,
                DcEventKind::Upturn | DcEventKind::Downturn
            ));
        }
    }
}
