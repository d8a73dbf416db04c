//! Statistical sanity check on a long random walk: event count lands
//! near the closed-form expectation and kinds strictly alternate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tickflow_dc::{DcDetector, DcEventKind};

const TICKS: usize = 100_000;
const STEP: f64 = 0.002; // relative move per tick
const THETA: f64 = 0.01;

#[test]
fn random_walk_event_count_matches_expectation() {
    let mut rng = StdRng::seed_from_u64(0x71C5);
    let mut detector = DcDetector::new(THETA).expect("valid theta");

    let mut price = 150.0f64;
    let mut events = Vec::new();
    for i in 0..TICKS {
        let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        price *= 1.0 + direction * STEP;
        if let Some(event) = detector.process_tick(i as i64 * 1_000, price) {
            events.push(event);
        }
    }

    // For a symmetric walk with per-tick relative step s, directional
    // changes of size theta arrive roughly every (theta / s)^2 ticks.
    let expected = TICKS as f64 / (THETA / STEP).powi(2);
    let count = events.len() as f64;
    assert!(
        count > expected / 6.0 && count < expected * 6.0,
        "event count {} far from expectation {}",
        count,
        expected
    );

    for pair in events.windows(2) {
        assert_ne!(pair[0].kind, pair[1].kind, "kinds must alternate");
    }
    assert!(events
        .iter()
        .all(|e| matches!(e.kind, DcEventKind::Upturn | DcEventKind::Downturn)));
}
