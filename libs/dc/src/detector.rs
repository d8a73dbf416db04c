//! The directional-change state machine.

use thiserror::Error;
use tickflow_types::DcEventKind;

/// Canonical threshold: 0.4 % relative move.
pub const DEFAULT_THETA: f64 = 0.004;

const NANOS_PER_SEC: f64 = 1e9;

/// Detector construction/configuration errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DcError {
    #[error("threshold must be a finite positive number, got {0}")]
    InvalidTheta(f64),
}

/// Current trend of the instrument as seen by the detector.
///
/// `Unknown` holds only until the first confirmed event; the asymmetry
/// rules treat it as an uptrend, so the first event can be either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trend {
    #[default]
    Unknown,
    Up,
    Down,
}

/// A confirmed trend reversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcEvent {
    /// `Upturn` or `Downturn`; never `None`. A non-event is the
    /// absence of a `DcEvent`.
    pub kind: DcEventKind,
    /// Timestamp of the tick that confirmed the turn.
    pub timestamp: i64,
    /// Price of the confirming tick.
    pub price: f64,
    /// |extreme - previous extreme| / (previous extreme * θ): how many
    /// threshold units the closed trend moved. Direction is carried by
    /// `kind`, so the extent is sign-free.
    pub tmv_ext: f64,
    /// extreme timestamp minus previous extreme timestamp, nanoseconds.
    pub duration: i64,
    /// tmv_ext per second of trend duration, scaled by θ. Can exceed
    /// 1.0 on fast reversals.
    pub time_adjusted_return: f64,
}

/// Incremental directional-change detector for a single instrument.
///
/// Tracks the running extreme of the current trend and the extreme
/// that closed the previous trend. A reversal is confirmed when the
/// price moves at least θ (relative) against the running extreme; the
/// threshold is applied against the extreme, never against the prior
/// event's confirmation price.
#[derive(Debug, Clone)]
pub struct DcDetector {
    theta: f64,
    trend: Trend,
    seeded: bool,
    extreme_price: f64,
    extreme_timestamp: i64,
    previous_extreme_price: f64,
    previous_extreme_timestamp: i64,
    last_event: Option<DcEvent>,
}

impl DcDetector {
    /// Create a detector with the given relative threshold.
    pub fn new(theta: f64) -> Result<Self, DcError> {
        if !theta.is_finite() || theta <= 0.0 {
            return Err(DcError::InvalidTheta(theta));
        }
        Ok(Self {
            theta,
            trend: Trend::Unknown,
            seeded: false,
            extreme_price: 0.0,
            extreme_timestamp: 0,
            previous_extreme_price: 0.0,
            previous_extreme_timestamp: 0,
            last_event: None,
        })
    }

    /// Advance the state machine by one tick.
    ///
    /// Returns the confirmed event, if this tick closed a trend. The
    /// first tick only seeds the extremes. Non-finite prices are
    /// rejected silently: no event, state unchanged.
    pub fn process_tick(&mut self, timestamp: i64, price: f64) -> Option<DcEvent> {
        if !price.is_finite() {
            return None;
        }

        if !self.seeded {
            self.extreme_price = price;
            self.extreme_timestamp = timestamp;
            self.previous_extreme_price = price;
            self.previous_extreme_timestamp = timestamp;
            self.seeded = true;
            return None;
        }

        match self.trend {
            // Unknown behaves as an uptrend: track highs, confirm on
            // the first θ retracement either way.
            Trend::Unknown | Trend::Up => {
                if price > self.extreme_price {
                    self.extreme_price = price;
                    self.extreme_timestamp = timestamp;
                    None
                } else if (self.extreme_price - price) / self.extreme_price >= self.theta {
                    let event = self.confirm(DcEventKind::Downturn, timestamp, price);
                    self.trend = Trend::Down;
                    Some(event)
                } else {
                    None
                }
            }
            Trend::Down => {
                if price < self.extreme_price {
                    self.extreme_price = price;
                    self.extreme_timestamp = timestamp;
                    None
                } else if (price - self.extreme_price) / self.extreme_price >= self.theta {
                    let event = self.confirm(DcEventKind::Upturn, timestamp, price);
                    self.trend = Trend::Up;
                    Some(event)
                } else {
                    None
                }
            }
        }
    }

    /// Build the event for a confirmed turn and rotate the extremes:
    /// the extreme that just closed becomes the previous extreme, and
    /// the confirming tick reseeds the running extreme.
    fn confirm(&mut self, kind: DcEventKind, timestamp: i64, price: f64) -> DcEvent {
        let tmv_ext = self.trend_extent();
        let duration = self.extreme_timestamp - self.previous_extreme_timestamp;
        let event = DcEvent {
            kind,
            timestamp,
            price,
            tmv_ext,
            duration,
            time_adjusted_return: Self::time_adjusted_return(tmv_ext, duration, self.theta),
        };

        self.previous_extreme_price = self.extreme_price;
        self.previous_extreme_timestamp = self.extreme_timestamp;
        self.extreme_price = price;
        self.extreme_timestamp = timestamp;
        self.last_event = Some(event);
        event
    }

    /// Extent of the closing trend in threshold units.
    fn trend_extent(&self) -> f64 {
        if self.previous_extreme_price == 0.0 {
            return 0.0;
        }
        (self.extreme_price - self.previous_extreme_price).abs()
            / (self.previous_extreme_price * self.theta)
    }

    fn time_adjusted_return(tmv_ext: f64, duration: i64, theta: f64) -> f64 {
        if duration <= 0 {
            return 0.0;
        }
        (tmv_ext / (duration as f64 / NANOS_PER_SEC)) * theta
    }

    /// Change the threshold; takes effect from the next tick.
    pub fn set_theta(&mut self, theta: f64) -> Result<(), DcError> {
        if !theta.is_finite() || theta <= 0.0 {
            return Err(DcError::InvalidTheta(theta));
        }
        self.theta = theta;
        Ok(())
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn last_event(&self) -> Option<&DcEvent> {
        self.last_event.as_ref()
    }

    /// Return the detector to its pre-first-tick state; θ is kept.
    pub fn reset(&mut self) {
        self.trend = Trend::Unknown;
        self.seeded = false;
        self.extreme_price = 0.0;
        self.extreme_timestamp = 0;
        self.previous_extreme_price = 0.0;
        self.previous_extreme_timestamp = 0;
        self.last_event = None;
    }
}

impl Default for DcDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THETA).expect("default threshold is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: i64 = 1_000_000;

    fn feed(detector: &mut DcDetector, prices: &[f64]) -> Vec<DcEvent> {
        prices
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| detector.process_tick(i as i64 * MS, p))
            .collect()
    }

    #[test]
    fn single_tick_emits_nothing() {
        let mut detector = DcDetector::new(0.01).unwrap();
        assert_eq!(detector.process_tick(0, 100.0), None);
        assert_eq!(detector.trend(), Trend::Unknown);
    }

    #[test]
    fn monotone_rise_never_confirms() {
        let mut detector = DcDetector::new(0.01).unwrap();
        let prices: Vec<f64> = (0..500).map(|i| 100.0 + i as f64).collect();
        assert!(feed(&mut detector, &prices).is_empty());
        assert_eq!(detector.trend(), Trend::Unknown);
    }

    #[test]
    fn rally_then_retracement_confirms_downturn() {
        // Extreme 103.0, drop to 101.5 is ~1.46 % >= 1 %.
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(&mut detector, &[100.0, 101.0, 102.0, 103.0, 101.5]);

        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.kind, DcEventKind::Downturn);
        assert_eq!(event.timestamp, 4 * MS);
        assert_eq!(event.price, 101.5);
        // Extent: (103.0 - 100.0) / (100.0 * 0.01)
        assert!((event.tmv_ext - 3.0).abs() < 1e-12);
        assert_eq!(event.duration, 3 * MS);
        assert_eq!(detector.trend(), Trend::Down);
    }

    #[test]
    fn decline_then_recovery_confirms_upturn() {
        // The second tick is an exact 1 % drop from the seed, which
        // already confirms a degenerate downturn (the seed is the
        // up-extreme, so the closed trend has zero extent and
        // duration). The recovery to 98.5 (~1.55 % off the 97.0 low)
        // then confirms the upturn.
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(&mut detector, &[100.0, 99.0, 98.0, 97.0, 98.5]);

        assert_eq!(events.len(), 2);

        let downturn = events[0];
        assert_eq!(downturn.kind, DcEventKind::Downturn);
        assert_eq!(downturn.timestamp, MS);
        assert_eq!(downturn.price, 99.0);
        assert_eq!(downturn.tmv_ext, 0.0);
        assert_eq!(downturn.duration, 0);
        assert_eq!(downturn.time_adjusted_return, 0.0);

        let upturn = events[1];
        assert_eq!(upturn.kind, DcEventKind::Upturn);
        assert_eq!(upturn.price, 98.5);
        // Extent: (100.0 - 97.0) / (100.0 * 0.01), measured against
        // the seed extreme the downturn rotated out.
        assert!((upturn.tmv_ext - 3.0).abs() < 1e-12);
        assert_eq!(upturn.duration, 3 * MS);
        assert_eq!(detector.trend(), Trend::Up);
    }

    #[test]
    fn shallow_chop_stays_silent() {
        // Largest retracement ~0.49 %, below the 1 % threshold.
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(
            &mut detector,
            &[100.0, 100.5, 101.0, 100.8, 101.2, 101.8, 101.5, 102.0],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn alternating_swings_confirm_each_reversal() {
        // 102.0 -> 100.8 is ~1.18 % (downturn), 100.8 -> 102.5 is
        // ~1.69 % (upturn), 102.5 -> 101.2 is ~1.27 % (downturn).
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(&mut detector, &[100.0, 102.0, 100.8, 102.5, 101.2]);

        let kinds: Vec<DcEventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DcEventKind::Downturn,
                DcEventKind::Upturn,
                DcEventKind::Downturn
            ]
        );
        assert_eq!(events[0].price, 100.8);
        assert_eq!(events[1].price, 102.5);
        assert_eq!(events[2].price, 101.2);
    }

    #[test]
    fn move_exactly_at_threshold_confirms() {
        let mut detector = DcDetector::new(0.01).unwrap();
        // 100.0 -> 99.0 is exactly 1 %.
        let events = feed(&mut detector, &[100.0, 99.0]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, DcEventKind::Downturn);
    }

    #[test]
    fn move_just_under_threshold_does_not_confirm() {
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(&mut detector, &[100.0, 99.01]);
        assert!(events.is_empty());
    }

    #[test]
    fn time_adjusted_return_has_theta_per_second_units() {
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(&mut detector, &[100.0, 101.0, 102.0, 103.0, 101.5]);
        let event = events[0];
        // tmv 3.0 over 3 ms, scaled by theta: (3.0 / 0.003) * 0.01.
        assert!((event.time_adjusted_return - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_yields_zero_return() {
        let mut detector = DcDetector::new(0.01).unwrap();
        // Seed and immediate confirming drop at the same timestamp:
        // extreme and previous extreme share the seed timestamp.
        assert!(detector.process_tick(0, 100.0).is_none());
        let event = detector.process_tick(0, 98.0).unwrap();
        assert_eq!(event.duration, 0);
        assert_eq!(event.time_adjusted_return, 0.0);
    }

    #[test]
    fn non_finite_prices_are_ignored() {
        let mut detector = DcDetector::new(0.01).unwrap();
        detector.process_tick(0, 100.0);
        detector.process_tick(MS, 103.0);

        let snapshot = detector.clone();
        assert_eq!(detector.process_tick(2 * MS, f64::NAN), None);
        assert_eq!(detector.process_tick(3 * MS, f64::INFINITY), None);
        assert_eq!(detector.process_tick(4 * MS, f64::NEG_INFINITY), None);
        assert_eq!(detector.trend(), snapshot.trend());
        assert_eq!(detector.last_event().copied(), None);

        // The stream picks up where it left off.
        let event = detector.process_tick(5 * MS, 101.5).unwrap();
        assert_eq!(event.kind, DcEventKind::Downturn);
    }

    #[test]
    fn theta_change_applies_from_next_tick() {
        let mut detector = DcDetector::new(0.05).unwrap();
        detector.process_tick(0, 100.0);
        // A 2 % drop does not confirm at theta = 5 %.
        assert!(detector.process_tick(MS, 98.0).is_none());

        detector.set_theta(0.01).unwrap();
        // Same price level confirms once the threshold tightens.
        let event = detector.process_tick(2 * MS, 98.0).unwrap();
        assert_eq!(event.kind, DcEventKind::Downturn);
    }

    #[test]
    fn invalid_theta_is_rejected() {
        assert!(DcDetector::new(0.0).is_err());
        assert!(DcDetector::new(-0.01).is_err());
        assert!(DcDetector::new(f64::NAN).is_err());
        let mut detector = DcDetector::default();
        assert_eq!(detector.set_theta(0.0), Err(DcError::InvalidTheta(0.0)));
    }

    #[test]
    fn reset_reproduces_the_same_event_sequence() {
        let prices = [100.0, 102.0, 100.8, 102.5, 101.2, 103.0, 101.0];
        let mut detector = DcDetector::new(0.01).unwrap();
        let first = feed(&mut detector, &prices);

        detector.reset();
        assert_eq!(detector.trend(), Trend::Unknown);
        assert!(detector.last_event().is_none());

        let second = feed(&mut detector, &prices);
        assert_eq!(first, second);
    }

    #[test]
    fn last_event_tracks_latest_confirmation() {
        let mut detector = DcDetector::new(0.01).unwrap();
        let events = feed(&mut detector, &[100.0, 102.0, 100.8, 102.5]);
        assert_eq!(detector.last_event(), events.last());
    }
}
