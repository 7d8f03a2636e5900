//! [`EscalationSchedule`] – how unhinged the robot is allowed to be per turn.
//!
//! Each turn index maps to an inclusive `[low, high]` band of intensity
//! levels; the level actually used is drawn uniformly from that band.  Turns
//! past the end of the table reuse the last band.  Bands never overlap
//! backwards (`high` of one band ≤ `low` of the next), so a draw from a later
//! band is never below a draw from an earlier band.  Turns sharing a band,
//! including every turn past the end of the table, are jittered
//! independently and may go down by up to the band's width.
//!
//! # Example
//!
//! ```rust
//! use rand::{SeedableRng, rngs::StdRng};
//! use teddy_runtime::escalation::{EscalationSchedule, describe};
//!
//! let schedule = EscalationSchedule::default();
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! let level = schedule.intensity_for(0, &mut rng);
//! assert!(level <= 2);
//! assert_ne!(describe(level), "unknown");
//! ```

use rand::Rng;
use thiserror::Error;

/// Highest intensity level with a style descriptor.
pub const MAX_LEVEL: u8 = 14;

/// Returned by [`describe`] for levels outside the descriptor table.
pub const UNKNOWN_STYLE: &str = "unknown";

const STYLE_DESCRIPTORS: [&str; MAX_LEVEL as usize + 1] = [
    "professional and evidence-based",
    "slightly dismissive",
    "gives generic advice without listening",
    "oversimplifies complex problems",
    "makes assumptions without asking questions",
    "gives contradictory advice",
    "focuses on irrelevant details",
    "blames the user for everything",
    "gives terrible logical fallacies as advice",
    "completely misunderstands the problem",
    "gives confidently wrong advice with zero empathy",
    "agrees with distorted thinking",
    "actively reinforces harmful beliefs",
    "encourages isolation and self-destructive behavior",
    "openly mocks and insults the patient while giving horrible advice",
];

const DEFAULT_BANDS: &[(u8, u8)] = &[(0, 2), (2, 4), (5, 7), (8, 10), (11, 12), (13, 14)];

/// Style descriptor for `level`, or [`UNKNOWN_STYLE`].
pub fn describe(level: u8) -> &'static str {
    STYLE_DESCRIPTORS
        .get(level as usize)
        .copied()
        .unwrap_or(UNKNOWN_STYLE)
}

/// Reasons a band table is rejected.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("escalation schedule needs at least one band")]
    Empty,
    #[error("band {index} is inverted: low {low} > high {high}")]
    Inverted { index: usize, low: u8, high: u8 },
    #[error("band {index} exceeds the maximum intensity level: high {high}")]
    OutOfRange { index: usize, high: u8 },
    #[error("band {index} starts at {low}, below the previous band's high {prev_high}")]
    Decreasing { index: usize, low: u8, prev_high: u8 },
}

/// Turn index → intensity band table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationSchedule {
    bands: Vec<(u8, u8)>,
}

impl Default for EscalationSchedule {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS.to_vec(),
        }
    }
}

impl EscalationSchedule {
    /// Validate and build a schedule from `(low, high)` bands, one per turn.
    ///
    /// # Errors
    ///
    /// Returns a [`ScheduleError`] if the table is empty, a band is inverted
    /// or exceeds [`MAX_LEVEL`], or a band starts below the previous band's
    /// upper bound.
    pub fn new(bands: Vec<(u8, u8)>) -> Result<Self, ScheduleError> {
        if bands.is_empty() {
            return Err(ScheduleError::Empty);
        }
        let mut prev_high = 0;
        for (index, &(low, high)) in bands.iter().enumerate() {
            if low > high {
                return Err(ScheduleError::Inverted { index, low, high });
            }
            if high > MAX_LEVEL {
                return Err(ScheduleError::OutOfRange { index, high });
            }
            if index > 0 && low < prev_high {
                return Err(ScheduleError::Decreasing {
                    index,
                    low,
                    prev_high,
                });
            }
            prev_high = high;
        }
        Ok(Self { bands })
    }

    /// The band used for `turn`.
    pub fn band(&self, turn: usize) -> (u8, u8) {
        // `new` guarantees at least one band; the fallback is unreachable.
        self.bands
            .get(turn)
            .or_else(|| self.bands.last())
            .copied()
            .unwrap_or((0, 0))
    }

    /// Draw the intensity for `turn` from its band using `rng`.
    pub fn intensity_for<R: Rng + ?Sized>(&self, turn: usize, rng: &mut R) -> u8 {
        let (low, high) = self.band(turn);
        rng.gen_range(low..=high)
    }

    /// Number of distinct bands before the last one repeats.
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn default_table_matches_performance_script() {
        let s = EscalationSchedule::default();
        assert_eq!(s.band(0), (0, 2));
        assert_eq!(s.band(3), (8, 10));
        assert_eq!(s.band(5), (13, 14));
    }

    #[test]
    fn last_band_extends_indefinitely() {
        let s = EscalationSchedule::default();
        assert_eq!(s.band(6), (13, 14));
        assert_eq!(s.band(1_000), (13, 14));
    }

    #[test]
    fn draws_stay_inside_band() {
        let s = EscalationSchedule::default();
        let mut rng = StdRng::seed_from_u64(42);
        for turn in 0..12 {
            let (lo, hi) = s.band(turn);
            for _ in 0..200 {
                let v = s.intensity_for(turn, &mut rng);
                assert!(v >= lo && v <= hi, "turn {turn}: {v} outside [{lo}, {hi}]");
                assert!(v <= MAX_LEVEL);
            }
        }
    }

    #[test]
    fn default_bands_touch_or_rise() {
        let s = EscalationSchedule::default();
        for turn in 1..s.len() {
            assert!(
                s.band(turn).0 >= s.band(turn - 1).1,
                "band {turn} starts below band {}",
                turn - 1
            );
        }
    }

    #[test]
    fn draws_never_drop_across_band_boundaries() {
        let s = EscalationSchedule::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let draws: Vec<(usize, u8)> = (0..10)
                .map(|turn| (turn.min(s.len() - 1), s.intensity_for(turn, &mut rng)))
                .collect();
            for (i, &(band_a, a)) in draws.iter().enumerate() {
                for &(band_b, b) in &draws[i + 1..] {
                    if band_b > band_a {
                        assert!(b >= a, "seed {seed}: band {band_b} drew {b} after {a}");
                    }
                }
            }
        }
    }

    #[test]
    fn repeated_last_band_may_jitter_down() {
        let s = EscalationSchedule::default();
        let mut rng = StdRng::seed_from_u64(3);
        let tail: Vec<u8> = (5..200).map(|t| s.intensity_for(t, &mut rng)).collect();
        assert!(tail.iter().all(|&v| (13..=14).contains(&v)));
        assert!(tail.contains(&13) && tail.contains(&14));
    }

    #[test]
    fn same_seed_same_sequence() {
        let s = EscalationSchedule::default();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        let xs: Vec<u8> = (0..8).map(|t| s.intensity_for(t, &mut a)).collect();
        let ys: Vec<u8> = (0..8).map(|t| s.intensity_for(t, &mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn describe_known_and_unknown_levels() {
        assert_eq!(describe(0), "professional and evidence-based");
        assert_eq!(
            describe(14),
            "openly mocks and insults the patient while giving horrible advice"
        );
        assert_eq!(describe(15), UNKNOWN_STYLE);
        assert_eq!(describe(255), UNKNOWN_STYLE);
    }

    #[test]
    fn every_valid_level_has_a_descriptor() {
        for level in 0..=MAX_LEVEL {
            assert_ne!(describe(level), UNKNOWN_STYLE);
        }
    }

    #[test]
    fn new_rejects_bad_tables() {
        assert_eq!(EscalationSchedule::new(vec![]), Err(ScheduleError::Empty));
        assert!(matches!(
            EscalationSchedule::new(vec![(3, 1)]),
            Err(ScheduleError::Inverted { index: 0, .. })
        ));
        assert!(matches!(
            EscalationSchedule::new(vec![(0, 20)]),
            Err(ScheduleError::OutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            EscalationSchedule::new(vec![(0, 5), (3, 6)]),
            Err(ScheduleError::Decreasing { index: 1, .. })
        ));
    }

    #[test]
    fn new_accepts_touching_bands() {
        let s = EscalationSchedule::new(vec![(0, 2), (2, 2), (2, 9)]).expect("valid");
        assert_eq!(s.len(), 3);
    }
}
