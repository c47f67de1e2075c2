// Timing window lookup shared by the precomputer and the live engine so the
// "best possible" ceiling and the awarded points always come from the same table.

use crate::game::scoring_profile::{AccuracyTier, TimingWindow};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub tier: AccuracyTier,
    pub primary_points: u32,
    pub secondary_points: u32,
}

/// Maps an absolute timing offset (seconds) to the first window whose upper
/// bound exceeds it. Offsets past every bound fall into the last window.
#[inline(always)]
pub fn resolve(offset_abs_s: f32, windows: &[TimingWindow]) -> Resolution {
    let chosen = windows
        .iter()
        .find(|w| offset_abs_s < w.upper_bound_s)
        .or_else(|| windows.last());
    match chosen {
        Some(w) => Resolution {
            tier: w.tier,
            primary_points: w.primary_points,
            secondary_points: w.secondary_points,
        },
        None => Resolution {
            tier: AccuracyTier::Okay,
            primary_points: 0,
            secondary_points: 0,
        },
    }
}

/// Highest primary value any window in the table can award.
#[inline(always)]
pub fn best_points(windows: &[TimingWindow]) -> u32 {
    windows.iter().map(|w| w.primary_points).max().unwrap_or(0)
}

/// Early/late bookkeeping over the signed offsets of timed hits.
/// Negative offsets are early, positive are late, exact zero counts as neither.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TimingTendency {
    pub early: u32,
    pub late: u32,
    pub count: u32,
    sum_offset_s: f64,
}

impl TimingTendency {
    pub fn record(&mut self, offset_s: f32) {
        if !offset_s.is_finite() {
            return;
        }
        if offset_s < 0.0 {
            self.early = self.early.saturating_add(1);
        } else if offset_s > 0.0 {
            self.late = self.late.saturating_add(1);
        }
        self.count = self.count.saturating_add(1);
        self.sum_offset_s += f64::from(offset_s);
    }

    pub fn mean_offset_s(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum_offset_s / f64::from(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::{TimingTendency, best_points, resolve};
    use crate::game::note::WindowSet;
    use crate::game::scoring_profile::{AccuracyTier, ScoringProfile};

    #[test]
    fn first_window_whose_bound_exceeds_offset_wins() {
        let p = ScoringProfile::standard();
        let w = p.windows(WindowSet::Tap);
        assert_eq!(resolve(0.0, w).tier, AccuracyTier::PerfectPlus);
        assert_eq!(resolve(0.0249, w).tier, AccuracyTier::PerfectPlus);
        // Bounds are exclusive.
        assert_eq!(resolve(0.025, w).tier, AccuracyTier::Perfect);
        assert_eq!(resolve(0.09, w).tier, AccuracyTier::Good);
    }

    #[test]
    fn huge_or_nan_offsets_fall_into_catch_all() {
        let p = ScoringProfile::standard();
        let w = p.windows(WindowSet::Tap);
        let far = resolve(10.0, w);
        assert_eq!(far.tier, AccuracyTier::Okay);
        assert_eq!(far.primary_points, 8);
        assert_eq!(resolve(f32::NAN, w).tier, AccuracyTier::Okay);
    }

    #[test]
    fn empty_table_resolves_to_nothing() {
        let r = resolve(0.0, &[]);
        assert_eq!(r.primary_points, 0);
        assert_eq!(best_points(&[]), 0);
    }

    #[test]
    fn best_points_is_max_primary() {
        let p = ScoringProfile::standard();
        assert_eq!(best_points(p.windows(WindowSet::Liftoff)), 16);
    }

    #[test]
    fn tendency_tracks_early_late_and_mean() {
        let mut t = TimingTendency::default();
        t.record(-0.010);
        t.record(-0.020);
        t.record(0.030);
        t.record(0.0);
        t.record(f32::NAN);
        assert_eq!((t.early, t.late, t.count), (2, 1, 4));
        assert!(t.mean_offset_s().abs() < 1e-6, "mean should be ~0, got {}", t.mean_offset_s());
    }
}
