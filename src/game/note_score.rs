use crate::game::note::{Note, NoteType, ReleaseKind, WindowSet};
use crate::game::scoring_profile::{AccuracyTier, ScoringProfile};
use crate::game::timing_windows;
use log::debug;

/// Per-note scoring ledger for one play.
///
/// The `available_*` fields are fixed at precompute time. The `remaining_*`
/// fields start at the available totals and drop to zero exactly once, either
/// when the note is scored or when it is given up on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteScoreState {
    pub available_base_points: u32,
    pub available_base_sustain_points: u32,
    pub available_total_points: u64,
    pub available_total_sustain_points: u64,
    pub available_streak: u32,

    pub gained_base_points: u32,
    pub gained_base_sustain_points: u32,
    pub gained_total_points: u64,
    pub gained_total_sustain_points: u64,
    pub remaining_total_points: u64,
    pub remaining_total_sustain_points: u64,
    pub remaining_streak: u32,
    pub lost_multiplier: bool,
    pub accuracy: Option<AccuracyTier>,
    pub(crate) judged: bool,
}

impl NoteScoreState {
    pub fn new(
        base_points: u32,
        base_sustain_points: u32,
        streak: u32,
        max_multiplier: u32,
    ) -> Self {
        let available_total_points = u64::from(base_points) * u64::from(max_multiplier);
        let available_total_sustain_points =
            u64::from(base_sustain_points) * u64::from(max_multiplier);
        Self {
            available_base_points: base_points,
            available_base_sustain_points: base_sustain_points,
            available_total_points,
            available_total_sustain_points,
            available_streak: streak,
            remaining_total_points: available_total_points,
            remaining_total_sustain_points: available_total_sustain_points,
            remaining_streak: streak,
            ..Self::default()
        }
    }

    /// Whether a hit or miss judgment has already been applied to this note.
    #[inline(always)]
    pub fn is_judged(&self) -> bool {
        self.judged
    }

    #[inline(always)]
    pub fn is_unresolved(&self) -> bool {
        self.remaining_total_points > 0
            || self.remaining_total_sustain_points > 0
            || self.remaining_streak > 0
    }

    #[inline(always)]
    pub(crate) fn take_points(&mut self) -> u64 {
        std::mem::take(&mut self.remaining_total_points)
    }

    #[inline(always)]
    pub(crate) fn take_sustain(&mut self) -> u64 {
        std::mem::take(&mut self.remaining_total_sustain_points)
    }

    /// Releases up to `amount` of the sustain ceiling, returning what was released.
    #[inline(always)]
    pub(crate) fn take_sustain_partial(&mut self, amount: u64) -> u64 {
        let taken = amount.min(self.remaining_total_sustain_points);
        self.remaining_total_sustain_points -= taken;
        taken
    }

    #[inline(always)]
    pub(crate) fn take_streak(&mut self) -> u32 {
        std::mem::take(&mut self.remaining_streak)
    }
}

/// Sustain value of a held note: `floor(rate * duration)`, at least 1 when the
/// note has any duration at all.
#[inline(always)]
pub fn sustain_points(tick_rate: f32, duration_s: f32) -> u32 {
    if duration_s.is_nan() || duration_s <= 0.0 {
        return 0;
    }
    // Float-to-int casts saturate, so negative or NaN products land on 0.
    ((tick_rate * duration_s).floor() as u32).max(1)
}

#[derive(Clone, Debug, Default)]
pub struct PrecomputedTrack {
    pub states: Vec<NoteScoreState>,
    pub max_possible_score: u64,
    pub max_possible_streak: u32,
}

fn release_points(note: &Note, profile: &ScoringProfile, set: WindowSet) -> (u32, u32) {
    match note.release {
        ReleaseKind::Judged => (timing_windows::best_points(profile.windows(set)), 1),
        ReleaseKind::Passive => (0, 0),
    }
}

/// (base points, base sustain points, streak) a note can contribute at best.
fn note_ceiling(note: &Note, profile: &ScoringProfile) -> (u32, u32, u32) {
    let rules = profile.rules();
    let rates = &rules.tick_rates;
    match note.note_type {
        NoteType::Match => (rules.match_point_value, 0, 1),
        NoteType::Tap => (timing_windows::best_points(profile.windows(WindowSet::Tap)), 0, 1),
        NoteType::HoldStart => (
            timing_windows::best_points(profile.windows(WindowSet::Tap)),
            sustain_points(rates.hold, note.duration_s),
            1,
        ),
        NoteType::Beat => (
            timing_windows::best_points(profile.windows(WindowSet::Beat)),
            sustain_points(rates.beat_hold, note.duration_s),
            1,
        ),
        NoteType::Liftoff => {
            let (points, streak) = release_points(note, profile, WindowSet::Liftoff);
            (points, 0, streak)
        }
        NoteType::BeatRelease => {
            let (points, streak) = release_points(note, profile, WindowSet::BeatRelease);
            (points, 0, streak)
        }
        NoteType::SpinStart => (
            rules.spin_start_point_value,
            sustain_points(rates.spin, note.duration_s),
            1,
        ),
        NoteType::Scratch => (0, sustain_points(rates.scratch, note.duration_s), 1),
    }
}

/// Builds one ledger entry per note, in note order, plus the track-wide
/// ceilings. The ceiling assumes the maximum multiplier throughout, so it is an
/// upper bound rather than something reachable from the first note.
pub fn precompute(notes: &[Note], profile: &ScoringProfile) -> PrecomputedTrack {
    let mut track = PrecomputedTrack {
        states: Vec::with_capacity(notes.len()),
        ..PrecomputedTrack::default()
    };
    for note in notes {
        let (base, sustain, streak) = note_ceiling(note, profile);
        let state = NoteScoreState::new(base, sustain, streak, profile.max_multiplier());
        track.max_possible_score +=
            state.available_total_points + state.available_total_sustain_points;
        track.max_possible_streak += state.available_streak;
        track.states.push(state);
    }
    debug!(
        "Precomputed {} notes for profile '{}': max score {}, max streak {}",
        notes.len(),
        profile.name(),
        track.max_possible_score,
        track.max_possible_streak
    );
    track
}
