use crate::game::classification::{
    self, Classification, ClassifyInput, FullComboState, StarColor,
};
use crate::game::note::{Note, WindowSet};
use crate::game::note_score::{self, NoteScoreState};
use crate::game::scoring_profile::{AccuracyTier, ScoringProfile};
use crate::game::system::NoteEvent;
use crate::game::timing_windows::{self, TimingTendency};
use log::{debug, warn};
use std::sync::Arc;

pub const S_PLUS_RANK: &str = "S+";

/// Live scoring state for one play under one profile.
///
/// Every mutating call keeps two ledgers in step: the awarded `score`, and
/// `max_possible_score_so_far`, the part of the track ceiling that has already
/// been decided (scored or forfeited). The gap between `max_possible_score`
/// and the latter is what is still up for grabs.
#[derive(Clone, Debug)]
pub struct ScoreEngine {
    profile: Arc<ScoringProfile>,
    notes: Vec<NoteScoreState>,

    score: u64,
    secondary_score: u64,
    multiplier: u32,
    points_to_next_multiplier: u64,
    streak: u32,
    max_streak: u32,

    max_possible_score: u64,
    max_possible_score_so_far: u64,
    max_possible_streak: u32,
    max_possible_streak_so_far: u32,

    classification: Classification,
    rank: Option<String>,
    high_score: u64,
    completed: bool,

    tier_counts: [u32; AccuracyTier::ALL.len()],
    misses: u32,
    tendency: TimingTendency,
}

impl ScoreEngine {
    /// Starts a play. The multiplier begins at the profile maximum.
    pub fn init(profile: Arc<ScoringProfile>, notes: &[Note]) -> Self {
        let track = note_score::precompute(notes, &profile);
        let multiplier = profile.max_multiplier();
        let points_to_next_multiplier = profile.points_for_level(multiplier);
        Self {
            notes: track.states,
            score: 0,
            secondary_score: 0,
            multiplier,
            points_to_next_multiplier,
            streak: 0,
            max_streak: 0,
            max_possible_score: track.max_possible_score,
            max_possible_score_so_far: 0,
            max_possible_streak: track.max_possible_streak,
            max_possible_streak_so_far: 0,
            classification: Classification::default(),
            rank: None,
            high_score: 0,
            completed: false,
            tier_counts: [0; AccuracyTier::ALL.len()],
            misses: 0,
            tendency: TimingTendency::default(),
            profile,
        }
    }

    // --- Event operations ---

    /// A judged press or release. `offset_s` is signed; only its magnitude
    /// picks the window, the sign feeds the early/late tendency.
    pub fn timed_hit(&mut self, note_index: usize, offset_s: f32, window_set: WindowSet) {
        if !self.begin_judgment(note_index) {
            return;
        }
        let resolution = timing_windows::resolve(offset_s.abs(), self.profile.windows(window_set));
        self.tendency.record(offset_s);
        self.tier_counts[resolution.tier.index()] += 1;
        self.secondary_score += u64::from(resolution.secondary_points);
        self.award_hit(note_index, resolution.primary_points, Some(resolution.tier));
    }

    /// An untimed hit worth a fixed amount (match notes, spin starts).
    pub fn flat_hit(&mut self, note_index: usize, fixed_points: u32) {
        if !self.begin_judgment(note_index) {
            return;
        }
        self.award_hit(note_index, fixed_points, None);
    }

    /// Progress on a sustained note. Repeated calls only ever move forward:
    /// a `held_s` that jitters backwards awards nothing.
    pub fn sustain_tick(&mut self, note_index: usize, held_s: f32, tick_rate: f32) {
        if !self.check_index(note_index) {
            return;
        }
        let max_multiplier = u64::from(self.profile.max_multiplier());
        let state = &self.notes[note_index];
        if state.remaining_total_sustain_points == 0 || state.available_base_sustain_points == 0 {
            return;
        }
        let raw = (tick_rate * held_s).floor() as u32;
        let target = raw.clamp(1, state.available_base_sustain_points);
        let delta = target.saturating_sub(state.gained_base_sustain_points);
        if delta == 0 {
            return;
        }

        let awarded = self.add_points(u64::from(delta));
        let state = &mut self.notes[note_index];
        state.gained_base_sustain_points += delta;
        state.gained_total_sustain_points += awarded;
        let revealed = state.take_sustain_partial(u64::from(delta) * max_multiplier);
        self.max_possible_score_so_far += revealed;
        self.refresh_classification();
    }

    /// Gives up whatever the note still had to offer and applies the penalty.
    /// A note with nothing left unresolved is left alone, penalty included.
    pub fn miss(&mut self, note_index: usize, multiplier_delta: i32) {
        if !self.check_index(note_index) {
            return;
        }
        self.notes[note_index].judged = true;
        if !self.notes[note_index].is_unresolved() {
            debug!("Ignoring repeated miss on note {note_index}");
            return;
        }
        self.forfeit(note_index);
        self.change_multiplier(multiplier_delta, &[note_index]);
        self.misses += 1;
        self.refresh_classification();
    }

    /// Miss for a start/end pair. Both ledgers are resolved, and the penalty
    /// lands once if either note still had anything unresolved.
    pub fn miss_paired(&mut self, start_index: usize, end_index: usize, multiplier_delta: i32) {
        let start_ok = self.check_index(start_index);
        let end_ok = self.check_index(end_index);
        let pair: Vec<usize> = [(start_index, start_ok), (end_index, end_ok)]
            .into_iter()
            .filter_map(|(ix, ok)| ok.then_some(ix))
            .collect();
        if pair.is_empty() {
            return;
        }

        let mut any_unresolved = false;
        for &ix in &pair {
            self.notes[ix].judged = true;
            if self.notes[ix].is_unresolved() {
                any_unresolved = true;
                self.forfeit(ix);
            }
        }
        if !any_unresolved {
            debug!("Ignoring repeated paired miss on notes {start_index}/{end_index}");
            return;
        }
        self.change_multiplier(multiplier_delta, &pair);
        self.misses += 1;
        self.refresh_classification();
    }

    /// Input error that belongs to no note.
    pub fn overbeat(&mut self, multiplier_delta: i32) {
        self.change_multiplier(multiplier_delta, &[]);
        self.refresh_classification();
    }

    /// End of a note's lifecycle. Anything still unresolved is folded into the
    /// decided ledgers without a penalty.
    pub fn complete_note(&mut self, note_index: usize) {
        if !self.check_index(note_index) {
            return;
        }
        self.notes[note_index].judged = true;
        if self.notes[note_index].is_unresolved() {
            self.forfeit(note_index);
            self.refresh_classification();
        }
    }

    /// Ends the play: settles every outstanding note and computes the rank.
    /// Calling it again is a no-op.
    pub fn finish(&mut self) -> Option<&str> {
        if !self.completed {
            let mut settled = 0usize;
            for ix in 0..self.notes.len() {
                self.notes[ix].judged = true;
                if self.notes[ix].is_unresolved() {
                    self.forfeit(ix);
                    settled += 1;
                }
            }
            if settled > 0 {
                debug!("Settled {settled} unresolved notes at end of play");
            }
            self.refresh_classification();
            self.rank = rank_for(self.score, self.max_possible_score, &self.profile);
            self.completed = true;
        }
        self.rank.as_deref()
    }

    /// Routes a profile-agnostic host event to the matching operation, filling
    /// in point values, tick rates and penalties from this engine's profile.
    pub fn apply(&mut self, event: &NoteEvent) {
        match *event {
            NoteEvent::TimedHit {
                note_index,
                offset_s,
                window_set,
            } => self.timed_hit(note_index, offset_s, window_set),
            NoteEvent::FlatHit { note_index, kind } => {
                let points = self.profile.flat_points(kind);
                self.flat_hit(note_index, points);
            }
            NoteEvent::SustainTick {
                note_index,
                held_s,
                sustain,
            } => {
                let rate = self.profile.rules().tick_rates.for_sustain(sustain);
                self.sustain_tick(note_index, held_s, rate);
            }
            NoteEvent::Miss { note_index, failure } => {
                let delta = self.profile.rules().multiplier_deltas.for_failure(failure);
                self.miss(note_index, delta);
            }
            NoteEvent::PairedMiss {
                start_index,
                end_index,
                failure,
            } => {
                let delta = self.profile.rules().multiplier_deltas.for_failure(failure);
                self.miss_paired(start_index, end_index, delta);
            }
            NoteEvent::Overbeat => {
                let delta = self.profile.rules().multiplier_deltas.overbeat;
                self.overbeat(delta);
            }
            NoteEvent::Complete { note_index } => self.complete_note(note_index),
        }
    }

    pub fn set_high_score(&mut self, high_score: u64) {
        self.high_score = high_score;
    }

    // --- Read-only view ---

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    pub fn note_states(&self) -> &[NoteScoreState] {
        &self.notes
    }

    pub const fn score(&self) -> u64 {
        self.score
    }

    pub const fn secondary_score(&self) -> u64 {
        self.secondary_score
    }

    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub const fn points_to_next_multiplier(&self) -> u64 {
        self.points_to_next_multiplier
    }

    pub const fn streak(&self) -> u32 {
        self.streak
    }

    pub const fn max_streak(&self) -> u32 {
        self.max_streak
    }

    pub const fn max_possible_score(&self) -> u64 {
        self.max_possible_score
    }

    pub const fn max_possible_score_so_far(&self) -> u64 {
        self.max_possible_score_so_far
    }

    pub const fn max_possible_streak(&self) -> u32 {
        self.max_possible_streak
    }

    pub const fn max_possible_streak_so_far(&self) -> u32 {
        self.max_possible_streak_so_far
    }

    pub const fn full_combo_state(&self) -> FullComboState {
        self.classification.full_combo
    }

    pub const fn star_state(&self) -> FullComboState {
        self.classification.star
    }

    pub const fn star_color(&self) -> Option<StarColor> {
        self.classification.star_color
    }

    pub const fn high_score(&self) -> u64 {
        self.high_score
    }

    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Only meaningful once the play is finished.
    pub fn rank(&self) -> Option<&str> {
        self.rank.as_deref()
    }

    pub const fn is_high_score(&self) -> bool {
        self.completed && self.score > self.high_score
    }

    pub fn tier_count(&self, tier: AccuracyTier) -> u32 {
        self.tier_counts[tier.index()]
    }

    pub const fn misses(&self) -> u32 {
        self.misses
    }

    pub const fn timing_tendency(&self) -> &TimingTendency {
        &self.tendency
    }

    /// Highest final score still reachable from here.
    pub const fn best_possible_final_score(&self) -> u64 {
        self.score + self.max_possible_score.saturating_sub(self.max_possible_score_so_far)
    }

    /// Best reachable final score relative to the personal best.
    pub const fn pace_delta(&self) -> i64 {
        self.best_possible_final_score() as i64 - self.high_score as i64
    }

    /// Score over the decided part of the ceiling; 1.0 before anything is decided.
    pub fn accuracy(&self) -> f64 {
        if self.max_possible_score_so_far == 0 {
            return 1.0;
        }
        self.score as f64 / self.max_possible_score_so_far as f64
    }

    // --- Internals ---

    fn check_index(&self, note_index: usize) -> bool {
        debug_assert!(
            note_index < self.notes.len(),
            "note index {note_index} out of range for {} notes",
            self.notes.len()
        );
        if note_index >= self.notes.len() {
            warn!(
                "Ignoring event for note {note_index}; track has {} notes",
                self.notes.len()
            );
            return false;
        }
        true
    }

    /// Claims the note for a hit. False when the index is bad or the note has
    /// already been judged, completed or missed.
    fn begin_judgment(&mut self, note_index: usize) -> bool {
        if !self.check_index(note_index) {
            return false;
        }
        let state = &mut self.notes[note_index];
        if state.is_judged() {
            debug!("Ignoring hit on already judged note {note_index}");
            return false;
        }
        state.judged = true;
        true
    }

    fn award_hit(&mut self, note_index: usize, base_points: u32, tier: Option<AccuracyTier>) {
        let awarded = self.add_points(u64::from(base_points));
        self.streak += 1;
        self.max_streak = self.max_streak.max(self.streak);

        let state = &mut self.notes[note_index];
        state.gained_base_points = base_points;
        state.gained_total_points = awarded;
        state.accuracy = tier;
        let points = state.take_points();
        let streak = state.take_streak();
        self.max_possible_score_so_far += points;
        self.max_possible_streak_so_far += streak;
        self.refresh_classification();
    }

    /// Banks `raw` points at the current multiplier, climbing levels as the
    /// running counter is filled. One large award can cross several levels.
    /// Returns the multiplied amount added to the score.
    fn add_points(&mut self, raw: u64) -> u64 {
        let max_multiplier = self.profile.max_multiplier();
        let mut remaining = raw;
        let mut awarded = 0u64;
        while self.multiplier < max_multiplier && remaining >= self.points_to_next_multiplier {
            awarded += u64::from(self.multiplier) * self.points_to_next_multiplier;
            remaining -= self.points_to_next_multiplier;
            self.multiplier += 1;
            self.points_to_next_multiplier = self.profile.points_for_level(self.multiplier);
        }
        if self.multiplier < max_multiplier {
            self.points_to_next_multiplier -= remaining;
        }
        awarded += u64::from(self.multiplier) * remaining;
        self.score += awarded;
        awarded
    }

    /// Applies a penalty: clamps the multiplier into 1..=max, restarts the
    /// level counter if the level moved, breaks the streak and flags the notes.
    fn change_multiplier(&mut self, delta: i32, notes: &[usize]) {
        let max_multiplier = i64::from(self.profile.max_multiplier());
        let previous = self.multiplier;
        let next = (i64::from(previous) + i64::from(delta)).clamp(1, max_multiplier) as u32;
        self.multiplier = next;
        if next != previous {
            self.points_to_next_multiplier = self.profile.points_for_level(next);
        }
        self.streak = 0;
        for &ix in notes {
            self.notes[ix].lost_multiplier = true;
        }
    }

    fn forfeit(&mut self, note_index: usize) {
        let state = &mut self.notes[note_index];
        let points = state.take_points() + state.take_sustain();
        let streak = state.take_streak();
        self.max_possible_score_so_far += points;
        self.max_possible_streak_so_far += streak;
    }

    fn refresh_classification(&mut self) {
        self.classification = classification::classify(&ClassifyInput {
            score: self.score,
            streak: self.streak,
            max_streak: self.max_streak,
            max_possible_score_so_far: self.max_possible_score_so_far,
            max_possible_streak_so_far: self.max_possible_streak_so_far,
            max_possible_streak: self.max_possible_streak,
            s_plus_threshold: self.profile.rules().s_plus_threshold,
        });
    }
}

/// Rank label for a finished play. `None` for a track with nothing to score.
pub fn rank_for(score: u64, max_possible_score: u64, profile: &ScoringProfile) -> Option<String> {
    if max_possible_score == 0 {
        return None;
    }
    let rules = profile.rules();
    if i128::from(score) > i128::from(max_possible_score) - i128::from(rules.s_plus_threshold) {
        return Some(S_PLUS_RANK.to_string());
    }
    let ratio = score as f64 / max_possible_score as f64;
    rules
        .rank_thresholds
        .iter()
        .find(|r| ratio >= r.min_ratio)
        .or_else(|| rules.rank_thresholds.last())
        .map(|r| r.label.clone())
}
