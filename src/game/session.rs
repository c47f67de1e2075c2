use crate::game::engine::ScoreEngine;
use crate::game::high_scores::{HighScoreRecord, HighScoreStore};
use crate::game::note::Note;
use crate::game::scoring_profile::ScoringProfile;
use crate::game::system::{
    NativeScore, NativeScoreMirror, NoteEvent, NoteEventSource, ScoreReport, ScoreSystem,
};
use log::{info, warn};
use std::sync::Arc;

/// One play of one track, scored by every active profile side by side.
///
/// Engines never read each other's state, so dispatch order across them does
/// not matter. The native mirror, when present, always comes first.
pub struct PlaySession {
    track_id: String,
    engines: Vec<ScoreEngine>,
    mirror: Option<NativeScoreMirror>,
    events_seen: usize,
    finished: bool,
}

impl PlaySession {
    pub fn new(
        track_id: &str,
        notes: &[Note],
        profiles: &[Arc<ScoringProfile>],
        store: &HighScoreStore,
        mirror_native: bool,
    ) -> Self {
        let engines = profiles
            .iter()
            .map(|profile| {
                let mut engine = ScoreEngine::init(Arc::clone(profile), notes);
                engine.set_high_score(store.get(track_id, profile.id()).score);
                engine
            })
            .collect::<Vec<_>>();
        info!(
            "Starting play of '{}' ({} notes) under {} profile(s)",
            track_id,
            notes.len(),
            engines.len()
        );
        Self {
            track_id: track_id.to_string(),
            engines,
            mirror: mirror_native.then(NativeScoreMirror::new),
            events_seen: 0,
            finished: false,
        }
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn engines(&self) -> &[ScoreEngine] {
        &self.engines
    }

    pub const fn events_seen(&self) -> usize {
        self.events_seen
    }

    /// Fans one event out to every system. Events after `finish` are dropped.
    pub fn dispatch(&mut self, event: &NoteEvent, native: &NativeScore) {
        if self.finished {
            warn!("Ignoring {:?} after the play finished", event);
            return;
        }
        self.events_seen += 1;
        for system in self.systems_mut() {
            system.on_event(event, native);
        }
    }

    /// Drains `source` into the session.
    pub fn pump<S: NoteEventSource>(&mut self, source: &mut S) {
        while let Some(event) = source.next_event() {
            let native = source.native_score();
            self.dispatch(&event, &native);
        }
    }

    /// Ends the play, records any new bests in `store` and writes it out if
    /// something changed. Returns whether any record was replaced.
    pub fn finish(&mut self, store: &mut HighScoreStore) -> bool {
        if self.finished {
            return false;
        }
        for system in self.systems_mut() {
            system.finish();
        }
        self.finished = true;

        let mut changed = false;
        for engine in &self.engines {
            let candidate = HighScoreRecord {
                score: engine.score(),
                rank: engine.rank().map(str::to_string),
                streak: engine.max_streak(),
                max_score: engine.max_possible_score(),
                secondary_score: engine.secondary_score(),
                full_combo: engine.full_combo_state(),
            };
            if store.set_if_higher(&self.track_id, engine.profile().id(), candidate) {
                info!(
                    "New high score for '{}' under '{}': {}",
                    self.track_id,
                    engine.profile().name(),
                    engine.score()
                );
                changed = true;
            }
        }
        if changed && let Err(e) = store.save_all() {
            warn!("Failed to save high scores: {}", e);
        }
        changed
    }

    pub fn reports(&self) -> Vec<ScoreReport> {
        let mirror = self.mirror.iter().map(ScoreSystem::report);
        mirror.chain(self.engines.iter().map(ScoreSystem::report)).collect()
    }

    fn systems_mut(&mut self) -> impl Iterator<Item = &mut dyn ScoreSystem> {
        let mirror = self.mirror.iter_mut().map(|m| m as &mut dyn ScoreSystem);
        mirror.chain(self.engines.iter_mut().map(|e| e as &mut dyn ScoreSystem))
    }
}

#[cfg(test)]
mod tests {
    use super::PlaySession;
    use crate::game::high_scores::HighScoreStore;
    use crate::game::note::{Note, NoteType, WindowSet};
    use crate::game::scoring_profile::{FailureKind, ScoringProfile, ScoringRules};
    use crate::game::system::{NativeScore, NoteEvent};
    use std::sync::Arc;

    fn two_profiles() -> Vec<Arc<ScoringProfile>> {
        let mut rules = ScoringRules::standard();
        rules.max_multiplier = 1;
        vec![
            Arc::new(ScoringProfile::standard()),
            Arc::new(ScoringProfile::new("flat", rules).expect("valid")),
        ]
    }

    fn hit(note_index: usize) -> NoteEvent {
        NoteEvent::TimedHit {
            note_index,
            offset_s: 0.0,
            window_set: WindowSet::Tap,
        }
    }

    #[test]
    fn each_profile_scores_independently() {
        let notes = vec![Note::new(NoteType::Tap); 2];
        let store = HighScoreStore::in_memory();
        let mut session = PlaySession::new("t", &notes, &two_profiles(), &store, true);
        let native = NativeScore::default();
        session.dispatch(&hit(0), &native);
        session.dispatch(&hit(1), &native);
        let reports = session.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].label, "native");
        assert_eq!(reports[1].score, 2 * 16 * 4);
        assert_eq!(reports[2].score, 2 * 16);
        assert_eq!(session.events_seen(), 2);
    }

    #[test]
    fn finish_records_new_bests_once() {
        let notes = vec![Note::new(NoteType::Tap)];
        let profiles = two_profiles();
        let mut store = HighScoreStore::in_memory();
        let mut session = PlaySession::new("t", &notes, &profiles, &store, false);
        session.dispatch(&hit(0), &NativeScore::default());
        assert!(session.finish(&mut store));
        assert!(!session.finish(&mut store));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("t", profiles[0].id()).score, 64);
        assert_eq!(store.get("t", profiles[0].id()).rank.as_deref(), Some("S+"));

        session.dispatch(&hit(0), &NativeScore::default());
        assert_eq!(session.events_seen(), 1, "events after finish are dropped");

        let mut replay = PlaySession::new("t", &notes, &profiles, &store, false);
        assert_eq!(replay.engines()[0].high_score(), 64);
        replay.dispatch(&hit(0), &NativeScore::default());
        assert!(!replay.finish(&mut store), "a tie is not a new best");
    }

    #[test]
    fn record_keeps_the_best_streak_not_the_final_one() {
        let notes = vec![Note::new(NoteType::Tap); 3];
        let profiles = vec![Arc::new(ScoringProfile::standard())];
        let mut store = HighScoreStore::in_memory();
        let mut session = PlaySession::new("t", &notes, &profiles, &store, false);
        let native = NativeScore::default();
        session.dispatch(&hit(0), &native);
        session.dispatch(&hit(1), &native);
        session.dispatch(
            &NoteEvent::Miss {
                note_index: 2,
                failure: FailureKind::MissedTapOrHold,
            },
            &native,
        );
        assert_eq!(session.engines()[0].streak(), 0);
        assert!(session.finish(&mut store));
        assert_eq!(store.get("t", profiles[0].id()).streak, 2);
    }
}
