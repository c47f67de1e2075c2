use crate::game::classification::{FullComboState, StarColor};
use crate::game::engine::ScoreEngine;
use crate::game::note::WindowSet;
use crate::game::scoring_profile::{FailureKind, FlatHitKind, SustainKind};
use serde::{Deserialize, Serialize};

/// A gameplay event as the host reports it, free of any profile's numbers.
/// Each engine resolves point values and penalties against its own profile.
///
/// In JSON the variant is named by a `type` field, e.g.
/// `{"type": "flat_hit", "note_index": 3, "kind": "Match"}`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoteEvent {
    TimedHit {
        note_index: usize,
        offset_s: f32,
        window_set: WindowSet,
    },
    FlatHit {
        note_index: usize,
        kind: FlatHitKind,
    },
    SustainTick {
        note_index: usize,
        held_s: f32,
        sustain: SustainKind,
    },
    Miss {
        note_index: usize,
        failure: FailureKind,
    },
    PairedMiss {
        start_index: usize,
        end_index: usize,
        failure: FailureKind,
    },
    Overbeat,
    Complete {
        note_index: usize,
    },
}

/// The host game's own view of the play, as it would show it without any
/// alternate scoring.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeScore {
    pub score: u64,
    pub multiplier: u32,
    pub streak: u32,
    pub max_streak: u32,
    #[serde(default)]
    pub full_combo: FullComboState,
}

/// Feed of events for one play.
pub trait NoteEventSource {
    fn next_event(&mut self) -> Option<NoteEvent>;

    /// Native snapshot after the most recent event.
    fn native_score(&self) -> NativeScore;
}

/// Everything a HUD or results screen reads from a scoring system.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreReport {
    pub label: String,
    pub score: u64,
    pub secondary_score: u64,
    pub multiplier: u32,
    pub streak: u32,
    pub max_streak: u32,
    pub full_combo: FullComboState,
    pub star: FullComboState,
    pub star_color: Option<StarColor>,
    pub max_possible_score: u64,
    pub max_possible_score_so_far: u64,
    pub best_possible_final_score: u64,
    pub high_score: u64,
    pub pace_delta: i64,
    pub accuracy: f64,
    pub rank: Option<String>,
    pub is_high_score: bool,
}

/// One scoring system running alongside a play. Implemented by the profile
/// driven engine and by a mirror of the host's native score.
pub trait ScoreSystem {
    fn label(&self) -> &str;

    /// Content id of the backing profile. `None` means nothing is persisted.
    fn profile_id(&self) -> Option<&str>;

    fn on_event(&mut self, event: &NoteEvent, native: &NativeScore);

    fn set_high_score(&mut self, high_score: u64);

    fn finish(&mut self);

    fn report(&self) -> ScoreReport;
}

impl ScoreSystem for ScoreEngine {
    fn label(&self) -> &str {
        self.profile().name()
    }

    fn profile_id(&self) -> Option<&str> {
        Some(self.profile().id())
    }

    fn on_event(&mut self, event: &NoteEvent, _native: &NativeScore) {
        self.apply(event);
    }

    fn set_high_score(&mut self, high_score: u64) {
        ScoreEngine::set_high_score(self, high_score);
    }

    fn finish(&mut self) {
        ScoreEngine::finish(self);
    }

    fn report(&self) -> ScoreReport {
        ScoreReport {
            label: self.profile().name().to_string(),
            score: self.score(),
            secondary_score: self.secondary_score(),
            multiplier: self.multiplier(),
            streak: self.streak(),
            max_streak: self.max_streak(),
            full_combo: self.full_combo_state(),
            star: self.star_state(),
            star_color: self.star_color(),
            max_possible_score: self.max_possible_score(),
            max_possible_score_so_far: self.max_possible_score_so_far(),
            best_possible_final_score: self.best_possible_final_score(),
            high_score: self.high_score(),
            pace_delta: self.pace_delta(),
            accuracy: self.accuracy(),
            rank: self.rank().map(str::to_string),
            is_high_score: self.is_high_score(),
        }
    }
}

pub const NATIVE_LABEL: &str = "native";

/// Reports whatever the host computed. Never ranked, never persisted.
#[derive(Clone, Debug, Default)]
pub struct NativeScoreMirror {
    last: NativeScore,
    high_score: u64,
    finished: bool,
}

impl NativeScoreMirror {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreSystem for NativeScoreMirror {
    fn label(&self) -> &str {
        NATIVE_LABEL
    }

    fn profile_id(&self) -> Option<&str> {
        None
    }

    fn on_event(&mut self, _event: &NoteEvent, native: &NativeScore) {
        self.last = *native;
    }

    fn set_high_score(&mut self, high_score: u64) {
        self.high_score = high_score;
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    fn report(&self) -> ScoreReport {
        ScoreReport {
            label: NATIVE_LABEL.to_string(),
            score: self.last.score,
            multiplier: self.last.multiplier,
            streak: self.last.streak,
            max_streak: self.last.max_streak,
            full_combo: self.last.full_combo,
            star: self.last.full_combo,
            best_possible_final_score: self.last.score,
            high_score: self.high_score,
            pace_delta: self.last.score as i64 - self.high_score as i64,
            accuracy: 1.0,
            is_high_score: self.finished && self.last.score > self.high_score,
            ..ScoreReport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NativeScore, NativeScoreMirror, NoteEvent, ScoreSystem};
    use crate::game::classification::FullComboState;
    use crate::game::engine::ScoreEngine;
    use crate::game::note::{Note, NoteType, WindowSet};
    use crate::game::scoring_profile::{
        FailureKind, FlatHitKind, ScoringProfile, ScoringRules, SustainKind,
    };
    use std::sync::Arc;

    #[test]
    fn every_event_kind_parses_from_tagged_json() {
        let json = r#"[
            {"type": "timed_hit", "note_index": 0, "offset_s": -0.5, "window_set": "Tap"},
            {"type": "flat_hit", "note_index": 1, "kind": "Match"},
            {"type": "sustain_tick", "note_index": 2, "held_s": 0.25, "sustain": "BeatHold"},
            {"type": "miss", "note_index": 3, "failure": "MissedTapOrHold"},
            {"type": "paired_miss", "start_index": 2, "end_index": 4, "failure": "BrokenBeatHold"},
            {"type": "overbeat"},
            {"type": "complete", "note_index": 2}
        ]"#;
        let events: Vec<NoteEvent> = serde_json::from_str(json).expect("events should parse");
        assert_eq!(
            events,
            vec![
                NoteEvent::TimedHit {
                    note_index: 0,
                    offset_s: -0.5,
                    window_set: WindowSet::Tap,
                },
                NoteEvent::FlatHit {
                    note_index: 1,
                    kind: FlatHitKind::Match,
                },
                NoteEvent::SustainTick {
                    note_index: 2,
                    held_s: 0.25,
                    sustain: SustainKind::BeatHold,
                },
                NoteEvent::Miss {
                    note_index: 3,
                    failure: FailureKind::MissedTapOrHold,
                },
                NoteEvent::PairedMiss {
                    start_index: 2,
                    end_index: 4,
                    failure: FailureKind::BrokenBeatHold,
                },
                NoteEvent::Overbeat,
                NoteEvent::Complete { note_index: 2 },
            ]
        );
    }

    #[test]
    fn events_write_the_same_tag_they_read() {
        let event = NoteEvent::FlatHit {
            note_index: 7,
            kind: FlatHitKind::SpinStart,
        };
        let json = serde_json::to_string(&event).expect("event should serialize");
        assert!(json.contains(r#""type":"flat_hit""#), "got {json}");
        assert!(json.contains(r#""kind":"SpinStart""#), "got {json}");
        let back: NoteEvent = serde_json::from_str(&json).expect("event should parse back");
        assert_eq!(back, event);
    }

    #[test]
    fn engine_draws_penalty_from_its_profile() {
        let mut rules = ScoringRules::standard();
        rules.multiplier_deltas.missed_tap_or_hold = -1;
        let gentle = Arc::new(ScoringProfile::new("gentle", rules).expect("valid"));
        let notes = vec![Note::new(NoteType::Tap); 2];

        let mut standard = ScoreEngine::init(Arc::new(ScoringProfile::standard()), &notes);
        let mut soft = ScoreEngine::init(gentle, &notes);
        let miss = NoteEvent::Miss {
            note_index: 0,
            failure: FailureKind::MissedTapOrHold,
        };
        let native = NativeScore::default();
        standard.on_event(&miss, &native);
        soft.on_event(&miss, &native);
        assert_eq!(standard.report().multiplier, 1);
        assert_eq!(soft.report().multiplier, 3);
        assert_eq!(soft.label(), "gentle");
    }

    #[test]
    fn mirror_copies_the_native_snapshot() {
        let mut mirror = NativeScoreMirror::new();
        mirror.set_high_score(500);
        let hit = NoteEvent::TimedHit {
            note_index: 0,
            offset_s: 0.0,
            window_set: WindowSet::Tap,
        };
        let native = NativeScore {
            score: 700,
            multiplier: 2,
            streak: 3,
            max_streak: 3,
            full_combo: FullComboState::FullCombo,
        };
        mirror.on_event(&hit, &native);
        let report = mirror.report();
        assert_eq!((report.score, report.multiplier, report.streak), (700, 2, 3));
        assert_eq!(report.pace_delta, 200);
        assert!(!report.is_high_score);
        mirror.finish();
        assert!(mirror.report().is_high_score);
        assert_eq!(mirror.profile_id(), None);
        assert_eq!(mirror.report().rank, None);
    }
}
