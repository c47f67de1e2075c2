use scorecast::game::classification::FullComboState;
use scorecast::game::high_scores::HighScoreStore;
use scorecast::game::note::{Note, NoteType, WindowSet};
use scorecast::game::replay::Replay;
use scorecast::game::scoring_profile::{
    FailureKind, FlatHitKind, ScoringProfile, ScoringRules, SustainKind,
};
use scorecast::game::session::PlaySession;
use scorecast::game::system::{NativeScore, NoteEvent};
use std::sync::Arc;

fn chart() -> Vec<Note> {
    vec![
        Note::new(NoteType::Tap),
        Note::sustained(NoteType::HoldStart, 1.0).with_pair(2),
        Note::new(NoteType::Liftoff).judged_release(),
        Note::new(NoteType::Match),
        Note::sustained(NoteType::SpinStart, 0.5),
    ]
}

fn clean_play() -> Vec<NoteEvent> {
    let tap = |note_index, window_set| NoteEvent::TimedHit {
        note_index,
        offset_s: 0.0,
        window_set,
    };
    let tick = |note_index, held_s, sustain| NoteEvent::SustainTick {
        note_index,
        held_s,
        sustain,
    };
    vec![
        tap(0, WindowSet::Tap),
        tap(1, WindowSet::Tap),
        tick(1, 0.5, SustainKind::Hold),
        tick(1, 1.0, SustainKind::Hold),
        tap(2, WindowSet::Liftoff),
        NoteEvent::FlatHit {
            note_index: 3,
            kind: FlatHitKind::Match,
        },
        NoteEvent::FlatHit {
            note_index: 4,
            kind: FlatHitKind::SpinStart,
        },
        tick(4, 0.5, SustainKind::Spin),
        NoteEvent::Complete { note_index: 4 },
    ]
}

fn play(events: &[NoteEvent], store: &mut HighScoreStore) -> PlaySession {
    let profiles = vec![Arc::new(ScoringProfile::standard())];
    let mut session = PlaySession::new("demo", &chart(), &profiles, store, false);
    for event in events {
        session.dispatch(event, &NativeScore::default());
    }
    session.finish(store);
    session
}

#[test]
fn clean_play_reaches_the_ceiling() {
    let mut store = HighScoreStore::in_memory();
    let session = play(&clean_play(), &mut store);
    let engine = &session.engines()[0];
    // Tap 16, hold 16 + 20, liftoff 16, match 4, spin 16 + 10, all at x4.
    assert_eq!(engine.max_possible_score(), (16 + 16 + 20 + 16 + 4 + 16 + 10) * 4);
    assert_eq!(engine.score(), engine.max_possible_score());
    assert_eq!(engine.full_combo_state(), FullComboState::PerfectFullCombo);
    assert_eq!(engine.rank(), Some("S+"));
    assert_eq!(engine.max_streak(), 5);
}

#[test]
fn dropped_hold_loses_combo_and_pace() {
    let mut events = clean_play();
    events.truncate(3);
    events.push(NoteEvent::PairedMiss {
        start_index: 1,
        end_index: 2,
        failure: FailureKind::BrokenHold,
    });
    events.push(NoteEvent::FlatHit {
        note_index: 3,
        kind: FlatHitKind::Match,
    });

    let mut store = HighScoreStore::in_memory();
    let session = play(&events, &mut store);
    let engine = &session.engines()[0];
    assert_eq!(engine.multiplier(), 2);
    assert_eq!(engine.full_combo_state(), FullComboState::None);
    assert!(engine.score() < engine.max_possible_score());
    assert_eq!(engine.best_possible_final_score(), engine.score());
    assert_ne!(engine.rank(), Some("S+"));
}

#[test]
fn fan_out_order_does_not_matter() {
    let mut rules = ScoringRules::standard();
    rules.multiplier_deltas.missed_tap_or_hold = -3;
    rules.max_multiplier = 8;
    let profiles = vec![
        Arc::new(ScoringProfile::standard()),
        Arc::new(ScoringProfile::new("hard", rules).expect("valid")),
    ];
    let reversed: Vec<_> = profiles.iter().rev().cloned().collect();
    let store = HighScoreStore::in_memory();

    let mut events = clean_play();
    events.insert(1, NoteEvent::Overbeat);
    let mut a = PlaySession::new("demo", &chart(), &profiles, &store, false);
    let mut b = PlaySession::new("demo", &chart(), &reversed, &store, false);
    for event in &events {
        a.dispatch(event, &NativeScore::default());
        b.dispatch(event, &NativeScore::default());
    }
    let mut ra = a.reports();
    let mut rb = b.reports();
    ra.sort_by(|x, y| x.label.cmp(&y.label));
    rb.sort_by(|x, y| x.label.cmp(&y.label));
    assert_eq!(ra, rb);
}

#[test]
fn replay_file_drives_a_session() {
    let json = r#"{
        "track_id": "demo",
        "notes": [{"note_type": "Tap"}, {"note_type": "Tap"}],
        "events": [
            {"event": {
                "type": "timed_hit", "note_index": 0, "offset_s": 0.02, "window_set": "Tap"
            }},
            {"event": {"type": "miss", "note_index": 1, "failure": "MissedTapOrHold"}}
        ]
    }"#;
    let replay = Replay::from_json_str(json).expect("replay should parse");
    let store = HighScoreStore::in_memory();
    let profiles = vec![Arc::new(ScoringProfile::standard())];
    let mut session = PlaySession::new(&replay.track_id, &replay.notes, &profiles, &store, true);
    session.pump(&mut replay.source());
    assert_eq!(session.events_seen(), 2);
    let reports = session.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].score, 64);
    assert_eq!(reports[1].multiplier, 1);
}
