use crate::game::note::Note;
use crate::game::system::{NativeScore, NoteEvent, NoteEventSource};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayStep {
    pub event: NoteEvent,
    /// Host snapshot after the event. Omitted steps keep the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<NativeScore>,
}

/// A recorded play: the chart's notes plus the event stream the host emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub track_id: String,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub events: Vec<ReplayStep>,
}

impl Replay {
    pub fn from_json_str(json: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let replay: Self = serde_json::from_str(json)?;
        if replay.track_id.trim().is_empty() {
            return Err("replay has an empty track_id".into());
        }
        Ok(replay)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn source(&self) -> ReplaySource {
        ReplaySource {
            steps: self.events.iter().cloned().collect(),
            native: NativeScore::default(),
        }
    }
}

/// Plays a [`Replay`] back as an event source.
#[derive(Clone, Debug, Default)]
pub struct ReplaySource {
    steps: VecDeque<ReplayStep>,
    native: NativeScore,
}

impl NoteEventSource for ReplaySource {
    fn next_event(&mut self) -> Option<NoteEvent> {
        let step = self.steps.pop_front()?;
        if let Some(native) = step.native {
            self.native = native;
        }
        Some(step.event)
    }

    fn native_score(&self) -> NativeScore {
        self.native
    }
}
