use serde::{Deserialize, Serialize};

/// Note archetypes emitted by the host chart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteType {
    Match,
    Tap,
    HoldStart,
    /// End of a hold. Judged only when `release` is `ReleaseKind::Judged`.
    Liftoff,
    /// Beat press. A non-zero duration makes it a beat-hold.
    Beat,
    /// End of a beat-hold. Judged only when `release` is `ReleaseKind::Judged`.
    BeatRelease,
    SpinStart,
    Scratch,
}

/// How the end of a hold is judged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseKind {
    /// Letting go anywhere near the end is fine; no judgment, no points.
    #[default]
    Passive,
    /// The release is timed against the liftoff/beat-release windows.
    Judged,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub note_type: NoteType,
    #[serde(default)]
    pub duration_s: f32,
    /// Index of the matching end note for hold/beat-hold starts.
    #[serde(default)]
    pub paired_end_index: Option<usize>,
    #[serde(default)]
    pub release: ReleaseKind,
}

impl Note {
    pub const fn new(note_type: NoteType) -> Self {
        Self {
            note_type,
            duration_s: 0.0,
            paired_end_index: None,
            release: ReleaseKind::Passive,
        }
    }

    pub const fn sustained(note_type: NoteType, duration_s: f32) -> Self {
        Self {
            note_type,
            duration_s,
            paired_end_index: None,
            release: ReleaseKind::Passive,
        }
    }

    pub fn with_pair(mut self, end_index: usize) -> Self {
        self.paired_end_index = Some(end_index);
        self
    }

    pub fn judged_release(mut self) -> Self {
        self.release = ReleaseKind::Judged;
        self
    }
}

/// Which of the profile's four timing window tables a timed judgment uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowSet {
    Tap,
    Beat,
    Liftoff,
    BeatRelease,
}

impl WindowSet {
    pub const ALL: [Self; 4] = [Self::Tap, Self::Beat, Self::Liftoff, Self::BeatRelease];
}
