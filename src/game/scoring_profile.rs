use crate::game::note::WindowSet;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::hash::Hasher;
use std::path::Path;
use std::str::FromStr;
use twox_hash::XxHash64;

pub const STANDARD_PROFILE_NAME: &str = "standard";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccuracyTier {
    PerfectPlus,
    Perfect,
    Great,
    Good,
    Okay,
}

impl AccuracyTier {
    pub const ALL: [Self; 5] = [
        Self::PerfectPlus,
        Self::Perfect,
        Self::Great,
        Self::Good,
        Self::Okay,
    ];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerfectPlus => "PerfectPlus",
            Self::Perfect => "Perfect",
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Okay => "Okay",
        }
    }
}

impl FromStr for AccuracyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut key = String::with_capacity(s.len());
        for ch in s.trim().chars() {
            if ch.is_ascii_alphanumeric() || ch == '+' {
                key.push(ch.to_ascii_lowercase());
            }
        }
        match key.as_str() {
            "perfectplus" | "perfect+" => Ok(Self::PerfectPlus),
            "perfect" => Ok(Self::Perfect),
            "great" => Ok(Self::Great),
            "good" => Ok(Self::Good),
            "okay" | "ok" => Ok(Self::Okay),
            other => Err(format!("'{other}' is not a valid accuracy tier")),
        }
    }
}

impl core::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn unbounded() -> f32 {
    f32::INFINITY
}

fn is_unbounded(bound: &f32) -> bool {
    bound.is_infinite()
}

/// One accuracy bucket. `upper_bound_s` is exclusive and measured against the
/// absolute timing offset.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingWindow {
    pub tier: AccuracyTier,
    pub primary_points: u32,
    #[serde(default)]
    pub secondary_points: u32,
    /// Omitted in JSON for the catch-all window.
    #[serde(default = "unbounded", skip_serializing_if = "is_unbounded")]
    pub upper_bound_s: f32,
}

impl TimingWindow {
    pub const fn new(
        tier: AccuracyTier,
        primary_points: u32,
        secondary_points: u32,
        upper_bound_s: f32,
    ) -> Self {
        Self {
            tier,
            primary_points,
            secondary_points,
            upper_bound_s,
        }
    }
}

/// Points per second awarded while a sustained note is held.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickRates {
    pub hold: f32,
    pub beat_hold: f32,
    pub spin: f32,
    pub scratch: f32,
}

/// Multiplier changes applied on failures. Expected to be zero or negative.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplierDeltas {
    pub overbeat: i32,
    pub missed_match: i32,
    pub missed_tap_or_hold: i32,
    pub missed_beat: i32,
    pub missed_liftoff: i32,
    pub missed_beat_release: i32,
    pub missed_spin: i32,
    pub broken_hold: i32,
    pub broken_beat_hold: i32,
    pub broken_spin: i32,
    pub broken_scratch: i32,
}

impl MultiplierDeltas {
    fn fields(&self) -> [i32; 11] {
        [
            self.overbeat,
            self.missed_match,
            self.missed_tap_or_hold,
            self.missed_beat,
            self.missed_liftoff,
            self.missed_beat_release,
            self.missed_spin,
            self.broken_hold,
            self.broken_beat_hold,
            self.broken_spin,
            self.broken_scratch,
        ]
    }
}

/// Which multiplier penalty a failure event draws from the profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    Overbeat,
    MissedMatch,
    MissedTapOrHold,
    MissedBeat,
    MissedLiftoff,
    MissedBeatRelease,
    MissedSpin,
    BrokenHold,
    BrokenBeatHold,
    BrokenSpin,
    BrokenScratch,
}

/// Which tick rate a sustain event draws from the profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SustainKind {
    Hold,
    BeatHold,
    Spin,
    Scratch,
}

/// Which fixed point value an untimed hit draws from the profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlatHitKind {
    Match,
    SpinStart,
}

impl MultiplierDeltas {
    pub const fn for_failure(&self, kind: FailureKind) -> i32 {
        match kind {
            FailureKind::Overbeat => self.overbeat,
            FailureKind::MissedMatch => self.missed_match,
            FailureKind::MissedTapOrHold => self.missed_tap_or_hold,
            FailureKind::MissedBeat => self.missed_beat,
            FailureKind::MissedLiftoff => self.missed_liftoff,
            FailureKind::MissedBeatRelease => self.missed_beat_release,
            FailureKind::MissedSpin => self.missed_spin,
            FailureKind::BrokenHold => self.broken_hold,
            FailureKind::BrokenBeatHold => self.broken_beat_hold,
            FailureKind::BrokenSpin => self.broken_spin,
            FailureKind::BrokenScratch => self.broken_scratch,
        }
    }
}

impl TickRates {
    pub const fn for_sustain(&self, kind: SustainKind) -> f32 {
        match kind {
            SustainKind::Hold => self.hold,
            SustainKind::BeatHold => self.beat_hold,
            SustainKind::Spin => self.spin,
            SustainKind::Scratch => self.scratch,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankThreshold {
    pub label: String,
    /// Lower bound on `score / max_possible_score`.
    pub min_ratio: f64,
}

impl RankThreshold {
    pub fn new(label: &str, min_ratio: f64) -> Self {
        Self {
            label: label.to_string(),
            min_ratio,
        }
    }
}

/// Every gameplay-affecting number of a profile. Plain data, free to edit;
/// only a [`ScoringProfile`] built from it can drive an engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub match_point_value: u32,
    pub spin_start_point_value: u32,
    pub tick_rates: TickRates,
    pub max_multiplier: u32,
    #[serde(default)]
    pub multiplier_deltas: MultiplierDeltas,
    pub points_per_multiplier: Vec<u32>,
    pub tap_windows: Vec<TimingWindow>,
    pub beat_windows: Vec<TimingWindow>,
    pub liftoff_windows: Vec<TimingWindow>,
    pub beat_release_windows: Vec<TimingWindow>,
    pub s_plus_threshold: u64,
    pub rank_thresholds: Vec<RankThreshold>,
}

impl ScoringRules {
    /// The stock rules: four multiplier levels, five accuracy tiers per window set.
    pub fn standard() -> Self {
        let press = vec![
            TimingWindow::new(AccuracyTier::PerfectPlus, 16, 2, 0.025),
            TimingWindow::new(AccuracyTier::Perfect, 16, 1, 0.050),
            TimingWindow::new(AccuracyTier::Great, 14, 0, 0.075),
            TimingWindow::new(AccuracyTier::Good, 12, 0, 0.100),
            TimingWindow::new(AccuracyTier::Okay, 8, 0, f32::INFINITY),
        ];
        let release = vec![
            TimingWindow::new(AccuracyTier::PerfectPlus, 16, 2, 0.050),
            TimingWindow::new(AccuracyTier::Perfect, 16, 1, 0.100),
            TimingWindow::new(AccuracyTier::Great, 14, 0, 0.130),
            TimingWindow::new(AccuracyTier::Good, 12, 0, 0.160),
            TimingWindow::new(AccuracyTier::Okay, 8, 0, f32::INFINITY),
        ];
        Self {
            match_point_value: 4,
            spin_start_point_value: 16,
            tick_rates: TickRates {
                hold: 20.0,
                beat_hold: 20.0,
                spin: 20.0,
                scratch: 20.0,
            },
            max_multiplier: 4,
            multiplier_deltas: MultiplierDeltas {
                overbeat: -1,
                missed_match: -3,
                missed_tap_or_hold: -3,
                missed_beat: -3,
                missed_liftoff: -3,
                missed_beat_release: -3,
                missed_spin: -3,
                broken_hold: -2,
                broken_beat_hold: -2,
                broken_spin: -2,
                broken_scratch: -2,
            },
            points_per_multiplier: vec![32, 64, 96],
            tap_windows: press.clone(),
            beat_windows: press,
            liftoff_windows: release.clone(),
            beat_release_windows: release,
            s_plus_threshold: 96,
            rank_thresholds: vec![
                RankThreshold::new("S", 0.98),
                RankThreshold::new("A+", 0.95),
                RankThreshold::new("A", 0.90),
                RankThreshold::new("B+", 0.85),
                RankThreshold::new("B", 0.80),
                RankThreshold::new("C+", 0.75),
                RankThreshold::new("C", 0.70),
                RankThreshold::new("D+", 0.65),
                RankThreshold::new("D", 0.0),
            ],
        }
    }

    pub fn windows(&self, set: WindowSet) -> &[TimingWindow] {
        match set {
            WindowSet::Tap => &self.tap_windows,
            WindowSet::Beat => &self.beat_windows,
            WindowSet::Liftoff => &self.liftoff_windows,
            WindowSet::BeatRelease => &self.beat_release_windows,
        }
    }

    fn windows_mut(&mut self, set: WindowSet) -> &mut Vec<TimingWindow> {
        match set {
            WindowSet::Tap => &mut self.tap_windows,
            WindowSet::Beat => &mut self.beat_windows,
            WindowSet::Liftoff => &mut self.liftoff_windows,
            WindowSet::BeatRelease => &mut self.beat_release_windows,
        }
    }

    /// Rejects tables an engine cannot run on, then sorts windows and ranks and
    /// clamps the multiplier values into range.
    fn normalize(mut self, name: &str) -> Result<Self, String> {
        if self.points_per_multiplier.is_empty() {
            return Err(format!("profile '{name}': points_per_multiplier is empty"));
        }
        if self.rank_thresholds.is_empty() {
            return Err(format!("profile '{name}': rank_thresholds is empty"));
        }
        self.max_multiplier = self.max_multiplier.max(1);
        for entry in &mut self.points_per_multiplier {
            *entry = (*entry).max(1);
        }
        for set in WindowSet::ALL {
            let windows = self.windows_mut(set);
            if windows.is_empty() {
                return Err(format!("profile '{name}': {set:?} window table is empty"));
            }
            windows.sort_by(|a, b| a.upper_bound_s.total_cmp(&b.upper_bound_s));
            if let Some(last) = windows.last_mut() {
                last.upper_bound_s = f32::INFINITY;
            }
        }
        self.rank_thresholds
            .sort_by(|a, b| b.min_ratio.total_cmp(&a.min_ratio));
        Ok(self)
    }

    fn content_id(&self) -> String {
        fn put_u32(h: &mut XxHash64, v: u32) {
            h.write(&v.to_le_bytes());
        }

        let mut hasher = XxHash64::with_seed(0);

        put_u32(&mut hasher, self.match_point_value);
        put_u32(&mut hasher, self.spin_start_point_value);
        for rate in [
            self.tick_rates.hold,
            self.tick_rates.beat_hold,
            self.tick_rates.spin,
            self.tick_rates.scratch,
        ] {
            put_u32(&mut hasher, rate.to_bits());
        }
        put_u32(&mut hasher, self.max_multiplier);
        for delta in self.multiplier_deltas.fields() {
            hasher.write(&delta.to_le_bytes());
        }
        put_u32(&mut hasher, self.points_per_multiplier.len() as u32);
        for entry in &self.points_per_multiplier {
            put_u32(&mut hasher, *entry);
        }
        for set in WindowSet::ALL {
            let windows = self.windows(set);
            put_u32(&mut hasher, windows.len() as u32);
            for w in windows {
                put_u32(&mut hasher, w.tier.index() as u32);
                put_u32(&mut hasher, w.primary_points);
                put_u32(&mut hasher, w.secondary_points);
                put_u32(&mut hasher, w.upper_bound_s.to_bits());
            }
        }
        hasher.write(&self.s_plus_threshold.to_le_bytes());
        put_u32(&mut hasher, self.rank_thresholds.len() as u32);
        for rank in &self.rank_thresholds {
            put_u32(&mut hasher, rank.label.len() as u32);
            hasher.write(rank.label.as_bytes());
            hasher.write(&rank.min_ratio.to_bits().to_le_bytes());
        }
        format!("{:016x}", hasher.finish())
    }
}

/// On-disk shape of a profile: a display name plus its rules.
#[derive(Serialize, Deserialize)]
struct ProfileFile {
    name: String,
    rules: ScoringRules,
}

/// Validated, frozen scoring rules shared by every play that uses them.
///
/// The only ways in are [`ScoringProfile::new`], [`ScoringProfile::standard`]
/// and the JSON loaders, all of which validate the rules and derive the
/// content id from them. The rules cannot be edited afterwards, so the id always
/// matches them. Two profiles compare equal when their rules match, whatever
/// their display names; high score keys are built from the id.
#[derive(Clone, Debug)]
pub struct ScoringProfile {
    name: String,
    id: String,
    rules: ScoringRules,
}

impl PartialEq for ScoringProfile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScoringProfile {}

impl ScoringProfile {
    pub fn new(name: &str, rules: ScoringRules) -> Result<Self, String> {
        let rules = rules.normalize(name)?;
        Ok(Self {
            name: name.to_string(),
            id: rules.content_id(),
            rules,
        })
    }

    pub fn standard() -> Self {
        match Self::new(STANDARD_PROFILE_NAME, ScoringRules::standard()) {
            Ok(p) => p,
            Err(e) => unreachable!("standard profile is valid: {e}"),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let file: ProfileFile = serde_json::from_str(json)?;
        Ok(Self::new(&file.name, file.rules)?)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ProfileFile {
            name: self.name.clone(),
            rules: self.rules.clone(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Loads every `*.json` profile in `dir`. Unreadable or invalid files are skipped.
    pub fn load_dir(dir: &Path) -> Vec<Self> {
        let Ok(read_dir) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut profiles = Vec::new();
        for item in read_dir.flatten() {
            let path = item.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load(&path) {
                Ok(profile) => {
                    info!(
                        "Loaded scoring profile '{}' ({}) from {:?}",
                        profile.name, profile.id, path
                    );
                    profiles.push(profile);
                }
                Err(e) => warn!("Skipping scoring profile {:?}: {}", path, e),
            }
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read-only view of the rules. Clone and pass to [`ScoringProfile::new`]
    /// to derive a variant.
    #[inline(always)]
    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    #[inline(always)]
    pub const fn max_multiplier(&self) -> u32 {
        self.rules.max_multiplier
    }

    pub fn windows(&self, set: WindowSet) -> &[TimingWindow] {
        self.rules.windows(set)
    }

    pub const fn flat_points(&self, kind: FlatHitKind) -> u32 {
        match kind {
            FlatHitKind::Match => self.rules.match_point_value,
            FlatHitKind::SpinStart => self.rules.spin_start_point_value,
        }
    }

    /// Raw points needed to climb from `level` to `level + 1`. Levels past the
    /// end of the table reuse its last entry.
    #[inline(always)]
    pub fn points_for_level(&self, level: u32) -> u64 {
        let table = &self.rules.points_per_multiplier;
        let ix = (level.max(1) as usize).min(table.len()) - 1;
        u64::from(table[ix])
    }
}
