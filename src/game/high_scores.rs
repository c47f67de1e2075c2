use crate::game::classification::FullComboState;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const NO_RANK: &str = "-";
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Best result for one (track, profile) pair. Only `score` and `rank` survive
/// a save/load cycle; the rest describe the play that set the record while the
/// process is running.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighScoreRecord {
    pub score: u64,
    pub rank: Option<String>,
    pub streak: u32,
    pub max_score: u64,
    pub secondary_score: u64,
    pub full_combo: FullComboState,
}

impl HighScoreRecord {
    fn rank_token(&self) -> &str {
        match self.rank.as_deref() {
            Some(r) if !r.is_empty() && !r.chars().any(char::is_whitespace) => r,
            _ => NO_RANK,
        }
    }
}

/// High scores keyed by `"{track_id}_{profile_id}"`, persisted as one
/// `key score rank hash` line per record.
#[derive(Clone, Debug, Default)]
pub struct HighScoreStore {
    path: Option<PathBuf>,
    records: FxHashMap<String, HighScoreRecord>,
}

/// Whitespace in either id would split the line format, so it becomes `_`.
pub fn record_key(track_id: &str, profile_id: &str) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    };
    format!("{}_{}", sanitize(track_id), sanitize(profile_id))
}

/// Tamper check over a stored line. Not a security boundary, just enough to
/// reject hand edits of the score or rank.
pub fn integrity_hash(key: &str, score: u64, rank_token: &str) -> String {
    let mut h = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            h = h.wrapping_mul(FNV_PRIME);
            h ^= u64::from(b);
        }
    };
    feed(&score.to_le_bytes());
    feed(rank_token.as_bytes());
    feed(&[0]);
    feed(key.as_bytes());
    format!("{:08x}", (h ^ (h >> 32)) as u32)
}

fn parse_line(line: &str) -> Result<(String, HighScoreRecord), String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [key, score, rank, hash] = tokens.as_slice() else {
        return Err(format!("expected 4 fields, found {}", tokens.len()));
    };
    let score: u64 = score
        .parse()
        .map_err(|_| format!("'{score}' is not a valid score"))?;
    let expected = integrity_hash(key, score, rank);
    if !expected.eq_ignore_ascii_case(hash) {
        return Err(format!("hash mismatch for '{key}'"));
    }
    let rank = (*rank != NO_RANK).then(|| (*rank).to_string());
    Ok((
        (*key).to_string(),
        HighScoreRecord {
            score,
            rank,
            ..HighScoreRecord::default()
        },
    ))
}

impl HighScoreStore {
    /// A store that lives in memory only; `save_all` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Reads the store at `path`. A missing file is an empty store; lines that
    /// are malformed or fail the integrity check are dropped.
    pub fn load_all(path: &Path) -> io::Result<Self> {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            records: FxHashMap::default(),
        };
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No high score file at {:?}; starting empty", path);
                return Ok(store);
            }
            Err(e) => return Err(e),
        };

        let mut dropped = 0usize;
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok((key, record)) => {
                    store.records.insert(key, record);
                }
                Err(e) => {
                    debug!("Dropping high score line {}: {}", line_no + 1, e);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!("Dropped {dropped} invalid high score lines from {:?}", path);
        }
        info!("Loaded {} high scores from {:?}", store.records.len(), path);
        Ok(store)
    }

    /// Writes every record, sorted by key. Parent directories are created.
    pub fn save_all(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut keys: Vec<&String> = self.records.keys().collect();
        keys.sort();
        let mut buf = String::new();
        for key in keys {
            let record = &self.records[key];
            let rank = record.rank_token();
            let hash = integrity_hash(key, record.score, rank);
            let _ = writeln!(buf, "{key} {} {rank} {hash}", record.score);
        }
        fs::write(path, buf)?;
        info!("Saved {} high scores to {:?}", self.records.len(), path);
        Ok(())
    }

    /// Stored record, or a zero record if there is none.
    pub fn get(&self, track_id: &str, profile_id: &str) -> HighScoreRecord {
        self.records
            .get(&record_key(track_id, profile_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the stored record only when the candidate's score is strictly
    /// higher. Returns whether anything changed.
    pub fn set_if_higher(
        &mut self,
        track_id: &str,
        profile_id: &str,
        candidate: HighScoreRecord,
    ) -> bool {
        let key = record_key(track_id, profile_id);
        if candidate.score <= self.records.get(&key).map_or(0, |r| r.score) {
            return false;
        }
        self.records.insert(key, candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
