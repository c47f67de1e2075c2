use directories::ProjectDirs;
use log::{info, warn};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

pub const CONFIG_PATH: &str = "scorecast.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: FxHashMap<String, FxHashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    pub fn parse(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // [SectionName]
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = name.trim().to_string();
                self.sections.entry(current_section.clone()).or_default();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                self.sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("'{other}' is not a valid log level")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    pub high_score_file: PathBuf,
    pub profile_dir: PathBuf,
    /// Profile names to score with, in display order.
    pub active_profiles: Vec<String>,
    pub mirror_native_score: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            high_score_file: default_high_score_file(),
            profile_dir: PathBuf::from("profiles"),
            active_profiles: vec![crate::game::scoring_profile::STANDARD_PROFILE_NAME.to_string()],
            mirror_native_score: false,
        }
    }
}

fn default_high_score_file() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", "scorecast") {
        dirs.data_dir().join("highscores.txt")
    } else {
        PathBuf::from("highscores.txt")
    }
}

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- Parsing helpers ---

fn parse_bool(v: &str) -> Option<bool> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a config from parsed INI content, using defaults for missing or
/// malformed keys.
pub fn from_ini(conf: &SimpleIni) -> Config {
    let default = Config::default();
    Config {
        log_level: conf
            .get("Options", "LogLevel")
            .and_then(|v| match LogLevel::from_str(&v) {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!("{e}; using {}", default.log_level.as_str());
                    None
                }
            })
            .unwrap_or(default.log_level),
        high_score_file: conf
            .get("Options", "HighScoreFile")
            .filter(|v| !v.is_empty())
            .map_or(default.high_score_file, PathBuf::from),
        profile_dir: conf
            .get("Options", "ProfileDir")
            .filter(|v| !v.is_empty())
            .map_or(default.profile_dir, PathBuf::from),
        active_profiles: conf
            .get("Options", "ActiveProfiles")
            .map(|v| parse_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or(default.active_profiles),
        mirror_native_score: conf
            .get("Options", "MirrorNativeScore")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default.mirror_native_score),
    }
}

pub fn to_ini_string(cfg: &Config) -> String {
    // [Options] section - keys in alphabetical order
    let mut content = String::new();
    content.push_str("[Options]\n");
    content.push_str(&format!("ActiveProfiles={}\n", cfg.active_profiles.join(",")));
    content.push_str(&format!("HighScoreFile={}\n", cfg.high_score_file.display()));
    content.push_str(&format!("LogLevel={}\n", cfg.log_level.as_str()));
    content.push_str(&format!(
        "MirrorNativeScore={}\n",
        if cfg.mirror_native_score { "1" } else { "0" }
    ));
    content.push_str(&format!("ProfileDir={}\n", cfg.profile_dir.display()));
    content
}

// --- File I/O ---

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    std::fs::write(CONFIG_PATH, to_ini_string(&Config::default()))
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            let loaded = from_ini(&conf);
            *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = loaded;
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

pub fn get() -> Config {
    CONFIG.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

#[cfg(test)]
mod tests {
    use super::{Config, LogLevel, SimpleIni, from_ini, to_ini_string};
    use std::path::PathBuf;

    fn ini(content: &str) -> SimpleIni {
        let mut conf = SimpleIni::new();
        conf.parse(content);
        conf
    }

    #[test]
    fn reads_sections_and_skips_comments() {
        let conf = ini("; comment\n[Options]\n LogLevel = Debug \n# other\nbad line\n=x\n");
        assert_eq!(conf.get("Options", "LogLevel").as_deref(), Some("Debug"));
        assert_eq!(conf.get("Options", "bad line"), None);
        assert_eq!(conf.get("Missing", "LogLevel"), None);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = from_ini(&ini("[Options]\nLogLevel=nonsense\nActiveProfiles= , \n"));
        let default = Config::default();
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert_eq!(cfg.active_profiles, default.active_profiles);
        assert_eq!(cfg.profile_dir, default.profile_dir);
        assert!(!cfg.mirror_native_score);
    }

    #[test]
    fn explicit_values_are_honored() {
        let cfg = from_ini(&ini(
            "[Options]\n\
             LogLevel=trace\n\
             ActiveProfiles=standard, hard\n\
             MirrorNativeScore=yes\n\
             ProfileDir=/tmp/p\n\
             HighScoreFile=scores.txt\n",
        ));
        assert_eq!(cfg.log_level, LogLevel::Trace);
        assert_eq!(cfg.active_profiles, vec!["standard".to_string(), "hard".to_string()]);
        assert!(cfg.mirror_native_score);
        assert_eq!(cfg.profile_dir, PathBuf::from("/tmp/p"));
        assert_eq!(cfg.high_score_file, PathBuf::from("scores.txt"));
    }

    #[test]
    fn written_defaults_read_back_unchanged() {
        let default = Config::default();
        let back = from_ini(&ini(&to_ini_string(&default)));
        assert_eq!(back, default);
    }
}
