use scorecast::config;
use scorecast::game::high_scores::HighScoreStore;
use scorecast::game::replay::Replay;
use scorecast::game::scoring_profile::ScoringProfile;
use scorecast::game::session::PlaySession;
use scorecast::game::system::ScoreReport;
use std::path::PathBuf;
use std::sync::Arc;

/// Standard rules plus every profile in `cfg.profile_dir`, narrowed to the
/// names listed in `ActiveProfiles`. Gameplay-identical duplicates collapse.
fn active_profiles(cfg: &config::Config) -> Vec<Arc<ScoringProfile>> {
    let mut available = vec![ScoringProfile::standard()];
    available.extend(ScoringProfile::load_dir(&cfg.profile_dir));

    let mut active: Vec<Arc<ScoringProfile>> = Vec::new();
    for name in &cfg.active_profiles {
        let Some(profile) = available.iter().find(|p| p.name().eq_ignore_ascii_case(name)) else {
            log::warn!("Active profile '{name}' was not found; skipping.");
            continue;
        };
        if active.iter().any(|p| p.id() == profile.id()) {
            log::info!("Profile '{name}' plays identically to one already active; skipping.");
            continue;
        }
        active.push(Arc::new(profile.clone()));
    }
    if active.is_empty() {
        log::warn!("No active profiles resolved; falling back to standard.");
        active.push(Arc::new(ScoringProfile::standard()));
    }
    active
}

fn print_report(r: &ScoreReport) {
    println!(
        "{:<12} score {:>8} (+{}) x{} streak {}/{} {} rank {} best {} pace {:+}{}",
        r.label,
        r.score,
        r.secondary_score,
        r.multiplier,
        r.streak,
        r.max_streak,
        r.full_combo,
        r.rank.as_deref().unwrap_or("-"),
        r.best_possible_final_score,
        r.pace_delta,
        if r.is_high_score { "  NEW BEST" } else { "" }
    );
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let Some(replay_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        return Err("usage: scorecast <replay.json>".into());
    };
    let replay = Replay::load(&replay_path)?;
    let profiles = active_profiles(&cfg);

    let mut store = match HighScoreStore::load_all(&cfg.high_score_file) {
        Ok(store) => store,
        Err(e) => {
            log::warn!("Failed to read high scores from {:?}: {e}", cfg.high_score_file);
            HighScoreStore::in_memory()
        }
    };

    let mut session = PlaySession::new(
        &replay.track_id,
        &replay.notes,
        &profiles,
        &store,
        cfg.mirror_native_score,
    );
    session.pump(&mut replay.source());
    session.finish(&mut store);

    println!("{} ({} events)", session.track_id(), session.events_seen());
    for report in session.reports() {
        print_report(&report);
    }
    for engine in session.engines() {
        let t = engine.timing_tendency();
        println!(
            "{:<12} accuracy {:.2}% early {} late {} mean {:+.1}ms misses {}",
            engine.profile().name(),
            engine.accuracy() * 100.0,
            t.early,
            t.late,
            t.mean_offset_s() * 1000.0,
            engine.misses()
        );
    }
    Ok(())
}
