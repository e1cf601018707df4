//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `levelup_core` linkage, logging setup and the configured store.
//! - Keep output deterministic for quick local sanity checks.

use levelup_core::db::open_db;
use levelup_core::{SqliteStateStore, TrackerConfig, TrackerService};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("levelup_core ping={}", levelup_core::ping());
    println!("levelup_core version={}", levelup_core::core_version());

    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("levelup_core config=error message={err}");
            return ExitCode::FAILURE;
        }
    };
    match config.init_logging() {
        Ok(()) => println!("levelup_core logging={}", config.log_dir.display()),
        Err(err) => eprintln!("levelup_core logging=error message={err}"),
    }

    match print_progress(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("levelup_core store=error message={message}");
            ExitCode::FAILURE
        }
    }
}

fn print_progress(config: &TrackerConfig) -> Result<(), String> {
    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let store = SqliteStateStore::try_new(&conn).map_err(|err| err.to_string())?;
    let service =
        TrackerService::open(store, config.tracker_options()).map_err(|err| err.to_string())?;

    let progress = service.progress();
    println!("levelup_core store={}", config.db_path.display());
    println!(
        "levelup_core level={} xp={} xp_today={} xp_to_next={} progress={:.1}",
        progress.level,
        progress.xp,
        progress.xp_earned_today,
        progress.xp_needed_for_next_level,
        progress.level_progress
    );
    println!(
        "levelup_core current_tasks={} recent_tasks={} daily_quests={}",
        service.state().current_tasks.len(),
        service.state().recent_tasks.len(),
        service.state().daily_quests.len()
    );
    Ok(())
}
