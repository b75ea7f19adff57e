//! File logging. The terminal belongs to the UI, so log output goes to
//! `<data_dir>/horizon/horizon.log`. `HORIZON_LOG` overrides the level.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "HORIZON_LOG";

fn fallback_level(configured: Option<&str>) -> &'static str {
    match configured
        .map(|level| level.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => "info",
    }
}

pub fn log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("horizon").join("horizon.log"))
}

/// Start logging to the log file. Returns its path, or `None` if logging
/// could not be set up; the app runs either way.
pub fn init(configured_level: Option<&str>) -> Option<PathBuf> {
    let path = log_path()?;
    fs::create_dir_all(path.parent()?).ok()?;
    let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;

    let level = fallback_level(configured_level);
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .ok()?;

    Some(path)
}
