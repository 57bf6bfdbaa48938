//! Process-wide path configuration.
//!
//! The skills root defaults to `~/.skillsync/skills` and can be overridden
//! once at startup (CLI flag or env var) before any component touches it.

use std::{
    path::PathBuf,
    sync::{OnceLock, RwLock},
};

use tracing::debug;

fn root_override() -> &'static RwLock<Option<PathBuf>> {
    static OVERRIDE: OnceLock<RwLock<Option<PathBuf>>> = OnceLock::new();
    OVERRIDE.get_or_init(|| RwLock::new(None))
}

/// Override the skills root for this process (e.g. from `--skills-dir`).
pub fn set_skills_root(path: PathBuf) {
    debug!(path = %path.display(), "skills root override set");
    if let Ok(mut guard) = root_override().write() {
        *guard = Some(path);
    }
}

/// Clear a previously set override (used by tests).
pub fn clear_skills_root() {
    if let Ok(mut guard) = root_override().write() {
        *guard = None;
    }
}

/// The directory installed skills live under.
///
/// Resolution order: explicit override, then `~/.skillsync/skills`. Falls
/// back to a relative path when no home directory can be determined.
pub fn skills_root() -> PathBuf {
    if let Ok(guard) = root_override().read() {
        if let Some(path) = guard.as_ref() {
            return path.clone();
        }
    }
    default_skills_root()
}

fn default_skills_root() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".skillsync").join("skills"))
        .unwrap_or_else(|| PathBuf::from(".skillsync/skills"))
}

/// The user's home directory, if one can be determined.
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}
