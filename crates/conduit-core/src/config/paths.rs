//! Well-known directories used by conduit itself.
//!
//! Agent config file locations are owned by the adapters; this module only
//! covers the tool's own settings, state and cache.

use std::path::{Path, PathBuf};

use anyhow::Context;

const APP_DIR: &str = "conduit";

/// `<config_dir>/conduit`, e.g. `~/.config/conduit` on Linux.
pub fn global_config_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join(APP_DIR))
}

/// Settings file inside a config directory.
pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join("config.toml")
}

/// Directory for persistent tool state (the lock file).
///
/// Falls back to the local data dir on platforms without a state dir.
pub fn state_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .context("Could not determine state directory")?;
    Ok(base.join(APP_DIR))
}

/// Directory for re-creatable downloads such as git checkouts.
pub fn cache_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    Ok(base.join(APP_DIR))
}

/// Lock file location inside a state directory.
pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join("lock.json")
}
