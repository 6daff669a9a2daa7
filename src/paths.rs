//! Common paths for lurk data storage
//!
//! All lurk data is stored under ~/.config/lurk/ on all platforms:
//! - config.toml - User configuration
//! - lurk.sqlite - Watch-list database

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the lurk data directory (~/.config/lurk/), creating it if needed
pub fn lurk_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let lurk_dir = home.join(".config").join("lurk");
    fs::create_dir_all(&lurk_dir).context("Failed to create lurk directory")?;
    Ok(lurk_dir)
}

/// Get the config file path (~/.config/lurk/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(lurk_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/lurk/lurk.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(lurk_dir()?.join("lurk.sqlite"))
}
