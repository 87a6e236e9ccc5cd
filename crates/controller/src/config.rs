//! Settings file loading. The file holds the six persisted tunables; any
//! key left out falls back to its compiled-in default, and a missing file
//! means "all defaults".

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use garden_engine::Settings;

/// Read, parse, and validate a TOML settings file.
pub fn load(path: &str) -> Result<Settings> {
    if !Path::new(path).exists() {
        info!(path, "no settings file; using compiled-in defaults");
        return Ok(Settings::default());
    }

    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read settings: {path}"))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("failed to parse settings: {path}"))?;
    settings
        .validate()
        .with_context(|| format!("invalid settings: {path}"))?;
    Ok(settings)
}

// ===========================================================================
// Tests
// ===========================================================================
