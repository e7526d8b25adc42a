use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_DURATION_YEARS: u32 = 20;
pub const DEFAULT_INTEREST_RATE_PERCENT: f64 = 3.1;

/// User defaults shared by the loan and investment simulators.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "default_duration")]
    pub duration_years: u32,
    #[serde(default = "default_interest_rate")]
    pub interest_rate_percent: f64,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_YEARS
}

fn default_interest_rate() -> f64 {
    DEFAULT_INTEREST_RATE_PERCENT
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            duration_years: DEFAULT_DURATION_YEARS,
            interest_rate_percent: DEFAULT_INTEREST_RATE_PERCENT,
        }
    }
}

impl Preferences {
    pub fn set_duration(&mut self, duration_years: u32) {
        self.duration_years = duration_years;
    }

    pub fn set_interest_rate(&mut self, interest_rate_percent: f64) {
        self.interest_rate_percent = interest_rate_percent;
    }

    pub fn reset_duration(&mut self) {
        self.duration_years = DEFAULT_DURATION_YEARS;
    }

    pub fn reset_interest_rate(&mut self) {
        self.interest_rate_percent = DEFAULT_INTEREST_RATE_PERCENT;
    }

    pub fn reset_all(&mut self) {
        *self = Preferences::default();
    }

    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("fr", "immosim", "immosim")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("preferences.yaml"))
    }

    /// Reads preferences from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No preferences file, using defaults");
            return Ok(Preferences::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences file: {}", path.display()))?;
        let prefs: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse preferences file: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded preferences");
        Ok(prefs)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let raw = serde_yaml::to_string(self).context("Failed to serialize preferences")?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write preferences file: {}", path.display()))?;
        debug!(path = %path.display(), "Saved preferences");
        Ok(())
    }
}

/// Resolves the preferences file: an explicit path wins over the platform
/// config directory.
pub fn resolve_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(PathBuf::from(path)),
        None => Preferences::default_path(),
    }
}
