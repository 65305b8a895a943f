//! Raw settings persistence (TOML).
//!
//! [`SettingsFile`] mirrors the configuration surface exactly as the user
//! enters it: key names and time fields stay raw text, so a file edited by
//! hand round-trips unchanged and validation happens in exactly one place
//! (the settings gate).  The time fields accept digit-only values; empty
//! means zero.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{AppPaths, Mode};

// ---------------------------------------------------------------------------
// SettingsFile
// ---------------------------------------------------------------------------

/// The persisted configuration surface, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use autopress::config::SettingsFile;
///
/// // Load (returns Default when the file is missing)
/// let settings = SettingsFile::load().unwrap();
///
/// // Modify and save
/// // settings.save().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Raw initiate ("start/stop") key name, e.g. `"f7"`.
    pub initiate_key: String,
    /// Raw target key name, e.g. `"a"` or `"space"`.
    pub target_key: String,
    /// Normal (repeat) or Hold (toggle-hold).
    pub mode: Mode,
    /// Interval components as entered; digit-only, empty means `0`.
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
    pub milliseconds: String,
    /// Operator has confirmed intervals below the 50 ms safety floor.
    pub allow_sub_minimum: bool,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            initiate_key: "f7".into(),
            target_key: "a".into(),
            mode: Mode::Normal,
            hours: "0".into(),
            minutes: "0".into(),
            seconds: "0".into(),
            milliseconds: "100".into(),
            allow_sub_minimum: false,
        }
    }
}

impl SettingsFile {
    /// Load settings from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(SettingsFile::default())` when the file does not exist
    /// yet (first-run scenario) so callers never need to special-case a
    /// missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to the platform-appropriate `settings.toml`, creating
    /// parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
