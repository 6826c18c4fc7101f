//! Player preferences
//!
//! Persisted as JSON next to the high scores. A missing or broken file is
//! never fatal: we log it and play with defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tuning::ConfigError;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Background beat volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Silence everything
    pub muted: bool,

    // === Visual Effects ===
    /// Shake the playfield when a bull gets bonked
    pub screen_shake: bool,

    // === Accessibility ===
    /// Reduced motion (no shake, no tilt)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            muted: false,

            screen_shake: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }

    /// Save settings. Failures are logged and otherwise ignored.
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => log::info!("Settings saved"),
                Err(e) => log::warn!("Could not save settings to {}: {e}", path.display()),
            },
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_motion_disables_shake() {
        let mut settings = Settings::default();
        assert!(settings.effective_screen_shake());
        settings.reduced_motion = true;
        assert!(!settings.effective_screen_shake());
    }

    #[test]
    fn unknown_path_falls_back_to_defaults() {
        let settings = Settings::load(Path::new("/no/such/dir/settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_keeps_preferences() {
        let path = std::env::temp_dir().join(format!(
            "barnyard-settings-{}.json",
            std::process::id()
        ));
        let settings = Settings {
            muted: true,
            music_volume: 0.25,
            ..Settings::default()
        };
        settings.save(&path);
        assert_eq!(Settings::load(&path), settings);
        let _ = std::fs::remove_file(&path);
    }
}
