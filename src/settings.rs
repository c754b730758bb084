//! Player settings: a plain JSON blob, no versioning.

use crate::highscores::config_dir;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

const FILENAME: &str = "settings.json";

/// Sound and haptics toggles. Sound gates the terminal bell; haptics
/// gates the board shake, the part of vibration a terminal can express.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sound: bool,
    pub haptics: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: true,
            haptics: true,
        }
    }
}

impl Settings {
    /// Load settings from disk; missing or malformed data falls back to
    /// the defaults.
    pub fn load() -> Self {
        match fs::read_to_string(config_dir().join(FILENAME)) {
            Ok(s) => Self::from_json(&s),
            Err(_) => Self::default(),
        }
    }

    fn from_json(s: &str) -> Self {
        serde_json::from_str(s).unwrap_or_default()
    }

    /// Save settings to disk. Creates the config directory if needed.
    pub fn save(self) -> Result<()> {
        let dir = config_dir();
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(FILENAME), serde_json::to_string(&self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_blob() {
        let s = Settings::from_json(r#"{"sound":false,"haptics":true}"#);
        assert!(!s.sound);
        assert!(s.haptics);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s = Settings::from_json(r#"{"sound":false}"#);
        assert!(!s.sound);
        assert!(s.haptics);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let s = Settings::from_json(r#"{"sound":true,"haptics":false,"crt":true}"#);
        assert!(s.sound);
        assert!(!s.haptics);
    }

    #[test]
    fn malformed_blob_falls_back_to_defaults() {
        let s = Settings::from_json("][ not json");
        assert!(s.sound);
        assert!(s.haptics);
    }

    #[test]
    fn round_trips_through_json() {
        let s = Settings {
            sound: false,
            haptics: false,
        };
        let json = serde_json::to_string(&s).unwrap();
        let back = Settings::from_json(&json);
        assert!(!back.sound);
        assert!(!back.haptics);
    }
}
