//! Persist the best score to disk (XDG config or ~/.config/anxietui).

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

const FILENAME: &str = "highscore";

/// Config directory for this app (XDG_CONFIG_HOME, ~/.config, or ".").
pub(crate) fn config_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    base.join("anxietui")
}

/// Load the best score from disk; 0 on missing or malformed contents.
pub fn load_high_score() -> u32 {
    match fs::read_to_string(config_dir().join(FILENAME)) {
        Ok(content) => parse_high_score(&content),
        Err(_) => 0,
    }
}

fn parse_high_score(s: &str) -> u32 {
    s.trim().parse::<u32>().unwrap_or(0)
}

/// Save the best score to disk. Creates the config directory if needed.
pub fn save_high_score(score: u32) -> Result<()> {
    let dir = config_dir();
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(FILENAME), format!("{score}\n"))?;
    Ok(())
}
