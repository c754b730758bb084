//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Block palette and UI colours, optionally loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours (index 0..=5): red, blue, green, yellow, violet, cyan.
    pub blocks: [Color; 6],
    /// Screen background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles / warnings.
    pub title: Color,
    /// Inactive / secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::neon_default()
    }
}

impl Theme {
    /// Hardcoded defaults: the game's neon palette on a near-black screen.
    pub fn neon_default() -> Self {
        Self {
            blocks: [
                parse_hex("#DC2626").unwrap(), // red
                parse_hex("#2563EB").unwrap(), // blue
                parse_hex("#16A34A").unwrap(), // green
                parse_hex("#FACC15").unwrap(), // yellow
                parse_hex("#7C3AED").unwrap(), // violet
                parse_hex("#06B6D4").unwrap(), // cyan
            ],
            bg: parse_hex("#0A0A0F").unwrap(),
            div_line: parse_hex("#2A2A35").unwrap(),
            main_fg: parse_hex("#E8E8F0").unwrap(),
            title: parse_hex("#EF4444").unwrap(),
            inactive_fg: parse_hex("#6B7280").unwrap(),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or
    /// `theme[key]='value'`. Falls back to the neon defaults if path is
    /// None or the file is missing/invalid. `palette` selects the colour
    /// variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::neon_default();
        t.apply_palette(palette);
        t
    }

    /// Override block colours for high-contrast or colorblind variants.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = [
                    parse_hex("#FF0000").unwrap(), // red
                    parse_hex("#0088FF").unwrap(), // blue
                    parse_hex("#00FF00").unwrap(), // green
                    parse_hex("#FFFF00").unwrap(), // yellow
                    parse_hex("#FF00FF").unwrap(), // violet -> magenta
                    parse_hex("#00FFFF").unwrap(), // cyan
                ];
            }
            crate::Palette::Colorblind => {
                // Colorblind-safe substitutes per slot; each cell also
                // carries its glyph when this palette is active.
                self.blocks = [
                    parse_hex("#CC3311").unwrap(), // red slot
                    parse_hex("#0077BB").unwrap(), // blue slot
                    parse_hex("#009988").unwrap(), // green -> teal
                    parse_hex("#BBBB00").unwrap(), // yellow
                    parse_hex("#EE3377").unwrap(), // violet -> magenta
                    parse_hex("#33BBEE").unwrap(), // cyan
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        // Keys follow btop theme files; fallbacks are the neon defaults.
        Self {
            blocks: [
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or_else(|| parse_hex("#DC2626").unwrap()),
                get("cpu_box").unwrap_or_else(|| parse_hex("#2563EB").unwrap()),
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or_else(|| parse_hex("#16A34A").unwrap()),
                get("cpu_mid")
                    .or_else(|| get("title"))
                    .unwrap_or_else(|| parse_hex("#FACC15").unwrap()),
                get("net_box").unwrap_or_else(|| parse_hex("#7C3AED").unwrap()),
                get("hi_fg")
                    .or_else(|| get("proc_misc"))
                    .unwrap_or_else(|| parse_hex("#06B6D4").unwrap()),
            ],
            bg: get("meter_bg").unwrap_or_else(|| parse_hex("#0A0A0F").unwrap()),
            div_line: get("div_line").unwrap_or_else(|| parse_hex("#2A2A35").unwrap()),
            main_fg: get("main_fg").unwrap_or_else(|| parse_hex("#E8E8F0").unwrap()),
            title: get("title").unwrap_or_else(|| parse_hex("#EF4444").unwrap()),
            inactive_fg: get("inactive_fg").unwrap_or_else(|| parse_hex("#6B7280").unwrap()),
        }
    }

    /// Block colour for a colour index (0..6).
    #[inline]
    pub fn block_color(&self, index: u8) -> Color {
        self.blocks[(index as usize) % 6]
    }
}

/// Glyph shown inside a block in colorblind mode, one per colour index:
/// square, triangle, circle, star, diamond, cross.
pub fn colorblind_glyph(index: u8) -> char {
    const GLYPHS: [char; 6] = ['■', '▲', '●', '★', '◆', '✚'];
    GLYPHS[(index as usize) % 6]
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(rest) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, assignment)) = rest.split_once(']') else {
            continue;
        };
        let Some((_, value)) = assignment.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return Err(ThemeError::InvalidHex(digits.to_string()));
    }
    let channel = |from: usize, to: usize| {
        u8::from_str_radix(&digits[from..to], 16)
            .map_err(|_| ThemeError::InvalidHex(digits.to_string()))
    };
    match digits.len() {
        6 => Ok(Color::Rgb(
            channel(0, 2)?,
            channel(2, 4)?,
            channel(4, 6)?,
        )),
        // Shorthand #RGB: each digit doubles, f -> ff.
        3 => Ok(Color::Rgb(
            channel(0, 1)? * 17,
            channel(1, 2)? * 17,
            channel(2, 3)? * 17,
        )),
        _ => Err(ThemeError::InvalidHex(digits.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#DC2626").unwrap();
        assert!(matches!(c, Color::Rgb(0xDC, 0x26, 0x26)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#0A0A0F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#0A0A0F".to_string()));
    }

    #[test]
    fn test_glyphs_are_distinct() {
        for a in 0..6u8 {
            for b in 0..6u8 {
                if a != b {
                    assert_ne!(colorblind_glyph(a), colorblind_glyph(b));
                }
            }
        }
    }
}
