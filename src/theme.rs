//! Theme loading: btop-style `theme[key]="value"` files, hex → ratatui Color,
//! and the token-kind → colour/glyph mapping the renderer depends on.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Most token kinds the theme can represent; `--kinds` is capped by this.
pub const MAX_KINDS: u8 = 6;

/// Glyph per token kind; paired with the colour so kinds stay tellable apart
/// on low-colour terminals.
const GLYPHS: [char; MAX_KINDS as usize] = ['●', '◆', '■', '▲', '★', '♥'];

/// Token and UI colours loaded from a theme file (One Dark by default).
#[derive(Debug, Clone)]
pub struct Theme {
    /// Token colours, index 0..MAX_KINDS.
    pub tokens: [Color; MAX_KINDS as usize],
    /// Board background.
    pub bg: Color,
    /// Border / grid lines.
    pub div_line: Color,
    /// Text (score, hints).
    pub main_fg: Color,
    /// Highlight / titles / selection ring.
    pub title: Color,
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
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults, exact hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            tokens: [
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
                Color::Rgb(0xC6, 0x78, 0xDD), // magenta
                Color::Rgb(0x56, 0xB6, 0xC2), // cyan
            ],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
        }
    }

    /// Load theme from a btop-style file. `None` or a missing file falls back
    /// to the built-in default; a file that exists but fails to parse is an
    /// error — the game refuses to start without a complete token mapping.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => {
                let mut t = Self::onedark_default();
                t.apply_palette(palette);
                return Ok(t);
            }
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map)?;
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override token colours for high-contrast or colorblind palettes.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tokens = [
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                ];
            }
            crate::Palette::Colorblind => {
                // Paul Tol bright scheme: distinguishable without red/green.
                self.tokens = [
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xCC, 0x33, 0x11),
                    Color::Rgb(0xEE, 0x33, 0x77),
                    Color::Rgb(0xBB, 0xBB, 0x00),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        // Token colours reuse btop's box/accent keys so existing btop themes
        // work unmodified. Each referenced key must parse if present.
        let get = |key: &'static str, fallback: Color| -> Result<Color, ThemeError> {
            match map.get(key) {
                Some(v) => parse_hex(v),
                None => Ok(fallback),
            }
        };
        let d = Self::onedark_default();
        Ok(Self {
            tokens: [
                get("mem_box", d.tokens[0])?,
                get("cpu_mid", d.tokens[1])?,
                get("cpu_end", d.tokens[2])?,
                get("cpu_box", d.tokens[3])?,
                get("net_box", d.tokens[4])?,
                get("hi_fg", d.tokens[5])?,
            ],
            bg: get("meter_bg", d.bg)?,
            div_line: get("div_line", d.div_line)?,
            main_fg: get("main_fg", d.main_fg)?,
            title: get("title", d.title)?,
        })
    }

    /// Colour for a token kind.
    #[inline]
    pub fn token_color(&self, kind: u8) -> Color {
        self.tokens[(kind as usize) % self.tokens.len()]
    }

    /// Glyph for a token kind.
    #[inline]
    pub fn token_glyph(&self, kind: u8) -> char {
        GLYPHS[(kind as usize) % GLYPHS.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let raw = s.trim().trim_matches('"').trim_matches('\'');
    let hex = raw.trim_start_matches('#');
    let (r, g, b) = if hex.len() == 6 {
        let byte = |i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ThemeError::InvalidHex(raw.to_string()))
        };
        (byte(0)?, byte(2)?, byte(4)?)
    } else if hex.len() == 3 {
        let nib = |i| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| ThemeError::InvalidHex(raw.to_string()))
        };
        (nib(0)?, nib(1)?, nib(2)?)
    } else {
        return Err(ThemeError::InvalidHex(raw.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}
