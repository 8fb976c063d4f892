//! Text width measurement for label wrapping.
//!
//! The default path uses a calibrated per-character width table so layout is
//! identical on every machine. With `fast_text_metrics` disabled the widths
//! come from a matching system font, falling back to the table when no font
//! resolves or a glyph is missing.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static FONT_MEASURER: Lazy<Mutex<FontMeasurer>> = Lazy::new(|| Mutex::new(FontMeasurer::new()));

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    if !fast {
        if let Ok(mut measurer) = FONT_MEASURER.lock() {
            if let Some(width) = measurer.measure(text, font_size, font_family) {
                return width;
            }
        }
    }
    text.chars().map(|ch| char_width_factor(ch) * font_size).sum()
}

/// Width of `ch` as a fraction of the font size.
pub fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '.' | ',' | ':' | ';' | '|' | '!' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'i' | 'j' | 'l' | 'I' => 0.24,
        'f' | 'r' | 't' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '@' | '#' | '%' | '&' => 0.946,
        '0'..='9' => 0.6,
        'A'..='Z' => 0.68,
        'a'..='z' => 0.56,
        _ if ch.is_whitespace() => 0.306,
        _ if ch.len_utf8() >= 3 => 1.0,
        _ => 0.568,
    }
}

struct FontMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontAdvances>>,
}

/// Horizontal advances of one face, in em fractions.
struct FontAdvances {
    advances: HashMap<char, f32>,
}

impl FontMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_ascii_lowercase();
        if !self.faces.contains_key(&key) {
            let face = self.load(font_family);
            if face.is_none() {
                log::debug!(font_family; "no system font matched, using width table");
            }
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get(&key)?.as_ref()?;
        let width = text
            .chars()
            .map(|ch| {
                face.advances
                    .get(&ch)
                    .copied()
                    .unwrap_or_else(|| char_width_factor(ch))
                    * font_size
            })
            .sum();
        Some(width)
    }

    fn load(&mut self, font_family: &str) -> Option<FontAdvances> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                let units_per_em = f32::from(face.units_per_em().max(1));
                let advances = (' '..='~')
                    .chain('\u{a0}'..='\u{ff}')
                    .filter_map(|ch| {
                        let glyph = face.glyph_index(ch)?;
                        let advance = face.glyph_hor_advance(glyph)?;
                        Some((ch, f32::from(advance) / units_per_em))
                    })
                    .collect();
                Some(FontAdvances { advances })
            })
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_width_scales_with_font_size() {
        let small = measure_text_width("Approve", 10.0, "sans-serif", true);
        let large = measure_text_width("Approve", 20.0, "sans-serif", true);
        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 1e-3);
    }

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(measure_text_width("", 12.0, "sans-serif", true), 0.0);
        assert_eq!(measure_text_width("abc", 0.0, "sans-serif", true), 0.0);
    }
}
