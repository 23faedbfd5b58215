use std::collections::HashSet;

use crate::error::{ConversionError, Result};
use crate::luminance::Brightness;

/// Default glyphs, from visually emptiest to densest.
pub const DEFAULT_RAMP: &str = " .'`^\",:;Il!i><~+_-?][}{1)(|\\/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// An immutable, ordered palette of glyphs. Index `i` stands for brightness
/// `i / (len - 1)`, so levels are spread uniformly over `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    /// Build a ramp from the characters of `glyphs`, darkest first.
    ///
    /// Fails with [`ConversionError::Configuration`] if there are fewer than
    /// two glyphs, a glyph repeats, or a glyph is a control character.
    pub fn new(glyphs: &str) -> Result<Self> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.len() < 2 {
            return Err(ConversionError::config(format!(
                "glyph ramp needs at least 2 glyphs, got {}",
                glyphs.len()
            )));
        }

        let mut seen = HashSet::with_capacity(glyphs.len());
        for &glyph in &glyphs {
            if glyph.is_control() {
                return Err(ConversionError::config(format!(
                    "glyph ramp contains non-printable character {:?}",
                    glyph
                )));
            }
            if !seen.insert(glyph) {
                return Err(ConversionError::config(format!("glyph ramp repeats {:?}", glyph)));
            }
        }

        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; a ramp holds at least two glyphs.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    /// Ramp position for a brightness: `floor(b * (len - 1))`, clamped.
    /// Products a hair below an integer (white computing to 0.99999...)
    /// still land on that integer.
    pub fn index_for(&self, brightness: Brightness) -> usize {
        const ROUNDING_SLACK: f64 = 1e-9;
        let last = self.glyphs.len() - 1;
        let scaled = (brightness.value() * last as f64 + ROUNDING_SLACK).floor();
        if scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(last)
        }
    }

    pub fn glyph_for(&self, brightness: Brightness) -> char {
        self.glyphs[self.index_for(brightness)]
    }

    /// Every glyph paired with the brightness it represents.
    pub fn levels(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        let last = (self.glyphs.len() - 1) as f64;
        self.glyphs.iter().enumerate().map(move |(i, &glyph)| (glyph, i as f64 / last))
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: DEFAULT_RAMP.chars().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ramp_is_valid() {
        let ramp = GlyphRamp::new(DEFAULT_RAMP).unwrap();
        assert_eq!(ramp, GlyphRamp::default());
        assert_eq!(ramp.len(), 70);
        assert_eq!(ramp.glyphs()[0], ' ');
        assert_eq!(ramp.glyphs()[69], '$');
    }

    #[test]
    fn rejects_short_ramps() {
        assert!(matches!(GlyphRamp::new(""), Err(ConversionError::Configuration(_))));
        assert!(matches!(GlyphRamp::new("#"), Err(ConversionError::Configuration(_))));
        assert!(GlyphRamp::new(" #").is_ok());
    }

    #[test]
    fn rejects_repeats_and_control_characters() {
        assert!(GlyphRamp::new(" .. ").is_err());
        assert!(GlyphRamp::new(" \t#").is_err());
    }

    #[test]
    fn endpoints_map_to_first_and_last_glyph() {
        for text in [" #", " .:", DEFAULT_RAMP] {
            let ramp = GlyphRamp::new(text).unwrap();
            assert_eq!(ramp.glyph_for(Brightness::new(0.0)), ramp.glyphs()[0]);
            assert_eq!(ramp.glyph_for(Brightness::new(1.0)), *ramp.glyphs().last().unwrap());
        }
    }

    #[test]
    fn white_reaches_the_last_glyph() {
        let ramp = GlyphRamp::default();
        assert_eq!(ramp.glyph_for(Brightness::new(0.9999999999999999)), '$');
    }

    #[test]
    fn lookup_is_monotonic() {
        let ramp = GlyphRamp::default();
        let mut previous = 0;
        for step in 0..=10_000 {
            let index = ramp.index_for(Brightness::new(step as f64 / 10_000.0));
            assert!(index >= previous, "index dropped at step {}", step);
            previous = index;
        }
        assert_eq!(previous, ramp.len() - 1);
    }

    #[test]
    fn lookup_floors_between_levels() {
        let ramp = GlyphRamp::new(" .:#").unwrap();
        assert_eq!(ramp.glyph_for(Brightness::new(0.33)), ' ');
        assert_eq!(ramp.glyph_for(Brightness::new(0.34)), '.');
        assert_eq!(ramp.glyph_for(Brightness::new(0.99)), ':');
    }

    #[test]
    fn levels_are_uniform() {
        let ramp = GlyphRamp::new(" .:#").unwrap();
        let levels: Vec<_> = ramp.levels().collect();
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0], (' ', 0.0));
        assert_eq!(levels[3], ('#', 1.0));
        assert!((levels[1].1 - 1.0 / 3.0).abs() < 1e-12);
    }
}
