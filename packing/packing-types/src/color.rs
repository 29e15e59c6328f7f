//! Display colors attached to objects for visualization consumers.

use std::fmt;
use std::str::FromStr;

use crate::error::PackingError;

const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("red", [255, 0, 0]),
    ("maroon", [128, 0, 0]),
    ("orange", [255, 165, 0]),
    ("yellow", [255, 255, 0]),
    ("olive", [128, 128, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("teal", [0, 128, 128]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("blue", [0, 0, 255]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
    ("gold", [255, 215, 0]),
    ("indigo", [75, 0, 130]),
    ("violet", [238, 130, 238]),
    ("tan", [210, 180, 140]),
];

/// An RGB color, parsed from a CSS-style name or a `#rrggbb` hex string.
///
/// ```
/// use packing_types::Color;
///
/// let red: Color = "red".parse().unwrap();
/// assert_eq!(red.rgb(), [255, 0, 0]);
/// assert_eq!("#00ff80".parse::<Color>().unwrap().rgb(), [0, 255, 128]);
/// assert!("reddish".parse::<Color>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    rgb: [u8; 3],
}

impl Color {
    /// Creates a color from RGB bytes.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { rgb: [r, g, b] }
    }

    /// RGB bytes.
    #[must_use]
    pub const fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    /// RGB components in `[0, 1]`.
    #[must_use]
    pub fn to_unit(&self) -> [f64; 3] {
        self.rgb.map(|c| f64::from(c) / 255.0)
    }
}

impl FromStr for Color {
    type Err = PackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                if let (Ok(r), Ok(g), Ok(b)) = (byte(0), byte(2), byte(4)) {
                    return Ok(Self::new(r, g, b));
                }
            }
            return Err(PackingError::validation(format!(
                "invalid hex color '{trimmed}'"
            )));
        }
        let lower = trimmed.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, rgb)| Self { rgb: *rgb })
            .ok_or_else(|| PackingError::validation(format!("unrecognized color '{trimmed}'")))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.rgb;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_case_insensitive() {
        assert_eq!("Blue".parse::<Color>().unwrap(), Color::new(0, 0, 255));
    }

    #[test]
    fn test_hex_display_roundtrip() {
        let color: Color = "#1a2b3c".parse().unwrap();
        assert_eq!(color.to_string(), "#1a2b3c");
    }

    #[test]
    fn test_bad_hex() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_to_unit() {
        let unit = Color::new(255, 0, 51).to_unit();
        assert!((unit[0] - 1.0).abs() < 1e-12);
        assert!((unit[2] - 0.2).abs() < 1e-12);
    }
}
