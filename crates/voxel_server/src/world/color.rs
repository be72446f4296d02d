//! 24-bit RGB block and player colors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest value a 24-bit RGB color can hold.
pub const MAX_COLOR: u32 = 0xff_ff_ff;

/// A 24-bit RGB color as sent on the wire (a plain JSON integer).
///
/// Decoding rejects negative numbers, fractional numbers and anything above
/// [`MAX_COLOR`], so every `Color` in the server is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Color(u32);

impl Color {
    /// Color assigned to freshly connected sessions.
    pub const WHITE: Color = Color(MAX_COLOR);

    /// Returns the color if `rgb` fits in 24 bits.
    pub const fn new(rgb: u32) -> Option<Self> {
        if rgb <= MAX_COLOR {
            Some(Self(rgb))
        } else {
            None
        }
    }

    /// Raw RGB value.
    pub const fn rgb(self) -> u32 {
        self.0
    }
}

/// Error returned when a wire value does not fit in 24 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("color {0:#x} exceeds 24-bit RGB range")]
pub struct ColorOutOfRange(pub u32);

impl TryFrom<u32> for Color {
    type Error = ColorOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Color::new(value).ok_or(ColorOutOfRange(value))
    }
}

impl From<Color> for u32 {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_range() {
        assert_eq!(Color::new(0).map(Color::rgb), Some(0));
        assert_eq!(Color::new(MAX_COLOR), Some(Color::WHITE));
        assert!(Color::new(MAX_COLOR + 1).is_none());
    }

    #[test]
    fn test_color_wire_format() {
        let color: Color = serde_json::from_str("3314483").expect("valid color");
        assert_eq!(color.rgb(), 0x329333);
        assert_eq!(serde_json::to_string(&color).unwrap(), "3314483");
        assert_eq!(color.to_string(), "#329333");
    }

    #[test]
    fn test_color_rejects_invalid_wire_values() {
        assert!(serde_json::from_str::<Color>("16777216").is_err());
        assert!(serde_json::from_str::<Color>("-1").is_err());
        assert!(serde_json::from_str::<Color>("1.5").is_err());
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }
}
