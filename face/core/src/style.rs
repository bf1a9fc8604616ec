//! Render Style
//!
//! Everything about *how* a frame looks that depends on the display mode:
//! typeface weights, palette, alpha and anti-aliasing. The style is derived
//! from the mode flags in one pure call and committed together with them, so
//! the first frame after entering ambient mode is already ambient-styled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::presentation::DisplayMode;

/// Full opacity
pub const OPAQUE: u8 = 255;
/// Text alpha while the wearer has muted interruptions
pub const MUTED_TEXT_ALPHA: u8 = 100;

/// A 24-bit color, written as `#RRGGBB` in configuration files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Create a color from its channels
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pure black
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);
    /// Pure white
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF);
    /// Neutral gray used for secondary text
    pub const GRAY: Self = Self::new(0x88, 0x88, 0x88);
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected #RRGGBB, got {s:?}"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| e.to_string())
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Colors for both display modes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Main text color in interactive mode
    pub text: Rgb,
    /// Background in interactive mode
    pub background: Rgb,
    /// Temperature line in interactive mode
    pub temperature: Rgb,
    /// Date line in interactive mode
    pub date: Rgb,
    /// Main text color in ambient mode
    pub text_ambient: Rgb,
    /// Background in ambient mode
    pub background_ambient: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Rgb::WHITE,
            background: Rgb::new(0x03, 0xA9, 0xF4),
            temperature: Rgb::new(0xB3, 0xE5, 0xFC),
            date: Rgb::GRAY,
            text_ambient: Rgb::WHITE,
            background_ambient: Rgb::BLACK,
        }
    }
}

/// Typeface weight for the clock digits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Weight {
    /// Regular weight
    Normal,
    /// Bold weight
    Bold,
}

/// Per-text anti-alias toggles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AntiAlias {
    /// Hour digits
    pub hour: bool,
    /// Minute digits
    pub minute: bool,
    /// Second digits
    pub second: bool,
    /// Date line
    pub date: bool,
    /// Temperature line and other body text
    pub text: bool,
}

impl AntiAlias {
    const fn all(enabled: bool) -> Self {
        Self {
            hour: enabled,
            minute: enabled,
            second: enabled,
            date: enabled,
            text: enabled,
        }
    }
}

/// Render-affecting flags, derived as a unit from the display flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStyle {
    /// Weight of the hour digits
    pub hour_weight: Weight,
    /// Weight of the minute digits
    pub minute_weight: Weight,
    /// Main text color
    pub text_color: Rgb,
    /// Background fill
    pub background: Rgb,
    /// Date line color
    pub date_color: Rgb,
    /// Temperature line color
    pub temperature_color: Rgb,
    /// Alpha applied to the main text
    pub text_alpha: u8,
    /// Alpha applied to the weather icon (0 hides it)
    pub icon_alpha: u8,
    /// Anti-aliasing per text element
    pub anti_alias: AntiAlias,
}

impl RenderStyle {
    /// Derive the style for a combination of display flags
    #[must_use]
    pub fn derive(
        mode: DisplayMode,
        low_bit_ambient: bool,
        burn_in_protection: bool,
        muted: bool,
        palette: &Palette,
    ) -> Self {
        let ambient = mode.is_ambient();
        let digits = if ambient { Weight::Normal } else { Weight::Bold };
        let hour_weight = if burn_in_protection {
            Weight::Normal
        } else {
            digits
        };

        // Low-bit panels cannot blend edges in ambient mode.
        let anti_alias = AntiAlias::all(!(ambient && low_bit_ambient));

        let text_alpha = if muted { MUTED_TEXT_ALPHA } else { OPAQUE };

        if ambient {
            Self {
                hour_weight,
                minute_weight: digits,
                text_color: palette.text_ambient,
                background: palette.background_ambient,
                date_color: palette.background_ambient,
                temperature_color: palette.background_ambient,
                text_alpha,
                icon_alpha: 0,
                anti_alias,
            }
        } else {
            Self {
                hour_weight,
                minute_weight: digits,
                text_color: palette.text,
                background: palette.background,
                date_color: palette.date,
                temperature_color: palette.temperature,
                text_alpha,
                icon_alpha: OPAQUE,
                anti_alias,
            }
        }
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::derive(
            DisplayMode::Interactive,
            false,
            false,
            false,
            &Palette::default(),
        )
    }
}
