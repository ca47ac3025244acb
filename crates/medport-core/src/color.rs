//! # Color Synchronization
//!
//! A medication color is shown both as a hex string and as three channel
//! integers. The two views must always denote the same color:
//!
//! - editing the hex text overwrites the channels (two hex digits per channel)
//! - editing a channel overwrites the hex text (zero-padded, lowercase)
//!
//! Unparseable hex text maps to black. The transform is pure and invertible
//! on well-formed input.

use serde::{Deserialize, Serialize};

// =============================================================================
// RGB TRIPLE
// =============================================================================

/// A color as three 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    /// The fallback for unparseable hex input.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Create a new triple.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Read one channel.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }

    /// Return a copy with one channel replaced.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel, value: u8) -> Self {
        match channel {
            Channel::Red => self.red = value,
            Channel::Green => self.green = value,
            Channel::Blue => self.blue = value,
        }
        self
    }
}

/// One of the three color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Parse `#rrggbb` (the `#` is optional, digits in either case).
///
/// Returns `None` unless the text is exactly six hex digits.
#[must_use]
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let pair = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
    Some(Rgb::new(pair(0)?, pair(2)?, pair(4)?))
}

/// Convert hex text to channels, defaulting to black when unparseable.
#[must_use]
pub fn hex_to_rgb(hex: &str) -> Rgb {
    parse_hex(hex).unwrap_or(Rgb::BLACK)
}

/// Format channels as `#rrggbb`.
#[must_use]
pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}

/// Check the form's hex rule: `#` followed by exactly six hex digits.
#[must_use]
pub fn is_valid_hex(hex: &str) -> bool {
    hex.starts_with('#') && parse_hex(hex).is_some()
}

/// Parse a channel typed as text.
///
/// Leading digits are read the way a number input reads them (`"12px"` is 12);
/// text without digits is 0, and values are clamped into `0..=255`.
#[must_use]
pub fn parse_channel_text(text: &str) -> u8 {
    let text = text.trim();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || negative {
        return 0;
    }

    // Anything that overflows u32 is far above 255 anyway.
    digits
        .parse::<u32>()
        .map(|value| value.min(u32::from(u8::MAX)) as u8)
        .unwrap_or(u8::MAX)
}

// =============================================================================
// LINKED COLOR FIELDS
// =============================================================================

/// The color part of the medication form.
///
/// `hex` holds the text as typed; the channels always hold the color that
/// text denotes (black when it does not parse). Go through the setters to
/// keep both views in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorFields {
    pub name: String,
    pub hex: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Default for ColorFields {
    fn default() -> Self {
        Self::from_rgb("", Rgb::new(128, 128, 128))
    }
}

impl ColorFields {
    /// Build synchronized fields from a triple.
    #[must_use]
    pub fn from_rgb(name: impl Into<String>, rgb: Rgb) -> Self {
        Self {
            name: name.into(),
            hex: rgb_to_hex(rgb),
            red: rgb.red,
            green: rgb.green,
            blue: rgb.blue,
        }
    }

    /// Build synchronized fields from hex text.
    #[must_use]
    pub fn from_hex(name: impl Into<String>, hex: impl Into<String>) -> Self {
        let mut fields = Self {
            name: name.into(),
            ..Self::default()
        };
        fields.set_hex(hex);
        fields
    }

    /// The current channels.
    #[must_use]
    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.red, self.green, self.blue)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Store the hex text and overwrite the channels from it.
    pub fn set_hex(&mut self, hex: impl Into<String>) {
        let hex = hex.into();
        let rgb = hex_to_rgb(&hex);
        self.hex = hex;
        self.write_channels(rgb);
    }

    /// Overwrite all channels and the hex text.
    pub fn set_rgb(&mut self, rgb: Rgb) {
        self.write_channels(rgb);
        self.hex = rgb_to_hex(rgb);
    }

    /// Overwrite one channel and recompute the hex text.
    pub fn set_channel(&mut self, channel: Channel, value: u8) {
        self.set_rgb(self.rgb().with_channel(channel, value));
    }

    /// Overwrite one channel from typed text (see [`parse_channel_text`]).
    pub fn set_channel_text(&mut self, channel: Channel, text: &str) {
        self.set_channel(channel, parse_channel_text(text));
    }

    /// True when the hex text parses to exactly the stored channels.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        parse_hex(&self.hex) == Some(self.rgb())
    }

    fn write_channels(&mut self, rgb: Rgb) {
        self.red = rgb.red;
        self.green = rgb.green;
        self.blue = rgb.blue;
    }
}

// =============================================================================
// TESTS
// =============================================================================
