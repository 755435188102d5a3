//! Linear-light RGBA colors.
//!
//! All blending happens in linear light. Hex strings and presentation
//! output are sRGB encoded, converted with the standard piecewise transfer.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Alpha values at or below this are treated as fully transparent.
pub const ALPHA_EPSILON: f32 = 1e-5;

/// Linear-light RGBA color, channels nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    /// Red channel (linear)
    pub r: f32,
    /// Green channel (linear)
    pub g: f32,
    /// Blue channel (linear)
    pub b: f32,
    /// Alpha (coverage, not gamma encoded)
    pub a: f32,
}

impl Color {
    /// Opaque black; also the fallback for malformed hex input.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Creates an opaque color from linear channels.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a color from linear channels and alpha.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the color with alpha replaced.
    #[must_use]
    pub const fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    /// Whether the alpha is close enough to zero to count as invisible.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.a.abs() <= ALPHA_EPSILON
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`, falling back to
    /// opaque black on malformed input.
    #[must_use]
    pub fn from_hex(hex: &str) -> Self {
        Self::parse_hex(hex).unwrap_or(Self::BLACK)
    }

    /// Parses an sRGB hex string, returning `None` when malformed.
    #[must_use]
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |b: u8| (b as char).to_digit(16).map_or(0, |v| v as u8);
        let bytes: Vec<u8> = match digits.len() {
            3 | 4 => digits.bytes().map(|b| nibble(b) * 17).collect(),
            6 | 8 => digits
                .as_bytes()
                .chunks(2)
                .map(|pair| nibble(pair[0]) * 16 + nibble(pair[1]))
                .collect(),
            _ => return None,
        };
        let channel = |i: usize| srgb_to_linear(f32::from(bytes[i]) / 255.0);
        let alpha = bytes.get(3).map_or(1.0, |&a| f32::from(a) / 255.0);
        Some(Self::rgba(channel(0), channel(1), channel(2), alpha))
    }

    /// Encodes to 8-bit sRGB, clamping each channel to `[0, 1]` first.
    #[must_use]
    pub fn to_srgb8(&self) -> [u8; 4] {
        let encode = |v: f32| (linear_to_srgb(v) * 255.0).round() as u8;
        [
            encode(self.r),
            encode(self.g),
            encode(self.b),
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    /// Presentation string, `rgba(R, G, B, A)` with sRGB 0-255 channels.
    #[must_use]
    pub fn to_css_string(&self) -> String {
        let [r, g, b, _] = self.to_srgb8();
        format!("rgba({r}, {g}, {b}, {})", self.a.clamp(0.0, 1.0))
    }

    /// Linear blend toward `target` by `amount`.
    ///
    /// When one endpoint is transparent its color channels carry no
    /// information, so the other endpoint's RGB is used as-is and only alpha
    /// is interpolated.
    #[must_use]
    pub fn mix(self, target: Self, amount: f32) -> Self {
        let lerp = |from: f32, to: f32| from + (to - from) * amount;
        let a = lerp(self.a, target.a);
        if self.is_transparent() {
            target.with_alpha(a)
        } else if target.is_transparent() {
            self.with_alpha(a)
        } else {
            Self::rgba(
                lerp(self.r, target.r),
                lerp(self.g, target.g),
                lerp(self.b, target.b),
                a,
            )
        }
    }

    /// Channels premultiplied by alpha.
    #[must_use]
    pub fn premultiplied(&self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }

    /// Inverse of [`Color::premultiplied`]; fully transparent input yields
    /// [`Color::TRANSPARENT`].
    #[must_use]
    pub fn from_premultiplied([r, g, b, a]: [f32; 4]) -> Self {
        if a <= ALPHA_EPSILON {
            Self::TRANSPARENT
        } else {
            Self::rgba(r / a, g / a, b / a, a)
        }
    }
}

impl From<[f32; 3]> for Color {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_string())
    }
}

/// sRGB-encoded channel to linear light.
#[must_use]
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear channel to sRGB encoding, clamped to `[0, 1]`.
#[must_use]
pub fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}
