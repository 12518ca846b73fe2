//! Pixel colours.
//!
//! A pixel is a packed `0x00RRGGBB` value; [`Rgb`] is the unpacked view
//! used by sinks that need individual channels.

/// Packed 24-bit colour as stored in a [`PixelBuffer`](super::PixelBuffer).
pub type Color = u32;

/// Black.
pub const COLOR_BLACK: Color = 0x00_00_00;
/// White.
pub const COLOR_WHITE: Color = 0xFF_FF_FF;
/// Red.
pub const COLOR_RED: Color = 0xFF_00_00;
/// Green.
pub const COLOR_GREEN: Color = 0x00_FF_00;
/// Blue.
pub const COLOR_BLUE: Color = 0x00_00_FF;

/// True-colour RGB triple.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack a `0x00RRGGBB` pixel. The top byte is ignored.
    #[inline]
    pub const fn from_u32(hex: Color) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// Pack into a `0x00RRGGBB` pixel.
    #[inline]
    pub const fn to_u32(self) -> Color {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for Rgb {
    #[inline]
    fn from(hex: Color) -> Self {
        Self::from_u32(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_unpack() {
        let rgb = Rgb::from_u32(0x12_34_56);
        assert_eq!(rgb, Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(rgb.to_u32(), 0x12_34_56);
    }

    #[test]
    fn test_rgb_ignores_alpha_byte() {
        let rgb: Rgb = 0xAB_FF_00_80.into();
        assert_eq!(rgb, Rgb::new(0xFF, 0x00, 0x80));
        assert_eq!(format!("{rgb:?}"), "#ff0080");
    }
}
