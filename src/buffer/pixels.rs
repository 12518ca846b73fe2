//! `PixelBuffer`: the dense framebuffer owned by a window.
//!
//! Pixels are stored in row-major order, one packed colour per pixel.
//! The buffer is sized once at construction and never resized.

use super::color::Color;
use crate::error::{Error, Result};

/// A fixed-size grid of packed colours.
///
/// Access is in row-major order: `index = y * width + x`.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Contiguous pixel storage (row-major order).
    pixels: Vec<Color>,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
}

impl PixelBuffer {
    /// Create a black buffer of `width * height` pixels.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ZeroSize);
        }
        let size = (width as usize) * (height as usize);
        Ok(Self {
            pixels: vec![0; size],
            width,
            height,
        })
    }

    /// Get the buffer width.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Get the buffer height.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of pixels (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always `false` once constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Length of the buffer on the wire, in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Color>()
    }

    /// Get a reference to the underlying pixel slice.
    #[inline]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Get a mutable reference to the underlying pixel slice.
    ///
    /// The slice length is fixed, so the buffer can never be resized
    /// through it.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Convert (x, y) coordinates to a linear index.
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub const fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y as usize) * (self.width as usize) + (x as usize))
        } else {
            None
        }
    }

    /// Write a pixel by linear index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn set_raw(&mut self, index: usize, color: Color) {
        self.pixels[index] = color;
    }

    /// Write a pixel at (x, y) without checking the column.
    ///
    /// An out-of-range `x` wraps into the next row; an index past the end
    /// of the buffer panics. Use [`set_safe`](Self::set_safe) when the
    /// coordinates are not known to be valid.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.set_raw((y as usize) * (self.width as usize) + (x as usize), color);
    }

    /// Write a pixel at (x, y), reporting out-of-range coordinates.
    ///
    /// The buffer is untouched when an error is returned.
    pub fn set_safe(&mut self, x: u32, y: u32, color: Color) -> Result<()> {
        match self.index_of(x, y) {
            Some(idx) => {
                self.pixels[idx] = color;
                Ok(())
            }
            None => Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// Get the pixel at (x, y).
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        self.index_of(x, y).map(|i| self.pixels[i])
    }

    /// Fill the whole buffer with one colour.
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Get an iterator over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        self.pixels.chunks(self.width as usize)
    }

    /// Append the little-endian byte image of every pixel to `out`.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.byte_len());
        for px in &self.pixels {
            out.extend_from_slice(&px.to_le_bytes());
        }
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.byte_len())
            .finish()
    }
}
