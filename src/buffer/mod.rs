//! Buffer module: the framebuffer a window draws into.
//!
//! This module contains:
//! - [`PixelBuffer`]: a fixed-size, row-major grid of packed colours
//! - [`Rgb`]: unpacked true-colour view of a pixel
//! - colour constants used by the demos

mod color;
mod pixels;

pub use color::{Color, Rgb, COLOR_BLACK, COLOR_BLUE, COLOR_GREEN, COLOR_RED, COLOR_WHITE};
pub use pixels::PixelBuffer;
