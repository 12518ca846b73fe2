//! Display sinks for the local backend.
//!
//! A [`FrameSink`] turns a whole [`PixelBuffer`] into something visible.
//! Graphics-protocol encoders (sixel, kitty) plug in by implementing the
//! trait; [`AnsiSink`] is the built-in fallback that works on any
//! true-colour terminal.

use super::output::OutputBuffer;
use crate::buffer::{PixelBuffer, Rgb};
use std::io::{self, Write};

/// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: &str = "\u{2580}";

/// Destination for presented frames.
pub trait FrameSink: Send {
    /// Render the full buffer.
    fn draw(&mut self, pixels: &PixelBuffer) -> io::Result<()>;
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn draw(&mut self, _pixels: &PixelBuffer) -> io::Result<()> {
        Ok(())
    }
}

/// Renders frames as true-colour half blocks, two pixel rows per text row.
///
/// Every `stride`-th pixel is sampled in each direction, so large buffers
/// can be shown on small terminals.
pub struct AnsiSink<W: Write + Send> {
    writer: W,
    output: OutputBuffer,
    stride: u32,
}

impl AnsiSink<io::Stdout> {
    /// Sink writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> AnsiSink<W> {
    /// Create a sink over `writer` with no downsampling.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            output: OutputBuffer::with_capacity(65536),
            stride: 1,
        }
    }

    /// Sample every `stride`-th pixel (minimum 1).
    #[must_use]
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Get the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn encode(&mut self, pixels: &PixelBuffer) {
        let step = self.stride;
        let sample = |x: u32, y: u32| Rgb::from_u32(pixels.get(x, y).unwrap_or(0));

        self.output.clear();
        let mut row = 0;
        let mut y = 0;
        while y < pixels.height() {
            self.output.cursor_move(0, row);
            let mut x = 0;
            while x < pixels.width() {
                self.output.set_fg(sample(x, y));
                self.output.set_bg(sample(x, y + step));
                self.output.write_str(HALF_BLOCK);
                x += step;
            }
            self.output.reset_attrs();
            row += 1;
            y += step * 2;
        }
    }
}

impl<W: Write + Send> FrameSink for AnsiSink<W> {
    fn draw(&mut self, pixels: &PixelBuffer) -> io::Result<()> {
        self.encode(pixels);
        self.output.flush_to(&mut self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_block_frame() {
        let mut pixels = PixelBuffer::new(2, 2).unwrap();
        pixels.set(0, 0, 0xFF_00_00);
        pixels.set(0, 1, 0x00_00_FF);
        pixels.set(1, 0, 0xFF_00_00);
        pixels.set(1, 1, 0x00_00_FF);

        let mut sink = AnsiSink::new(Vec::new());
        sink.draw(&pixels).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();

        assert!(text.starts_with("\x1b[1;1H\x1b[38;2;255;0;0m\x1b[48;2;0;0;255m"));
        // Second column repeats the colours, so no new SGR before its block.
        assert!(text.contains("\u{2580}\u{2580}\x1b[0m"));
        assert_eq!(text.matches(HALF_BLOCK).count(), 2);
    }

    #[test]
    fn test_odd_height_pads_with_black() {
        let pixels = PixelBuffer::new(1, 3).unwrap();
        let mut sink = AnsiSink::new(Vec::new());
        sink.draw(&pixels).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches(HALF_BLOCK).count(), 2);
        assert!(text.contains("\x1b[2;1H"));
    }

    #[test]
    fn test_stride_downsamples() {
        let pixels = PixelBuffer::new(8, 8).unwrap();
        let mut sink = AnsiSink::new(Vec::new()).with_stride(2);
        sink.draw(&pixels).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.matches(HALF_BLOCK).count(), 4 * 2);
    }
}
