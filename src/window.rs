//! Window: a pixel buffer bound to one display backend.
//!
//! The window owns the framebuffer and the backend; the backend owns its
//! transport and background thread. Pixel writes happen on the caller's
//! thread, input callbacks arrive on the backend's thread.
//!
//! # Lifecycle
//!
//! ```text
//!  bootstrap ──▶ create ──▶ (set_pixel* ─ present ─ wait_for_tick)* ──▶ destroy ──▶ finalize
//! ```
//!
//! `bootstrap`/`create`/`finalize` live on the backend's session type
//! ([`LocalSession`](crate::local::LocalSession),
//! [`RemoteServer`](crate::remote::RemoteServer)); everything in between is
//! here.

use crate::buffer::{Color, PixelBuffer};
use crate::error::Result;
use crate::input::{HookSlot, KeyCode};
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Geometry handed to input callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Operations a display backend provides to a [`Window`].
///
/// Implementations own their transport exclusively. Blocking calls run on
/// the caller's thread; anything asynchronous is delivered through the
/// [`HookSlot`] the backend was created with.
pub trait Backend: Send {
    /// Deliver the full buffer to the display sink.
    fn present(&mut self, pixels: &PixelBuffer) -> Result<()>;

    /// Block until a fresh mouse sample is available and return it.
    fn query_mouse(&mut self) -> Result<(i32, i32)>;

    /// Block until one frame interval has elapsed.
    fn wait_for_tick(&mut self) -> Result<()>;

    /// Stop and join background threads. Must be idempotent.
    fn shutdown(&mut self);
}

/// Smoothed frame-rate measurement across ticks.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    last: Option<Instant>,
    fps: f64,
}

impl FrameClock {
    const fn new() -> Self {
        Self { last: None, fps: 0.0 }
    }

    fn tick(&mut self, now: Instant) {
        if let Some(last) = self.last {
            let elapsed = now.saturating_duration_since(last).max(Duration::from_micros(1));
            let instant_fps = 1.0 / elapsed.as_secs_f64();
            self.fps = if self.fps == 0.0 {
                instant_fps
            } else {
                (self.fps * 15.0 + instant_fps) / 16.0
            };
        }
        self.last = Some(now);
    }
}

/// A framebuffer presented through backend `B`.
pub struct Window<B: Backend> {
    pixels: PixelBuffer,
    hooks: HookSlot,
    backend: B,
    clock: FrameClock,
    destroyed: bool,
}

impl<B: Backend> Window<B> {
    /// Assemble a window. Backends call this from their `create`.
    pub(crate) const fn from_parts(pixels: PixelBuffer, hooks: HookSlot, backend: B) -> Self {
        Self {
            pixels,
            hooks,
            backend,
            clock: FrameClock::new(),
            destroyed: false,
        }
    }

    /// Geometry of this window.
    pub const fn info(&self) -> WindowInfo {
        WindowInfo {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }

    /// Width in pixels.
    #[inline]
    pub const fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always `false`; windows have non-zero size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The framebuffer.
    pub const fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// The framebuffer, mutably.
    pub const fn pixels_mut(&mut self) -> &mut PixelBuffer {
        &mut self.pixels
    }

    /// Write a pixel by linear index. Panics past the end of the buffer.
    #[inline]
    pub fn set_pixel_raw(&mut self, index: usize, color: Color) {
        self.pixels.set_raw(index, color);
    }

    /// Write a pixel without checking the column. See [`PixelBuffer::set`].
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        self.pixels.set(x, y, color);
    }

    /// Write a pixel, reporting out-of-range coordinates instead.
    #[inline]
    pub fn set_pixel_safe(&mut self, x: u32, y: u32, color: Color) -> Result<()> {
        self.pixels.set_safe(x, y, color)
    }

    /// Send the whole buffer to the display sink.
    pub fn present(&mut self) -> Result<()> {
        self.backend.present(&self.pixels)
    }

    /// Register the input callback, replacing any previous one.
    ///
    /// The callback runs on a backend thread, possibly concurrently for
    /// different codes, and must not block for long.
    pub fn install_input_hook<F>(&mut self, hook: F)
    where
        F: Fn(&WindowInfo, KeyCode, bool) + Send + Sync + 'static,
    {
        self.hooks.install(Arc::new(hook));
    }

    /// Block until a fresh mouse sample is available.
    pub fn query_mouse(&mut self) -> Result<(i32, i32)> {
        self.backend.query_mouse()
    }

    /// Block until the backend's frame interval has elapsed.
    pub fn wait_for_tick(&mut self) -> Result<()> {
        self.backend.wait_for_tick()?;
        self.clock.tick(Instant::now());
        Ok(())
    }

    /// Smoothed frames per second, measured between ticks.
    pub const fn fps(&self) -> f64 {
        self.clock.fps
    }

    /// The backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Tear the window down.
    ///
    /// No input callback starts once this begins; the backend thread is
    /// joined before the buffer is freed.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.hooks.close();
        self.backend.shutdown();
        debug!("window {}x{} destroyed", self.width(), self.height());
    }
}

impl<B: Backend> Drop for Window<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<B: Backend> std::fmt::Debug for Window<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
