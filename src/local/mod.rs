//! Local-Input Backend: a window drawn on the controlling terminal.
//!
//! Input comes from the terminal as a byte stream: plain bytes are key
//! activity and SGR reports carry mouse buttons and motion. Keys never
//! report release, so releases are synthesized by [`KeyDebouncer`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Vec<u8>  ┌──────────────┐  activity  ┌──────────────┐
//! │ stdin thread │ ────────▶ │  key reader  │ ─────────▶ │   release    │
//! │ (process)    │           │  (window)    │            │  scheduler   │
//! └──────────────┘           └──────┬───────┘            └──────┬───────┘
//!                                   │ press / buttons           │ release
//!                                   ▼                           ▼
//!                             ┌─────────────────────────────────────┐
//!                             │              input hook             │
//!                             └─────────────────────────────────────┘
//! ```

mod debounce;
mod escape;
mod output;
mod reader;
mod sink;
mod stdin;
mod terminal;

pub use debounce::{KeyDebouncer, DEFAULT_DEBOUNCE};
pub use escape::{
    EscapeParser, LocalInput, MouseReport, BUTTON_MAX_ORDINARY, BUTTON_MOTION,
    BUTTON_SCROLL_DOWN, BUTTON_SCROLL_UP,
};
pub use output::OutputBuffer;
pub use sink::{AnsiSink, FrameSink, NullSink};
pub use terminal::TerminalGuard;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::input::HookSlot;
use crate::signal::Signals;
use crate::window::{Backend, Window, WindowInfo};
use crossbeam_channel::Receiver;
use log::info;
use reader::{KeyReaderActor, ReaderContext};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What happens when the quit byte arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitAction {
    /// Restore the terminal and exit the process with status 0.
    Exit,
    /// Stop reading input; blocked queries fail with `Disconnected`.
    Stop,
    /// Swallow the byte and keep reading.
    Ignore,
}

/// Configuration for the local backend.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Quiet period after which a key counts as released.
    pub debounce: Duration,
    /// Interval `wait_for_tick` paces frames to.
    pub frame_interval: Duration,
    /// How long background threads wait before checking shutdown.
    pub poll_timeout: Duration,
    /// Byte that ends the session, if any.
    pub quit_byte: Option<u8>,
    /// What the quit byte does.
    pub quit_action: QuitAction,
    /// Put the terminal in raw mode during bootstrap.
    pub raw_mode: bool,
    /// Enable SGR mouse reporting during bootstrap.
    pub mouse_capture: bool,
    /// Pixel sampling stride for the default ANSI sink.
    pub stride: u32,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            frame_interval: Duration::from_millis(100),
            poll_timeout: Duration::from_millis(10),
            quit_byte: Some(b'x'),
            quit_action: QuitAction::Exit,
            raw_mode: true,
            mouse_capture: true,
            stride: 1,
        }
    }
}

/// Process-wide state of the local backend: terminal mode and input source.
pub struct LocalSession {
    config: LocalConfig,
    source: Receiver<Vec<u8>>,
    guard: Option<TerminalGuard>,
}

impl LocalSession {
    /// Prepare the terminal and start reading stdin.
    ///
    /// Call once per process. The terminal is restored by
    /// [`finalize`](Self::finalize) or when the session is dropped.
    pub fn bootstrap(config: LocalConfig) -> Result<Self> {
        let guard = if config.raw_mode {
            Some(TerminalGuard::enable(config.mouse_capture)?)
        } else {
            None
        };
        let source = stdin::stdin_chunks()?;
        Ok(Self {
            config,
            source,
            guard,
        })
    }

    /// Session fed from `source` instead of the terminal.
    pub const fn with_source(config: LocalConfig, source: Receiver<Vec<u8>>) -> Self {
        Self {
            config,
            source,
            guard: None,
        }
    }

    /// The session's configuration.
    pub const fn config(&self) -> &LocalConfig {
        &self.config
    }

    /// Create a window drawn with true-colour half blocks on stdout.
    pub fn create(&self, width: u32, height: u32) -> Result<Window<LocalBackend>> {
        let sink = AnsiSink::stdout().with_stride(self.config.stride);
        self.create_with_sink(width, height, Box::new(sink))
    }

    /// Create a window presenting through `sink`.
    pub fn create_with_sink(
        &self,
        width: u32,
        height: u32,
        sink: Box<dyn FrameSink>,
    ) -> Result<Window<LocalBackend>> {
        let pixels = PixelBuffer::new(width, height)?;
        let hooks = HookSlot::new(WindowInfo { width, height });
        let signals = Arc::new(Signals::new());

        let debouncer = KeyDebouncer::spawn(
            self.config.debounce,
            hooks.clone(),
            self.config.poll_timeout,
        )?;
        let reader = KeyReaderActor::spawn(ReaderContext {
            source: self.source.clone(),
            debouncer,
            hooks: hooks.clone(),
            signals: signals.clone(),
            quit_byte: self.config.quit_byte,
            quit_action: self.config.quit_action,
            mouse_capture: self.guard.as_ref().is_some_and(TerminalGuard::mouse),
            poll_timeout: self.config.poll_timeout,
        })?;

        info!("local window {width}x{height} created");
        let backend = LocalBackend {
            sink,
            reader: Some(reader),
            signals,
            frame_interval: self.config.frame_interval,
            last_tick: Instant::now(),
        };
        Ok(Window::from_parts(pixels, hooks, backend))
    }

    /// Restore the terminal.
    pub fn finalize(self) {
        drop(self);
    }
}

impl std::fmt::Debug for LocalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSession")
            .field("config", &self.config)
            .field("terminal", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Backend drawing to a [`FrameSink`] and reading the local input stream.
pub struct LocalBackend {
    sink: Box<dyn FrameSink>,
    reader: Option<KeyReaderActor>,
    signals: Arc<Signals>,
    frame_interval: Duration,
    last_tick: Instant,
}

impl LocalBackend {
    /// Last reported pointer position, without waiting.
    pub fn mouse(&self) -> (i32, i32) {
        self.signals.mouse()
    }

    /// Whether the input stream is still being read.
    pub fn is_reading(&self) -> bool {
        self.reader.is_some() && !self.signals.is_closed()
    }
}

impl Backend for LocalBackend {
    fn present(&mut self, pixels: &PixelBuffer) -> Result<()> {
        self.sink.draw(pixels)?;
        Ok(())
    }

    /// The terminal streams pointer reports on its own, so any report
    /// counts as fresh; this only blocks until the first one arrives.
    fn query_mouse(&mut self) -> Result<(i32, i32)> {
        self.signals.wait_any_sample(None)
    }

    fn wait_for_tick(&mut self) -> Result<()> {
        let next = self.last_tick + self.frame_interval;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        self.last_tick = Instant::now();
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.join();
        }
        self.signals.close();
    }
}
