//! # Pixwin
//!
//! Pixel-buffer windows presented through interchangeable backends.
//!
//! A [`Window`] owns a dense framebuffer; its [`Backend`] delivers frames to
//! a display sink and feeds input back to a caller-supplied hook from a
//! background thread.
//!
//! ## Backends
//!
//! - **Local** ([`local`]): draws on the controlling terminal and parses the
//!   terminal's input stream. Keys only report activity, so releases are
//!   synthesized after a debounce interval.
//! - **Remote** ([`remote`]): streams frames to a peer over TCP and receives
//!   key and mouse events back over the same connection.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pixwin::remote::RemoteServer;
//! use pixwin::COLOR_WHITE;
//!
//! # fn main() -> pixwin::Result<()> {
//! let server = RemoteServer::bootstrap_default()?;
//! let mut window = server.create(320, 240)?;
//! window.install_input_hook(|_, code, pressed| {
//!     println!("key {code} {}", if pressed { "down" } else { "up" });
//! });
//!
//! loop {
//!     window.set_pixel(10, 10, COLOR_WHITE);
//!     window.present()?;
//!     window.wait_for_tick()?;
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod buffer;
pub mod error;
pub mod input;
pub mod local;
pub mod remote;
pub mod signal;
pub mod window;

// Re-exports for convenience
pub use buffer::{Color, PixelBuffer, Rgb, COLOR_BLACK, COLOR_BLUE, COLOR_GREEN, COLOR_RED, COLOR_WHITE};
pub use error::{Error, Result};
pub use input::{HookSlot, InputHook, KeyCode, MOUSE_LEFT, MOUSE_MIDDLE, MOUSE_RIGHT};
pub use local::{LocalBackend, LocalConfig, LocalSession, QuitAction};
pub use remote::{FrameWaitPolicy, RemoteBackend, RemoteClient, RemoteConfig, RemoteServer};
pub use window::{Backend, Window, WindowInfo};
