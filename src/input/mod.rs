//! Input delivery: the caller's hook and the codes it receives.
//!
//! Backends translate whatever their transport reports into
//! `(code, pressed)` pairs and push them through a [`HookSlot`]. The slot
//! is shared between the window (which installs and closes it) and the
//! backend's background threads (which invoke it).

mod hook;

pub use hook::{HookSlot, InputHook};

/// Code type carried by every input callback.
///
/// Plain keys use their byte value; mouse buttons use the SGR button
/// number (see [`MOUSE_LEFT`] and friends).
pub type KeyCode = i32;

/// Number of distinct key codes the local backend tracks.
pub const KEY_CODE_LIMIT: usize = 256;

/// Left mouse button.
pub const MOUSE_LEFT: KeyCode = 0;
/// Middle mouse button.
pub const MOUSE_MIDDLE: KeyCode = 1;
/// Right mouse button.
pub const MOUSE_RIGHT: KeyCode = 2;
