//! Error type shared by every backend.

use std::io;
use thiserror::Error;

/// Errors reported by windows and their backends.
///
/// Setup and transport faults are surfaced here instead of aborting the
/// process; callers decide whether to continue. The demos treat every one
/// of them except [`Error::OutOfBounds`] as fatal.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying terminal or socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The peer sent something other than a valid `Init` during setup.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A bounds-checked pixel write fell outside the buffer.
    #[error("pixel ({x}, {y}) outside {width}x{height} window")]
    OutOfBounds {
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Window width.
        width: u32,
        /// Window height.
        height: u32,
    },

    /// A key code beyond the tracked key space.
    #[error("key code {0} outside supported range")]
    KeyOutOfRange(u32),

    /// Unrecognized tag byte on the wire.
    #[error("unknown message tag 0x{0:02x}")]
    UnknownTag(u8),

    /// A blit announced a payload larger than the decoder accepts.
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),

    /// The peer closed the connection or the window was torn down.
    #[error("peer disconnected")]
    Disconnected,

    /// No reply arrived within the configured reply timeout.
    #[error("timed out waiting for peer")]
    Timeout,

    /// Width or height was zero.
    #[error("window dimensions must be non-zero")]
    ZeroSize,
}

impl Error {
    /// Whether processing can continue after this error.
    ///
    /// Only bounds violations and protocol noise are recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. } | Self::UnknownTag(_))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let oob = Error::OutOfBounds { x: 4, y: 0, width: 4, height: 4 };
        assert!(oob.is_recoverable());
        assert!(Error::UnknownTag(b'?').is_recoverable());
        assert!(!Error::Disconnected.is_recoverable());
        assert!(!Error::KeyOutOfRange(300).is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let oob = Error::OutOfBounds { x: 10, y: 2, width: 10, height: 5 };
        assert_eq!(oob.to_string(), "pixel (10, 2) outside 10x5 window");
        assert_eq!(Error::UnknownTag(0x7a).to_string(), "unknown message tag 0x7a");
    }
}
