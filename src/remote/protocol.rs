//! Wire format of the remote stream.
//!
//! Every message is a one-byte tag followed by fixed fields. Integers are
//! 32-bit big-endian. Blit payloads are the pixel buffer as little-endian
//! `u32`s, prefixed by their byte length.
//!
//! | Tag   | Direction       | Payload                     |
//! |-------|-----------------|-----------------------------|
//! | `R`   | server → client | width: u32, height: u32     |
//! | `b`   | server → client | length: u32, `length` bytes |
//! | `m`   | server → client | (none)                      |
//! | `M`   | client → server | x: i32, y: i32              |
//! | `K`   | client → server | code: i32 (pressed)         |
//! | `k`   | client → server | code: i32 (released)        |

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};
use std::io::{self, Read, Write};

/// Handshake carrying the window size.
pub const TAG_INIT: u8 = b'R';
/// Full pixel-buffer blit.
pub const TAG_BLIT: u8 = b'b';
/// Request for a mouse sample.
pub const TAG_MOUSE_QUERY: u8 = b'm';
/// Mouse sample reply.
pub const TAG_MOUSE_SAMPLE: u8 = b'M';
/// Key pressed.
pub const TAG_KEY_DOWN: u8 = b'K';
/// Key released.
pub const TAG_KEY_UP: u8 = b'k';

/// Largest blit payload a decoder accepts (a 4096x4096 frame).
pub const MAX_BLIT_BYTES: usize = 4096 * 4096 * 4;

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Window size announcement sent once after connecting.
    Init {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Full frame: little-endian `u32` pixels, row-major.
    Blit {
        /// Raw payload bytes.
        pixels: Vec<u8>,
    },
    /// Ask the client for the pointer position.
    MouseQuery,
    /// Pointer position reply.
    MouseSample {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },
    /// Key or button transition.
    Key {
        /// Key code.
        code: i32,
        /// `true` for press, `false` for release.
        pressed: bool,
    },
}

impl Message {
    /// Tag byte this message is framed with.
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Init { .. } => TAG_INIT,
            Self::Blit { .. } => TAG_BLIT,
            Self::MouseQuery => TAG_MOUSE_QUERY,
            Self::MouseSample { .. } => TAG_MOUSE_SAMPLE,
            Self::Key { pressed: true, .. } => TAG_KEY_DOWN,
            Self::Key { pressed: false, .. } => TAG_KEY_UP,
        }
    }

    /// Append the framed message to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        match self {
            Self::Init { width, height } => {
                out.extend_from_slice(&width.to_be_bytes());
                out.extend_from_slice(&height.to_be_bytes());
            }
            Self::Blit { pixels } => {
                put_len(out, pixels.len());
                out.extend_from_slice(pixels);
            }
            Self::MouseQuery => {}
            Self::MouseSample { x, y } => {
                out.extend_from_slice(&x.to_be_bytes());
                out.extend_from_slice(&y.to_be_bytes());
            }
            Self::Key { code, .. } => out.extend_from_slice(&code.to_be_bytes()),
        }
    }

    /// Write the framed message in one `write_all`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        let mut out = Vec::new();
        self.encode(&mut out);
        writer.write_all(&out)
    }

    /// Read one complete message.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        Self::read_body(tag[0], reader)
    }

    /// Read the fields following an already-consumed `tag`.
    ///
    /// An unknown tag consumes nothing further and yields
    /// [`Error::UnknownTag`].
    pub fn read_body<R: Read + ?Sized>(tag: u8, reader: &mut R) -> Result<Self> {
        Ok(match tag {
            TAG_INIT => Self::Init {
                width: read_u32(reader)?,
                height: read_u32(reader)?,
            },
            TAG_BLIT => {
                let len = read_u32(reader)? as usize;
                if len > MAX_BLIT_BYTES {
                    return Err(Error::FrameTooLarge(len));
                }
                let mut pixels = vec![0u8; len];
                reader.read_exact(&mut pixels)?;
                Self::Blit { pixels }
            }
            TAG_MOUSE_QUERY => Self::MouseQuery,
            TAG_MOUSE_SAMPLE => Self::MouseSample {
                x: read_i32(reader)?,
                y: read_i32(reader)?,
            },
            TAG_KEY_DOWN | TAG_KEY_UP => Self::Key {
                code: read_i32(reader)?,
                pressed: tag == TAG_KEY_DOWN,
            },
            other => return Err(Error::UnknownTag(other)),
        })
    }

    /// Decode a blit payload back into pixels.
    ///
    /// Returns `None` for payloads that are not a whole number of pixels.
    pub fn blit_pixels(&self) -> Option<Vec<u32>> {
        let Self::Blit { pixels } = self else {
            return None;
        };
        if pixels.len() % 4 != 0 {
            return None;
        }
        Some(
            pixels
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }
}

/// Append a blit of `pixels` to `out` without an intermediate copy.
pub fn encode_blit(pixels: &PixelBuffer, out: &mut Vec<u8>) {
    out.push(TAG_BLIT);
    put_len(out, pixels.byte_len());
    pixels.write_le_bytes(out);
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    // Buffers above 4 GiB cannot be framed; sizes are bounded by u32 dimensions
    // and MAX_BLIT_BYTES on the receiving side.
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    out.extend_from_slice(&len.to_be_bytes());
}

fn read_u32<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i32<R: Read + ?Sized>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}
