//! Peer side of the remote stream.
//!
//! Connects to a [`RemoteServer`](super::RemoteServer), reads the size
//! announcement, then receives frames and mouse queries while sending key
//! and pointer events back.

use super::protocol::Message;
use crate::error::{Error, Result};
use log::info;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};

/// A connected display peer.
#[derive(Debug)]
pub struct RemoteClient {
    stream: TcpStream,
    width: u32,
    height: u32,
}

impl RemoteClient {
    /// Connect and complete the handshake.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        match Message::read_from(&mut stream) {
            Ok(Message::Init { width, height }) => {
                info!("server window is {width}x{height}");
                Ok(Self {
                    stream,
                    width,
                    height,
                })
            }
            Ok(other) => Err(Error::Handshake(format!(
                "expected init, got {:?}",
                other.tag() as char
            ))),
            Err(e) => Err(Error::Handshake(e.to_string())),
        }
    }

    /// Announced window width.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Announced window height.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Block for the next message from the server.
    pub fn recv(&mut self) -> Result<Message> {
        Message::read_from(&mut self.stream)
    }

    /// Report a key or button transition.
    pub fn send_key(&mut self, code: i32, pressed: bool) -> Result<()> {
        Message::Key { code, pressed }.write_to(&mut self.stream)?;
        Ok(())
    }

    /// Report the pointer position.
    pub fn send_mouse(&mut self, x: i32, y: i32) -> Result<()> {
        Message::MouseSample { x, y }.write_to(&mut self.stream)?;
        Ok(())
    }

    /// Send raw bytes; lets tests inject malformed traffic.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    /// Second handle on the same connection, e.g. for a sending thread.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            stream: self.stream.try_clone()?,
            width: self.width,
            height: self.height,
        })
    }
}
