//! Remote-Stream Backend: a window displayed by a peer over TCP.
//!
//! The server side owns the window. It pushes full-frame blits and mouse
//! queries down the connection; the peer answers with key events and mouse
//! samples, which a receiver thread decodes.
//!
//! # Architecture
//!
//! ```text
//!  caller thread                         receiver thread
//! ┌──────────────┐  Init / Blit / 'm'   ┌──────────────┐
//! │ RemoteBackend│ ───────────────────▶ │              │
//! │ (write half) │        peer          │ReceiverActor │
//! │              │ ◀─── wait/notify ─── │ (read half)  │
//! └──────────────┘       Signals        └──────┬───────┘
//!                                              │ key events
//!                                              ▼
//!                                         input hook
//! ```

mod client;
mod protocol;
mod receiver;

pub use client::RemoteClient;
pub use protocol::{
    encode_blit, Message, MAX_BLIT_BYTES, TAG_BLIT, TAG_INIT, TAG_KEY_DOWN, TAG_KEY_UP,
    TAG_MOUSE_QUERY, TAG_MOUSE_SAMPLE,
};

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::input::HookSlot;
use crate::signal::{Pending, Signals};
use crate::window::{Backend, Window, WindowInfo};
use log::{debug, info};
use receiver::ReceiverActor;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// Port the server listens on by default.
pub const DEFAULT_PORT: u16 = 7777;

/// Which inbound messages satisfy a pending `wait_for_tick`.
///
/// The peer never acknowledges blits, so the tick is inferred from other
/// traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameWaitPolicy {
    /// Any successfully decoded message.
    #[default]
    AnyInbound,
    /// Only a mouse sample.
    MouseSample,
}

/// Configuration for the remote backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Socket read timeout of the receiver; bounds shutdown latency.
    pub poll_timeout: Duration,
    /// Give up on `query_mouse`/`wait_for_tick` after this long.
    /// `None` blocks until the peer answers or disconnects.
    pub reply_timeout: Option<Duration>,
    /// What satisfies a frame wait.
    pub frame_wait: FrameWaitPolicy,
    /// Disable Nagle's algorithm on the connection.
    pub nodelay: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            reply_timeout: None,
            frame_wait: FrameWaitPolicy::AnyInbound,
            nodelay: true,
        }
    }
}

/// Listening endpoint that windows are created on.
#[derive(Debug)]
pub struct RemoteServer {
    listener: TcpListener,
    config: RemoteConfig,
}

impl RemoteServer {
    /// Listen on `addr`.
    pub fn bootstrap<A: ToSocketAddrs>(addr: A, config: RemoteConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Self { listener, config })
    }

    /// Listen on all interfaces at [`DEFAULT_PORT`].
    pub fn bootstrap_default() -> Result<Self> {
        Self::bootstrap(("0.0.0.0", DEFAULT_PORT), RemoteConfig::default())
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The server's configuration.
    pub const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Block until one peer connects, announce the size, and start receiving.
    pub fn create(&self, width: u32, height: u32) -> Result<Window<RemoteBackend>> {
        let pixels = PixelBuffer::new(width, height)?;

        info!("waiting for client");
        let (stream, peer) = self.listener.accept()?;
        info!("client {peer} connected");
        if self.config.nodelay {
            stream.set_nodelay(true)?;
        }

        let mut writer = stream.try_clone()?;
        Message::Init { width, height }.write_to(&mut writer)?;

        let hooks = HookSlot::new(WindowInfo { width, height });
        let signals = Arc::new(Signals::new());
        let receiver = ReceiverActor::spawn(
            stream,
            hooks.clone(),
            signals.clone(),
            self.config.frame_wait,
            self.config.poll_timeout,
        )?;

        let backend = RemoteBackend {
            stream: writer,
            receiver: Some(receiver),
            signals,
            reply_timeout: self.config.reply_timeout,
            out: Vec::with_capacity(5 + pixels.byte_len()),
        };
        Ok(Window::from_parts(pixels, hooks, backend))
    }

    /// Stop listening.
    pub fn finalize(self) {
        drop(self);
    }
}

/// Backend streaming frames to a connected peer.
pub struct RemoteBackend {
    /// Write half; the receiver owns a clone for reading.
    stream: TcpStream,
    receiver: Option<ReceiverActor>,
    signals: Arc<Signals>,
    reply_timeout: Option<Duration>,
    /// Reused blit encoding buffer.
    out: Vec<u8>,
}

impl RemoteBackend {
    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Queries still waiting for the peer.
    pub fn pending(&self) -> Pending {
        self.signals.pending()
    }

    /// Whether the receiver is still running.
    pub fn is_connected(&self) -> bool {
        self.receiver.is_some() && !self.signals.is_closed()
    }

    fn send(&mut self, message: &Message) -> Result<()> {
        message.write_to(&mut self.stream)?;
        Ok(())
    }
}

impl Backend for RemoteBackend {
    fn present(&mut self, pixels: &PixelBuffer) -> Result<()> {
        self.out.clear();
        encode_blit(pixels, &mut self.out);
        self.stream.write_all(&self.out)?;
        Ok(())
    }

    fn query_mouse(&mut self) -> Result<(i32, i32)> {
        self.signals.raise(Pending::MOUSE);
        if let Err(e) = self.send(&Message::MouseQuery) {
            self.signals.clear(Pending::MOUSE);
            return Err(e);
        }
        self.signals.wait_mouse_reply(self.reply_timeout)
    }

    fn wait_for_tick(&mut self) -> Result<()> {
        self.signals.raise(Pending::FRAME);
        self.signals.wait_cleared(Pending::FRAME, self.reply_timeout)
    }

    fn shutdown(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.join();
            let _ = self.stream.shutdown(Shutdown::Both);
            debug!("connection closed");
        }
        self.signals.close();
    }
}
