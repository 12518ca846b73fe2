//! Receiver Actor: dedicated thread decoding inbound protocol messages.
//!
//! The actor owns the read half of the connection for the window's
//! lifetime. The socket has a read timeout, so every blocking read returns
//! at least once per poll interval and the shutdown flag is observed
//! promptly, even in the middle of a message.

use super::protocol::Message;
use super::FrameWaitPolicy;
use crate::error::Error;
use crate::input::HookSlot;
use crate::signal::{CloseOnDrop, Pending, Signals};
use log::{debug, error, trace, warn};
use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reader that retries timed-out reads until shutdown is requested.
struct PatientReader<'a, R> {
    inner: R,
    shutdown: &'a AtomicBool,
}

impl<R: Read> Read for PatientReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "shutdown"));
                    }
                }
                other => return other,
            }
        }
    }
}

/// Handle to the receiver thread.
pub struct ReceiverActor {
    /// Handle to the receiver thread.
    handle: Option<JoinHandle<()>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
}

impl ReceiverActor {
    /// Spawn the receiver on `stream`, which should be a clone of the
    /// connection dedicated to reading.
    ///
    /// # Arguments
    ///
    /// * `stream` - Read half of the connection.
    /// * `hooks` - Where key events go.
    /// * `signals` - Mouse sample and outstanding-query state.
    /// * `policy` - Which messages satisfy a frame wait.
    /// * `poll_timeout` - Socket read timeout, bounding shutdown latency.
    pub fn spawn(
        stream: TcpStream,
        hooks: HookSlot,
        signals: Arc<Signals>,
        policy: FrameWaitPolicy,
        poll_timeout: Duration,
    ) -> io::Result<Self> {
        stream.set_read_timeout(Some(poll_timeout))?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::Builder::new()
            .name("pixwin-receiver".to_string())
            .spawn(move || {
                let _close = CloseOnDrop(signals.clone());
                Self::run_loop(stream, &hooks, &signals, policy, &shutdown_clone);
            })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Signal the receiver thread to shutdown.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the receiver thread to finish.
    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main receive loop.
    fn run_loop(
        stream: TcpStream,
        hooks: &HookSlot,
        signals: &Signals,
        policy: FrameWaitPolicy,
        shutdown: &AtomicBool,
    ) {
        debug!("receiver started");
        let mut reader = PatientReader {
            inner: stream,
            shutdown,
        };

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let message = match Message::read_from(&mut reader) {
                Ok(message) => message,
                Err(Error::UnknownTag(tag)) => {
                    warn!("unknown event tag 0x{tag:02x}, ignored");
                    // Still traffic from a live peer.
                    if policy == FrameWaitPolicy::AnyInbound {
                        signals.clear(Pending::FRAME);
                    }
                    continue;
                }
                Err(_) if shutdown.load(Ordering::Relaxed) => break,
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    error!("peer disconnected");
                    break;
                }
                Err(e) => {
                    error!("receive failed: {e}");
                    break;
                }
            };

            Self::dispatch(message, hooks, signals, policy);
        }
        debug!("receiver stopped");
    }

    fn dispatch(message: Message, hooks: &HookSlot, signals: &Signals, policy: FrameWaitPolicy) {
        let frame_done = match message {
            Message::Key { code, pressed } => {
                trace!("key {code} {}", if pressed { "pressed" } else { "released" });
                hooks.invoke(code, pressed);
                policy == FrameWaitPolicy::AnyInbound
            }
            Message::MouseSample { x, y } => {
                signals.record_mouse(x, y);
                true
            }
            other => {
                warn!("unexpected {:?} message from client", other.tag() as char);
                policy == FrameWaitPolicy::AnyInbound
            }
        };
        if frame_done {
            signals.clear(Pending::FRAME);
        }
    }
}

impl Drop for ReceiverActor {
    fn drop(&mut self) {
        self.stop();
    }
}
