//! Key Reader Actor: dedicated thread decoding the local input stream.
//!
//! Raw chunks arrive from a channel (normally the process-wide stdin
//! reader). The actor parses them, feeds key activity to the debouncer,
//! forwards mouse buttons to the hook and keeps the pointer position up
//! to date. It polls the channel with a timeout so shutdown is prompt.

use super::debounce::KeyDebouncer;
use super::escape::{EscapeParser, LocalInput, MouseReport, BUTTON_SCROLL_DOWN, BUTTON_SCROLL_UP};
use super::terminal;
use super::QuitAction;
use crate::input::{HookSlot, KeyCode};
use crate::signal::{CloseOnDrop, Signals};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Everything the reader thread needs, moved into it at spawn.
pub struct ReaderContext {
    /// Raw input chunks.
    pub source: Receiver<Vec<u8>>,
    /// Release synthesis for plain keys; dropped (and joined) with the thread.
    pub debouncer: KeyDebouncer,
    /// Input hook for mouse buttons.
    pub hooks: HookSlot,
    /// Pointer position and liveness.
    pub signals: Arc<Signals>,
    /// Byte that ends the session.
    pub quit_byte: Option<u8>,
    /// What the quit byte does.
    pub quit_action: QuitAction,
    /// Whether the terminal has mouse capture enabled (restored on quit).
    pub mouse_capture: bool,
    /// How long to wait for input before checking shutdown.
    pub poll_timeout: Duration,
}

enum Flow {
    Continue,
    Stop,
}

/// Handle to the key reader thread.
pub struct KeyReaderActor {
    /// Handle to the reader thread.
    handle: Option<JoinHandle<()>>,
    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,
}

impl KeyReaderActor {
    /// Spawn the reader thread.
    pub fn spawn(context: ReaderContext) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::Builder::new()
            .name("pixwin-keys".to_string())
            .spawn(move || {
                let _close = CloseOnDrop(context.signals.clone());
                Self::run_loop(context, &shutdown_clone);
            })?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Signal the reader thread to shutdown.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the reader thread (and its debouncer) to finish.
    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main reader loop.
    #[allow(clippy::needless_pass_by_value)]
    fn run_loop(context: ReaderContext, shutdown: &AtomicBool) {
        debug!("key reader started");
        let mut parser = EscapeParser::new();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let chunk = match context.source.recv_timeout(context.poll_timeout) {
                Ok(chunk) => chunk,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("input stream closed");
                    break;
                }
            };

            for &byte in &chunk {
                // A quit byte can still end a CSI sequence; anywhere else it quits.
                let flow = if context.quit_byte == Some(byte) && !parser.in_csi() {
                    parser.reset();
                    Self::quit(&context)
                } else {
                    parser
                        .push(byte)
                        .map_or(Flow::Continue, |input| Self::dispatch(&context, input))
                };
                if let Flow::Stop = flow {
                    debug!("key reader stopped");
                    return;
                }
            }
        }

        debug!("key reader stopped");
    }

    fn dispatch(context: &ReaderContext, input: LocalInput) -> Flow {
        match input {
            LocalInput::Key(byte) => {
                // Keys are only tracked once someone is listening.
                if !context.hooks.is_installed() {
                    return Flow::Continue;
                }
                if let Err(e) = context.debouncer.activity(u32::from(byte)) {
                    error!("key tracking failed: {e}");
                    return Flow::Stop;
                }
            }
            LocalInput::Mouse(report) => Self::mouse(context, report),
        }
        Flow::Continue
    }

    fn mouse(context: &ReaderContext, report: MouseReport) {
        match report.button {
            b if report.is_button() => {
                context.hooks.invoke(b as KeyCode, report.pressed);
            }
            BUTTON_SCROLL_UP | BUTTON_SCROLL_DOWN => trace!("scroll {}", report.button),
            _ => {}
        }
        context.signals.record_mouse(report.x, report.y);
    }

    fn quit(context: &ReaderContext) -> Flow {
        match context.quit_action {
            QuitAction::Exit => {
                info!("quit requested, exiting");
                context.hooks.close();
                terminal::restore(context.mouse_capture);
                std::process::exit(0);
            }
            QuitAction::Stop => {
                info!("quit requested, input stopped");
                Flow::Stop
            }
            QuitAction::Ignore => Flow::Continue,
        }
    }
}

impl Drop for KeyReaderActor {
    fn drop(&mut self) {
        self.stop();
    }
}
