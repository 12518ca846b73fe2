//! Terminal mode handling for the local backend.

use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, terminal,
};
use log::{debug, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set while this process has the terminal in raw mode.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Puts the terminal in raw mode with SGR mouse reporting; undoes it on drop.
#[derive(Debug)]
pub struct TerminalGuard {
    mouse: bool,
}

impl TerminalGuard {
    /// Enter raw mode, hide the cursor and optionally enable mouse capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal refuses any of the mode changes;
    /// whatever was already applied is rolled back first.
    pub fn enable(mouse: bool) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        ACTIVE.store(true, Ordering::SeqCst);
        let guard = Self { mouse };

        let mut stdout = io::stdout();
        execute!(stdout, cursor::Hide, terminal::Clear(terminal::ClearType::All))?;
        if mouse {
            execute!(stdout, EnableMouseCapture)?;
        }
        debug!("terminal in raw mode (mouse: {mouse})");
        Ok(guard)
    }

    /// Whether mouse capture was requested.
    pub const fn mouse(&self) -> bool {
        self.mouse
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore(self.mouse);
    }
}

/// Restore cooked mode if this process changed it. Safe to call repeatedly.
pub fn restore(mouse: bool) {
    if !ACTIVE.swap(false, Ordering::SeqCst) {
        return;
    }
    let mut stdout = io::stdout();
    if mouse {
        let _ = execute!(stdout, DisableMouseCapture);
    }
    let _ = execute!(stdout, cursor::Show);
    if let Err(e) = terminal::disable_raw_mode() {
        warn!("failed to restore terminal: {e}");
    }
}
