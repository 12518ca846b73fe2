//! Process-wide stdin reader.
//!
//! A blocking read on stdin cannot be interrupted, so one detached thread
//! owns stdin for the life of the process and forwards raw chunks over a
//! channel. Consumers poll the channel with a timeout and stay joinable.

use crossbeam_channel::{bounded, Receiver};
use log::{debug, error};
use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};
use std::thread;

static STDIN: Mutex<Option<Receiver<Vec<u8>>>> = Mutex::new(None);

/// Receiver of raw stdin chunks, starting the reader thread on first use.
///
/// The channel disconnects when stdin reaches end of file.
pub fn stdin_chunks() -> io::Result<Receiver<Vec<u8>>> {
    let mut slot = STDIN.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(rx) = slot.as_ref() {
        return Ok(rx.clone());
    }

    let (tx, rx) = bounded::<Vec<u8>>(64);
    thread::Builder::new()
        .name("pixwin-stdin".to_string())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => {
                        debug!("stdin closed");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        error!("cannot read from stdin: {e}");
                        break;
                    }
                }
            }
        })?;

    *slot = Some(rx.clone());
    Ok(rx)
}
