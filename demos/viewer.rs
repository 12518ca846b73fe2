//! Viewer: headless peer for a remote window.
//!
//! Connects to a `bouncer -- remote` server, answers mouse queries with a
//! pointer circling the window centre, holds the left button and pushes `d`
//! every other second, and prints frame statistics.
//!
//! ```text
//! cargo run --example viewer -- 127.0.0.1:7777
//! ```

use pixwin::remote::{Message, RemoteClient};
use pixwin::MOUSE_LEFT;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

const HEARTBEAT: Duration = Duration::from_millis(20);
/// Code the heartbeat releases; nothing binds it.
const IDLE_KEY: i32 = 255;

fn main() -> ExitCode {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7777".to_string());

    match run(&addr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("viewer: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(addr: &str) -> pixwin::Result<()> {
    let mut client = RemoteClient::connect(addr)?;
    let (width, height) = (client.width(), client.height());
    println!("connected to {addr}: {width}x{height}");

    client.send_key(MOUSE_LEFT, true)?;

    // The server paces frames on inbound traffic, so keep some flowing.
    let mut heartbeat = client.try_clone()?;
    thread::Builder::new()
        .name("viewer-heartbeat".to_string())
        .spawn(move || {
            while heartbeat.send_key(IDLE_KEY, false).is_ok() {
                thread::sleep(HEARTBEAT);
            }
        })?;

    let started = Instant::now();
    let mut frames = 0u64;
    let mut queries = 0u64;
    let mut lit = 0usize;

    loop {
        let message = match client.recv() {
            Ok(message) => message,
            Err(pixwin::Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };
        match message {
            Message::Blit { .. } => {
                frames += 1;
                lit = message
                    .blit_pixels()
                    .map_or(0, |pixels| pixels.iter().filter(|&&px| px != 0).count());
                match frames % 60 {
                    0 => client.send_key(i32::from(b'd'), true)?,
                    30 => client.send_key(i32::from(b'd'), false)?,
                    _ => {}
                }
            }
            Message::MouseQuery => {
                queries += 1;
                let (x, y) = pointer(frames, width, height);
                client.send_mouse(x, y)?;
            }
            other => eprintln!("viewer: unexpected {:?}", other.tag() as char),
        }
    }

    let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
    #[allow(clippy::cast_precision_loss)]
    let rate = frames as f64 / elapsed;
    println!("{frames} frames ({rate:.1}/s), {queries} mouse queries, {lit} lit pixels in last frame");
    Ok(())
}

/// Pointer position after `step` frames, circling the centre.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn pointer(step: u64, width: u32, height: u32) -> (i32, i32) {
    let angle = step as f64 / 10.0;
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    (
        (cx + angle.cos() * cx / 2.0) as i32,
        (cy + angle.sin() * cy / 2.0) as i32,
    )
}
