//! Bouncer: a ball bouncing inside a bordered window.
//!
//! WASD pushes the ball, holding the left mouse button draws a line from the
//! ball to the pointer. Runs on the terminal by default; pass `remote` to
//! serve the window on port 7777 instead (see the `viewer` demo).
//!
//! ```text
//! cargo run --example bouncer
//! cargo run --example bouncer -- remote
//! ```

use pixwin::local::{LocalConfig, LocalSession};
use pixwin::remote::RemoteServer;
use pixwin::{Backend, Color, KeyCode, Window, COLOR_BLACK, COLOR_BLUE, COLOR_RED, COLOR_WHITE, MOUSE_LEFT};
use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 96;
const RADIUS: i32 = 8;
const FRAMES: u32 = 600;

type Held = Arc<Mutex<HashSet<KeyCode>>>;

fn main() -> ExitCode {
    let remote = std::env::args().nth(1).is_some_and(|arg| arg == "remote");

    let result = if remote {
        RemoteServer::bootstrap_default().and_then(|server| {
            let window = server.create(WIDTH, HEIGHT)?;
            server.finalize();
            run(window)
        })
    } else {
        LocalSession::bootstrap(LocalConfig::default()).and_then(|session| {
            let window = session.create(WIDTH, HEIGHT)?;
            let fps = run(window);
            session.finalize();
            fps
        })
    };

    match result {
        Ok(fps) => {
            println!("done, {fps:.1} fps");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("bouncer: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run<B: Backend>(mut window: Window<B>) -> pixwin::Result<f64> {
    let held: Held = Arc::default();
    let keys = held.clone();
    window.install_input_hook(move |_, code, pressed| {
        let mut keys = keys.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if pressed {
            keys.insert(code);
        } else {
            keys.remove(&code);
        }
    });

    let (mut x, mut y) = (WIDTH as i32 / 2, HEIGHT as i32 / 2);
    let (mut dx, mut dy) = (2, 1);

    for _ in 0..FRAMES {
        let (drawing, push) = {
            let keys = held.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let push = |code: u8| i32::from(keys.contains(&KeyCode::from(code)));
            (
                keys.contains(&MOUSE_LEFT),
                (push(b'd') - push(b'a'), push(b's') - push(b'w')),
            )
        };

        dx = (dx + push.0).clamp(-4, 4);
        dy = (dy + push.1).clamp(-4, 4);
        x += dx;
        y += dy;
        if x - RADIUS <= 0 || x + RADIUS >= WIDTH as i32 - 1 {
            dx = -dx;
            x = x.clamp(RADIUS + 1, WIDTH as i32 - RADIUS - 2);
        }
        if y - RADIUS <= 0 || y + RADIUS >= HEIGHT as i32 - 1 {
            dy = -dy;
            y = y.clamp(RADIUS + 1, HEIGHT as i32 - RADIUS - 2);
        }

        window.pixels_mut().fill(COLOR_BLACK);
        draw_border(&mut window, COLOR_WHITE);
        draw_circle(&mut window, x, y, RADIUS, COLOR_RED);
        if drawing {
            let (mx, my) = window.query_mouse()?;
            draw_line(&mut window, (x, y), (mx, my), COLOR_BLUE);
        }

        window.present()?;
        window.wait_for_tick()?;
    }

    let fps = window.fps();
    window.destroy();
    Ok(fps)
}

fn plot<B: Backend>(window: &mut Window<B>, x: i32, y: i32, color: Color) {
    if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
        let _ = window.set_pixel_safe(x, y, color);
    }
}

fn draw_border<B: Backend>(window: &mut Window<B>, color: Color) {
    let (w, h) = (window.width(), window.height());
    for x in 0..w {
        window.set_pixel(x, 0, color);
        window.set_pixel(x, h - 1, color);
    }
    for y in 0..h {
        window.set_pixel(0, y, color);
        window.set_pixel(w - 1, y, color);
    }
}

/// Filled circle.
fn draw_circle<B: Backend>(window: &mut Window<B>, cx: i32, cy: i32, r: i32, color: Color) {
    for y in -r..=r {
        for x in -r..=r {
            if x * x + y * y <= r * r {
                plot(window, cx + x, cy + y, color);
            }
        }
    }
}

/// Bresenham.
fn draw_line<B: Backend>(window: &mut Window<B>, from: (i32, i32), to: (i32, i32), color: Color) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        plot(window, x, y, color);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
