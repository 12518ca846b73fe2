//! Remote backend driven end to end over a loopback connection.

use pixwin::remote::{
    FrameWaitPolicy, Message, RemoteBackend, RemoteClient, RemoteConfig, RemoteServer,
};
use pixwin::{Error, KeyCode, Window, WindowInfo};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Events = Arc<Mutex<Vec<(KeyCode, bool)>>>;

/// Create a window and connect `client` to it from another thread.
fn connect<T, F>(
    config: RemoteConfig,
    width: u32,
    height: u32,
    client: F,
) -> (Window<RemoteBackend>, JoinHandle<T>)
where
    T: Send + 'static,
    F: FnOnce(RemoteClient) -> T + Send + 'static,
{
    let server = RemoteServer::bootstrap("127.0.0.1:0", config).unwrap();
    let addr = server.local_addr().unwrap();
    let peer = thread::spawn(move || client(RemoteClient::connect(addr).unwrap()));
    let window = server.create(width, height).unwrap();
    server.finalize();
    (window, peer)
}

fn bounded() -> RemoteConfig {
    RemoteConfig {
        reply_timeout: Some(Duration::from_secs(5)),
        ..RemoteConfig::default()
    }
}

fn record(window: &mut Window<RemoteBackend>) -> Events {
    let events: Events = Arc::default();
    let sink = events.clone();
    window.install_input_hook(move |_, code, pressed| sink.lock().unwrap().push((code, pressed)));
    events
}

/// Answer each mouse query with the next sample, until the server hangs up.
fn answer_queries(mut client: RemoteClient, samples: &[(i32, i32)]) -> usize {
    let mut answered = 0;
    while let Ok(message) = client.recv() {
        if message == Message::MouseQuery {
            let (x, y) = samples[answered.min(samples.len() - 1)];
            if client.send_mouse(x, y).is_err() {
                break;
            }
            answered += 1;
        }
    }
    answered
}

/// Send key activity every few milliseconds until the connection fails.
fn chatter(mut client: RemoteClient) {
    for _ in 0..1000 {
        if client.send_key(1, true).is_err() {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_handshake_announces_size() {
    let (window, peer) = connect(bounded(), 64, 48, |client| client);
    let client = peer.join().unwrap();
    assert_eq!((client.width(), client.height()), (64, 48));
    assert_eq!(window.info(), WindowInfo { width: 64, height: 48 });
    assert!(window.backend().is_connected());
    window.destroy();
}

#[test]
fn test_query_mouse_answers_each_query() {
    let (mut window, peer) = connect(bounded(), 8, 8, |client| {
        answer_queries(client, &[(5, 9), (6, 10)])
    });

    assert_eq!(window.query_mouse().unwrap(), (5, 9));
    assert_eq!(window.query_mouse().unwrap(), (6, 10));

    window.destroy();
    assert_eq!(peer.join().unwrap(), 2);
}

#[test]
fn test_second_query_blocks_until_next_sample() {
    let (mut window, peer) = connect(bounded(), 8, 8, |mut client| {
        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        client.send_mouse(5, 9).unwrap();
        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        thread::sleep(Duration::from_millis(100));
        client.send_mouse(6, 10).unwrap();
        answer_queries(client, &[(6, 10)])
    });

    assert_eq!(window.query_mouse().unwrap(), (5, 9));
    assert!(window.backend().pending().is_empty());

    let started = Instant::now();
    assert_eq!(window.query_mouse().unwrap(), (6, 10));
    assert!(started.elapsed() >= Duration::from_millis(90));
    assert!(window.backend().pending().is_empty());

    window.destroy();
    peer.join().unwrap();
}

#[test]
fn test_late_reply_is_not_taken_for_the_next_one() {
    let config = RemoteConfig {
        reply_timeout: Some(Duration::from_millis(200)),
        ..RemoteConfig::default()
    };
    let (mut window, peer) = connect(config, 8, 8, |mut client| {
        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        thread::sleep(Duration::from_millis(300));
        client.send_mouse(1, 1).unwrap();
        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        thread::sleep(Duration::from_millis(20));
        client.send_mouse(2, 2).unwrap();
        answer_queries(client, &[(3, 3)])
    });

    assert!(matches!(window.query_mouse(), Err(Error::Timeout)));
    assert_eq!(window.query_mouse().unwrap(), (2, 2));
    assert_eq!(window.query_mouse().unwrap(), (3, 3));
    assert!(window.backend().pending().is_empty());

    window.destroy();
    peer.join().unwrap();
}

#[test]
fn test_key_events_reach_hook_in_order() {
    let (mut window, peer) = connect(bounded(), 8, 8, |mut client| {
        // Wait for the query so the hook is installed before keys arrive.
        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        client.send_key(97, true).unwrap();
        client.send_key(0, true).unwrap();
        client.send_key(97, false).unwrap();
        client.send_mouse(1, 1).unwrap();
        answer_queries(client, &[(1, 1)])
    });
    let events = record(&mut window);

    // The sample follows the keys on the stream, so they were dispatched first.
    assert_eq!(window.query_mouse().unwrap(), (1, 1));
    assert_eq!(*events.lock().unwrap(), vec![(97, true), (0, true), (97, false)]);

    window.destroy();
    peer.join().unwrap();
}

#[test]
fn test_unknown_tag_is_skipped() {
    let (mut window, peer) = connect(bounded(), 8, 8, |mut client| {
        // The frame wait is already pending once the blit arrives.
        assert!(matches!(client.recv().unwrap(), Message::Blit { .. }));
        thread::sleep(Duration::from_millis(50));
        client.send_raw(b"Z").unwrap();

        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        client.send_raw(b"Z").unwrap();
        client.send_key(5, true).unwrap();
        client.send_mouse(3, 4).unwrap();
        answer_queries(client, &[(3, 4)])
    });
    let events = record(&mut window);

    window.present().unwrap();
    let started = Instant::now();
    window.wait_for_tick().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(window.query_mouse().unwrap(), (3, 4));
    assert_eq!(*events.lock().unwrap(), vec![(5, true)]);
    assert!(window.backend().is_connected());

    window.destroy();
    peer.join().unwrap();
}

#[test]
fn test_frame_wait_released_by_inbound_traffic() {
    let (mut window, peer) = connect(bounded(), 8, 8, chatter);

    for _ in 0..3 {
        window.wait_for_tick().unwrap();
    }
    assert!(window.fps() > 0.0);

    window.destroy();
    peer.join().unwrap();
}

#[test]
fn test_frame_wait_mouse_sample_policy_ignores_keys() {
    let config = RemoteConfig {
        reply_timeout: Some(Duration::from_millis(200)),
        frame_wait: FrameWaitPolicy::MouseSample,
        ..RemoteConfig::default()
    };
    let (mut window, peer) = connect(config, 8, 8, chatter);

    let started = Instant::now();
    assert!(matches!(window.wait_for_tick(), Err(Error::Timeout)));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(window.backend().is_connected());

    window.destroy();
    peer.join().unwrap();
}

#[test]
fn test_present_streams_whole_buffer() {
    let (mut window, peer) = connect(bounded(), 4, 3, |mut client| loop {
        match client.recv().unwrap() {
            blit @ Message::Blit { .. } => break blit.blit_pixels().unwrap(),
            _ => continue,
        }
    });

    window.set_pixel(0, 0, 0x00ff_0000);
    window.set_pixel(3, 2, 0x0000_00ff);
    window.set_pixel_safe(1, 1, 0x0012_3456).unwrap();
    window.present().unwrap();

    let received = peer.join().unwrap();
    assert_eq!(received, window.pixels().pixels());
    assert_eq!(received[0], 0x00ff_0000);
    assert_eq!(received[11], 0x0000_00ff);
    window.destroy();
}

#[test]
fn test_peer_disconnect_fails_waits() {
    let (mut window, peer) = connect(bounded(), 8, 8, drop);
    peer.join().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while window.backend().is_connected() {
        assert!(Instant::now() < deadline, "receiver never noticed the disconnect");
        thread::sleep(Duration::from_millis(5));
    }

    assert!(matches!(window.wait_for_tick(), Err(Error::Disconnected)));
    window.destroy();
}

#[test]
fn test_no_callbacks_after_destroy() {
    let (mut window, peer) = connect(bounded(), 8, 8, chatter);
    let events = record(&mut window);

    let deadline = Instant::now() + Duration::from_secs(5);
    while events.lock().unwrap().len() < 3 {
        assert!(Instant::now() < deadline, "no key events arrived");
        thread::sleep(Duration::from_millis(5));
    }

    window.destroy();
    let seen = events.lock().unwrap().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(events.lock().unwrap().len(), seen);
    peer.join().unwrap();
}

#[test]
fn test_panicking_hook_releases_waiters() {
    let (mut window, peer) = connect(bounded(), 8, 8, |mut client| {
        assert_eq!(client.recv().unwrap(), Message::MouseQuery);
        client.send_key(7, true).unwrap();
        // Never answers the query; the receiver is gone by now.
        while client.recv().is_ok() {}
    });
    window.install_input_hook(|_, _, _| panic!("hook failed"));

    assert!(matches!(window.query_mouse(), Err(Error::Disconnected)));
    assert!(!window.backend().is_connected());

    window.destroy();
    peer.join().unwrap();
}
