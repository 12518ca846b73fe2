//! Key-release synthesis for streams that only report key activity.
//!
//! A key is considered pressed on the first activity after a quiet period
//! longer than the debounce interval, and released once the interval
//! passes with no further activity. Releases are driven by one scheduler
//! thread holding a deadline heap; refreshing a key replaces its deadline,
//! which cancels the earlier one.

use crate::error::{Error, Result};
use crate::input::{HookSlot, KeyCode, KEY_CODE_LIMIT};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default debounce interval.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Per-key record, reused for the lifetime of the debouncer.
#[derive(Debug, Clone, Copy)]
struct KeyState {
    /// Time of the most recent activity.
    last_activity: Option<Instant>,
    /// Whether the current burst has been released (or none started).
    released: bool,
}

/// Key records plus what is needed to fire callbacks for them.
struct KeyTable {
    keys: Box<[Mutex<KeyState>]>,
    delta: Duration,
    hooks: HookSlot,
}

impl KeyTable {
    fn new(delta: Duration, hooks: HookSlot) -> Self {
        let keys = (0..KEY_CODE_LIMIT)
            .map(|_| {
                Mutex::new(KeyState {
                    last_activity: None,
                    released: true,
                })
            })
            .collect();
        Self { keys, delta, hooks }
    }

    fn lock(&self, code: usize) -> MutexGuard<'_, KeyState> {
        self.keys[code].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire the release for `code` if it has been quiet for a full interval.
    fn try_release(&self, code: usize, now: Instant) {
        let mut key = self.lock(code);
        let quiet = key
            .last_activity
            .is_some_and(|last| now.saturating_duration_since(last) >= self.delta);
        if quiet && !key.released {
            key.released = true;
            trace!("key {code} released");
            self.hooks.invoke(code as KeyCode, false);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    code: usize,
    at: Instant,
}

/// Tracks key activity and synthesizes press/release callbacks.
///
/// Press callbacks run on the thread calling [`activity`](Self::activity);
/// release callbacks run on the scheduler thread. Both are issued while
/// holding the key's lock, so a key's press always precedes its release.
pub struct KeyDebouncer {
    table: Arc<KeyTable>,
    schedule: Sender<Deadline>,
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl KeyDebouncer {
    /// Spawn the release scheduler.
    ///
    /// # Arguments
    ///
    /// * `delta` - Debounce interval.
    /// * `hooks` - Where press/release callbacks go.
    /// * `poll_timeout` - Longest the scheduler sleeps before checking shutdown.
    pub fn spawn(delta: Duration, hooks: HookSlot, poll_timeout: Duration) -> Result<Self> {
        let table = Arc::new(KeyTable::new(delta, hooks));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (schedule, deadlines) = unbounded();

        let handle = {
            let table = table.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("pixwin-release".to_string())
                .spawn(move || Self::run_loop(&table, &deadlines, &shutdown, poll_timeout))?
        };

        Ok(Self {
            table,
            schedule,
            handle: Some(handle),
            shutdown,
        })
    }

    /// Debounce interval in use.
    pub fn delta(&self) -> Duration {
        self.table.delta
    }

    /// Record activity on `code`.
    ///
    /// Fires a press if the key had been quiet for longer than the
    /// interval. If the previous burst has not been released yet (the
    /// scheduler is running late), its release fires first.
    pub fn activity(&self, code: u32) -> Result<()> {
        let index = code as usize;
        if index >= KEY_CODE_LIMIT {
            return Err(Error::KeyOutOfRange(code));
        }

        let now = Instant::now();
        let mut key = self.table.lock(index);
        let fresh = key
            .last_activity
            .map_or(true, |last| now.saturating_duration_since(last) > self.table.delta);
        key.last_activity = Some(now);

        if fresh {
            if !key.released {
                self.table.hooks.invoke(index as KeyCode, false);
            }
            key.released = false;
            trace!("key {index} pressed");
            self.table.hooks.invoke(index as KeyCode, true);
        }
        drop(key);

        // The scheduler only exits on shutdown, after which nothing is delivered.
        let _ = self.schedule.send(Deadline {
            code: index,
            at: now + self.table.delta,
        });
        Ok(())
    }

    /// Signal the scheduler to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the scheduler and wait for it.
    pub fn join(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main scheduler loop.
    fn run_loop(
        table: &KeyTable,
        deadlines: &Receiver<Deadline>,
        shutdown: &AtomicBool,
        poll_timeout: Duration,
    ) {
        debug!("release scheduler started");
        let mut heap: BinaryHeap<Reverse<(Instant, usize)>> = BinaryHeap::new();
        // Latest deadline per key; older heap entries are stale.
        let mut latest: Vec<Option<Instant>> = vec![None; KEY_CODE_LIMIT];

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let now = Instant::now();
            let wait = heap
                .peek()
                .map_or(poll_timeout, |Reverse((at, _))| {
                    at.saturating_duration_since(now).min(poll_timeout)
                });

            match deadlines.recv_timeout(wait) {
                Ok(first) => {
                    for deadline in std::iter::once(first).chain(deadlines.try_iter()) {
                        latest[deadline.code] = Some(deadline.at);
                        heap.push(Reverse((deadline.at, deadline.code)));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            while let Some(&Reverse((at, code))) = heap.peek() {
                if at > now {
                    break;
                }
                heap.pop();
                if latest[code] == Some(at) {
                    latest[code] = None;
                    table.try_release(code, now);
                }
            }
        }
        debug!("release scheduler stopped");
    }
}

impl Drop for KeyDebouncer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowInfo;

    type Log = Arc<Mutex<Vec<(KeyCode, bool, Instant)>>>;

    fn recording_slot() -> (HookSlot, Log) {
        let slot = HookSlot::new(WindowInfo { width: 1, height: 1 });
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        slot.install(Arc::new(move |_: &WindowInfo, code: KeyCode, pressed: bool| {
            sink.lock().unwrap().push((code, pressed, Instant::now()));
        }));
        (slot, log)
    }

    fn spawn(slot: HookSlot) -> KeyDebouncer {
        KeyDebouncer::spawn(DEFAULT_DEBOUNCE, slot, Duration::from_millis(5)).unwrap()
    }

    fn sleep_until(start: Instant, offset_ms: u64) {
        let target = start + Duration::from_millis(offset_ms);
        thread::sleep(target.saturating_duration_since(Instant::now()));
    }

    #[test]
    fn test_single_burst_one_press_one_release() {
        let (slot, log) = recording_slot();
        let debouncer = spawn(slot);

        let start = Instant::now();
        debouncer.activity(u32::from(b'w')).unwrap();
        sleep_until(start, 50);
        debouncer.activity(u32::from(b'w')).unwrap();
        sleep_until(start, 120);
        debouncer.activity(u32::from(b'w')).unwrap();

        sleep_until(start, 210);
        {
            let events = log.lock().unwrap();
            assert_eq!(events.len(), 1, "no release while the burst continues");
            assert_eq!((events[0].0, events[0].1), (KeyCode::from(b'w'), true));
        }

        sleep_until(start, 400);
        let events = log.lock().unwrap();
        assert_eq!(events.len(), 2);
        let (code, pressed, at) = events[1];
        assert_eq!((code, pressed), (KeyCode::from(b'w'), false));
        let offset = at.duration_since(start);
        assert!(offset >= Duration::from_millis(220), "released at {offset:?}");
        assert!(offset <= Duration::from_millis(320), "released at {offset:?}");
    }

    #[test]
    fn test_keys_are_independent() {
        let (slot, log) = recording_slot();
        let debouncer = spawn(slot);

        let start = Instant::now();
        // 'a' is held (refreshed every 40ms); 'b' is tapped once.
        for step in 0..6 {
            debouncer.activity(u32::from(b'a')).unwrap();
            if step == 1 {
                debouncer.activity(u32::from(b'b')).unwrap();
            }
            sleep_until(start, 40 * (step + 1));
        }
        sleep_until(start, 420);

        let events = log.lock().unwrap();
        let for_key = |key: u8| -> Vec<bool> {
            events
                .iter()
                .filter(|(code, _, _)| *code == KeyCode::from(key))
                .map(|(_, pressed, _)| *pressed)
                .collect()
        };
        assert_eq!(for_key(b'a'), vec![true, false]);
        assert_eq!(for_key(b'b'), vec![true, false]);

        // 'b' released while 'a' was still being refreshed.
        let b_release = events
            .iter()
            .find(|(code, pressed, _)| *code == KeyCode::from(b'b') && !pressed)
            .unwrap()
            .2;
        let a_release = events
            .iter()
            .find(|(code, pressed, _)| *code == KeyCode::from(b'a') && !pressed)
            .unwrap()
            .2;
        assert!(b_release < a_release);
    }

    #[test]
    fn test_separate_bursts_repeat_pairs() {
        let (slot, log) = recording_slot();
        let debouncer = spawn(slot);

        debouncer.activity(7).unwrap();
        thread::sleep(Duration::from_millis(250));
        debouncer.activity(7).unwrap();
        thread::sleep(Duration::from_millis(250));

        let pattern: Vec<bool> = log.lock().unwrap().iter().map(|e| e.1).collect();
        assert_eq!(pattern, vec![true, false, true, false]);
    }

    #[test]
    fn test_out_of_range_key() {
        let (slot, _log) = recording_slot();
        let debouncer = spawn(slot);
        let err = debouncer.activity(256).unwrap_err();
        assert!(matches!(err, Error::KeyOutOfRange(256)));
        assert!(debouncer.activity(255).is_ok());
    }

    #[test]
    fn test_join_drops_pending_release() {
        let (slot, log) = recording_slot();
        let debouncer = spawn(slot.clone());
        debouncer.activity(1).unwrap();
        slot.close();
        debouncer.join();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
