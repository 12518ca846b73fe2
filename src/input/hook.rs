use super::KeyCode;
use crate::window::WindowInfo;
use std::sync::{Arc, PoisonError, RwLock};

/// Caller-supplied input callback.
///
/// Invoked from a backend thread with the window's geometry, the key or
/// button code, and whether it was pressed (`true`) or released (`false`).
/// Callbacks for different codes may run concurrently.
pub type InputHook = Arc<dyn Fn(&WindowInfo, KeyCode, bool) + Send + Sync>;

struct SlotState {
    hook: Option<InputHook>,
    closed: bool,
}

/// Shared, closable holder for the installed [`InputHook`].
///
/// Invocations hold a read lock for the duration of the callback, so
/// [`close`](Self::close) waits for in-flight callbacks and none start
/// afterwards.
#[derive(Clone)]
pub struct HookSlot {
    info: WindowInfo,
    state: Arc<RwLock<SlotState>>,
}

impl HookSlot {
    /// Create an empty slot for a window of the given geometry.
    pub fn new(info: WindowInfo) -> Self {
        Self {
            info,
            state: Arc::new(RwLock::new(SlotState {
                hook: None,
                closed: false,
            })),
        }
    }

    /// Install or replace the hook. Ignored once the slot is closed.
    pub fn install(&self, hook: InputHook) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.closed {
            state.hook = Some(hook);
        }
    }

    /// Invoke the hook, if one is installed and the slot is open.
    ///
    /// Returns whether a callback ran.
    pub fn invoke(&self, code: KeyCode, pressed: bool) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        match &state.hook {
            Some(hook) => {
                hook(&self.info, code, pressed);
                true
            }
            None => false,
        }
    }

    /// Whether a hook is installed.
    pub fn is_installed(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .hook
            .is_some()
    }

    /// Drop the hook and refuse all further invocations.
    pub fn close(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        state.hook = None;
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).closed
    }
}

impl std::fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSlot")
            .field("info", &self.info)
            .field("installed", &self.is_installed())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn info() -> WindowInfo {
        WindowInfo { width: 4, height: 3 }
    }

    #[test]
    fn test_invoke_without_hook() {
        let slot = HookSlot::new(info());
        assert!(!slot.invoke(b'a'.into(), true));
    }

    #[test]
    fn test_invoke_passes_arguments() {
        let slot = HookSlot::new(info());
        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = seen.clone();
        slot.install(Arc::new(move |info: &WindowInfo, code: KeyCode, pressed: bool| {
            sink.write().unwrap().push((info.width, code, pressed));
        }));

        assert!(slot.invoke(65, true));
        assert!(slot.invoke(65, false));
        assert_eq!(*seen.read().unwrap(), vec![(4, 65, true), (4, 65, false)]);
    }

    #[test]
    fn test_closed_slot_never_invokes() {
        let slot = HookSlot::new(info());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        slot.install(Arc::new(move |_: &WindowInfo, _: KeyCode, _: bool| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        slot.close();
        assert!(!slot.invoke(1, true));

        let c = count.clone();
        slot.install(Arc::new(move |_: &WindowInfo, _: KeyCode, _: bool| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!slot.invoke(1, true));
        assert!(!slot.is_installed());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
