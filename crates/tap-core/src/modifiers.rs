//! Active modifier keys (shift, ctrl, locks, ...) shared between the
//! executor and the UI.
//!
//! The state is a bitmask of Android `META_*` flags plus a use-once flag.
//! Every mutation notifies subscribed observers with the new snapshot; the
//! notification runs after the state lock is released, so an observer may
//! read or even change the state again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

/// Point-in-time view of the modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSnapshot {
    /// OR of active `keys::meta` flags.
    pub bits: i32,
    /// Clear every modifier after the next typed key.
    pub use_once: bool,
}

impl ModifierSnapshot {
    pub fn contains(&self, flag: i32) -> bool {
        self.bits & flag == flag
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

pub trait ModifierObserver: Send + Sync {
    fn on_modifiers_changed(&self, snapshot: ModifierSnapshot);
}

impl<F> ModifierObserver for F
where
    F: Fn(ModifierSnapshot) + Send + Sync,
{
    fn on_modifiers_changed(&self, snapshot: ModifierSnapshot) {
        self(snapshot)
    }
}

/// Returned by [`ModifierState::subscribe`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct ModifierState {
    state: RwLock<ModifierSnapshot>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn ModifierObserver>)>>,
    next_id: AtomicU64,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ModifierSnapshot {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bits(&self) -> i32 {
        self.snapshot().bits
    }

    pub fn use_once(&self) -> bool {
        self.snapshot().use_once
    }

    /// OR `flags` into the active set and replace the use-once flag.
    pub fn activate(&self, flags: i32, use_once: bool) {
        self.update(|s| {
            s.bits |= flags;
            s.use_once = use_once;
        });
    }

    /// Replace the active set and use-once flag.
    pub fn set(&self, flags: i32, use_once: bool) {
        self.update(|s| {
            s.bits = flags;
            s.use_once = use_once;
        });
    }

    pub fn reset(&self) {
        self.set(0, false);
    }

    /// Flip `flags`, leaving the use-once flag alone.
    pub fn toggle(&self, flags: i32) {
        self.update(|s| s.bits ^= flags);
    }

    pub fn subscribe(&self, observer: Arc<dyn ModifierObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    fn update(&self, f: impl FnOnce(&mut ModifierSnapshot)) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state);
            *state
        };
        debug!(
            bits = format_args!("{:#x}", snapshot.bits),
            use_once = snapshot.use_once,
            "modifiers changed"
        );
        self.notify(snapshot);
    }

    fn notify(&self, snapshot: ModifierSnapshot) {
        let observers: Vec<Arc<dyn ModifierObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer.on_modifiers_changed(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::meta;

    fn recorder(state: &ModifierState) -> (ObserverId, Arc<Mutex<Vec<ModifierSnapshot>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = state.subscribe(Arc::new(move |s: ModifierSnapshot| {
            sink.lock().unwrap().push(s);
        }));
        (id, seen)
    }

    #[test]
    fn starts_empty() {
        let state = ModifierState::new();
        assert_eq!(state.snapshot(), ModifierSnapshot::default());
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn activate_ors_and_replaces_use_once() {
        let state = ModifierState::new();
        state.activate(meta::SHIFT_ON, true);
        state.activate(meta::CTRL_ON, false);
        let s = state.snapshot();
        assert!(s.contains(meta::SHIFT_ON | meta::CTRL_ON));
        assert!(!s.use_once);
    }

    #[test]
    fn toggle_flips_and_keeps_use_once() {
        let state = ModifierState::new();
        state.activate(meta::ALT_ON, true);
        state.toggle(meta::CAPS_LOCK_ON);
        assert_eq!(state.bits(), meta::ALT_ON | meta::CAPS_LOCK_ON);
        assert!(state.use_once());
        state.toggle(meta::CAPS_LOCK_ON);
        assert_eq!(state.bits(), meta::ALT_ON);
    }

    #[test]
    fn set_and_reset() {
        let state = ModifierState::new();
        state.set(meta::META_ON, true);
        assert_eq!(
            state.snapshot(),
            ModifierSnapshot {
                bits: meta::META_ON,
                use_once: true
            }
        );
        state.reset();
        assert_eq!(state.snapshot(), ModifierSnapshot::default());
    }

    #[test]
    fn observers_see_every_change() {
        let state = ModifierState::new();
        let (_, seen) = recorder(&state);
        state.toggle(meta::SHIFT_ON);
        state.reset();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].bits, meta::SHIFT_ON);
        assert_eq!(seen[1].bits, 0);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let state = ModifierState::new();
        let (id, seen) = recorder(&state);
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
        state.toggle(meta::SHIFT_ON);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn observer_may_reenter() {
        let state = Arc::new(ModifierState::new());
        let inner = Arc::clone(&state);
        let reads = Arc::new(Mutex::new(Vec::new()));
        let reads_sink = Arc::clone(&reads);
        state.subscribe(Arc::new(move |_: ModifierSnapshot| {
            reads_sink.lock().unwrap().push(inner.bits());
        }));
        state.toggle(meta::CTRL_ON);
        assert_eq!(*reads.lock().unwrap(), vec![meta::CTRL_ON]);
    }
}
