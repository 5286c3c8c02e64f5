//! Multi-tap recognizer.
//!
//! Repeating the same pattern within the timeout selects the next
//! alternative bound to it, much like multi-tap text entry on a phone keypad.
//! Nothing signals the end of a sequence, so it completes when:
//!
//! - the pattern has a single alternative (immediately),
//! - a different pattern arrives (the pending one is flushed first),
//! - the timer expires, or
//! - looping is off and the last alternative is reached.
//!
//! All state lives behind one mutex that is held while cancelling and
//! re-arming the timer, so a timer firing during a tap either completes
//! before the tap is seen or finds itself stale. Decisions are queued under
//! that mutex and handed to the sink only after it is released. One caller
//! at a time drains the queue, so the sink sees decisions in the order they
//! were made and may call back into the recognizer.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tap_core::modifiers::ModifierState;
use tap_core::settings::Settings;
use tap_core::table::{self, CommandList, CommandLists, TapMaps};
use tap_core::TapPattern;
use tracing::{debug, debug_span, trace};

use crate::decision::{Decision, DecisionKind, DecisionObserver};
use crate::timer::{Scheduler, TimerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizerConfig {
    /// How long to wait for the next identical tap.
    pub timeout: Duration,
    /// Wrap around to the first alternative instead of completing at the last.
    pub loop_taps: bool,
}

impl RecognizerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout: settings.multitap.timeout(),
            loop_taps: settings.multitap.loop_taps,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(300),
            loop_taps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecognizerState {
    Idle,
    Pending {
        pattern: TapPattern,
        count: usize,
        candidates: CommandLists,
    },
}

struct Core {
    state: RecognizerState,
    timer: Option<TimerHandle>,
    /// Bumped on every arming; a timer task only acts if its value is current.
    generation: u64,
}

struct Inner {
    core: Mutex<Core>,
    /// Decisions made but not yet handed to the sink.
    outbox: Mutex<VecDeque<Decision>>,
    /// Set while some caller is draining `outbox`.
    delivering: AtomicBool,
    maps: Arc<TapMaps>,
    modifiers: Arc<ModifierState>,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn DecisionObserver>,
    config: RecognizerConfig,
}

pub struct MultiTapRecognizer {
    inner: Arc<Inner>,
}

impl MultiTapRecognizer {
    pub fn new(
        maps: Arc<TapMaps>,
        modifiers: Arc<ModifierState>,
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn DecisionObserver>,
        config: RecognizerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    state: RecognizerState::Idle,
                    timer: None,
                    generation: 0,
                }),
                outbox: Mutex::new(VecDeque::new()),
                delivering: AtomicBool::new(false),
                maps,
                modifiers,
                scheduler,
                sink,
                config,
            }),
        }
    }

    pub fn config(&self) -> RecognizerConfig {
        self.inner.config
    }

    /// Process one tap. Every decision it produces goes to the sink before
    /// this returns, unless a delivery is already under way (a call from
    /// inside the sink, or a timeout on another thread). The caller running
    /// that delivery then passes them on after its own.
    pub fn on_tap(&self, pattern: TapPattern) {
        self.inner.on_tap(pattern);
    }

    /// Complete the pending sequence now, as if its timer had fired.
    pub fn flush(&self) {
        {
            let mut core = self.inner.lock();
            cancel_timer(&mut core);
            if let RecognizerState::Pending {
                pattern,
                count,
                candidates,
            } = mem::replace(&mut core.state, RecognizerState::Idle)
            {
                self.inner
                    .complete(DecisionKind::Flushed, pattern, count, candidates);
            }
        }
        self.inner.deliver_queued();
    }

    /// Drop the pending sequence without executing it.
    pub fn reset(&self) {
        let mut core = self.inner.lock();
        cancel_timer(&mut core);
        core.state = RecognizerState::Idle;
    }

    pub fn is_idle(&self) -> bool {
        self.inner.lock().state == RecognizerState::Idle
    }

    /// The pending pattern and its tap count, if a sequence is open.
    pub fn pending(&self) -> Option<(TapPattern, usize)> {
        match &self.inner.lock().state {
            RecognizerState::Idle => None,
            RecognizerState::Pending { pattern, count, .. } => Some((*pattern, *count)),
        }
    }

    pub fn has_timer(&self) -> bool {
        self.inner
            .lock()
            .timer
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}

fn cancel_timer(core: &mut Core) {
    if let Some(timer) = core.timer.take() {
        timer.cancel();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_tap(self: &Arc<Self>, pattern: TapPattern) {
        let _span = debug_span!("on_tap", %pattern).entered();
        loop {
            let mut core = self.lock();
            cancel_timer(&mut core);

            match mem::replace(&mut core.state, RecognizerState::Idle) {
                RecognizerState::Pending {
                    pattern: prev,
                    count,
                    candidates,
                } if prev == pattern => {
                    let count = count + 1;
                    if !self.config.loop_taps && count >= candidates.len() {
                        debug!(count, "last alternative reached");
                        self.complete(DecisionKind::MaxReached, pattern, count, candidates);
                    } else {
                        debug!(count, "multi-tap continues");
                        self.arm(&mut core);
                        core.state = RecognizerState::Pending {
                            pattern,
                            count,
                            candidates: candidates.clone(),
                        };
                        self.queue(DecisionKind::Interim, pattern, count, candidates, Vec::new());
                    }
                }
                RecognizerState::Pending {
                    pattern: prev,
                    count,
                    candidates,
                } => {
                    debug!(previous = %prev, count, "new pattern flushes pending sequence");
                    self.complete(DecisionKind::Flushed, prev, count, candidates);
                    // The flushed commands may switch maps; look the new
                    // pattern up only after they ran.
                    drop(core);
                    self.deliver_queued();
                    continue;
                }
                RecognizerState::Idle => self.start(&mut core, pattern),
            }
            break;
        }
        self.deliver_queued();
    }

    /// Idle logic for a fresh pattern.
    fn start(self: &Arc<Self>, core: &mut Core, pattern: TapPattern) {
        let candidates = self.maps.lookup(pattern);
        match candidates.len() {
            0 => {
                debug!("pattern not in active map");
                self.queue(DecisionKind::Unmapped, pattern, 1, candidates, Vec::new());
            }
            1 => {
                let executable = candidates[0].clone();
                self.queue(DecisionKind::Immediate, pattern, 1, candidates, executable);
            }
            n => {
                debug!(alternatives = n, "waiting for more taps");
                self.arm(core);
                core.state = RecognizerState::Pending {
                    pattern,
                    count: 1,
                    candidates: candidates.clone(),
                };
                self.queue(DecisionKind::Interim, pattern, 1, candidates, Vec::new());
            }
        }
    }

    fn on_timer(&self, generation: u64) {
        {
            let mut core = self.lock();
            if core.generation != generation {
                trace!(generation, current = core.generation, "stale timer ignored");
                return;
            }
            core.timer = None;
            match mem::replace(&mut core.state, RecognizerState::Idle) {
                RecognizerState::Idle => trace!("timer fired while idle"),
                RecognizerState::Pending {
                    pattern,
                    count,
                    candidates,
                } => {
                    let _span = debug_span!("timeout", %pattern, count).entered();
                    self.complete(DecisionKind::TimedOut, pattern, count, candidates);
                }
            }
        }
        self.deliver_queued();
    }

    fn arm(self: &Arc<Self>, core: &mut Core) {
        core.generation += 1;
        let generation = core.generation;
        let weak: Weak<Inner> = Arc::downgrade(self);
        let handle = self.scheduler.schedule(
            self.config.timeout,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_timer(generation);
                }
            }),
        );
        core.timer = Some(handle);
    }

    fn complete(
        &self,
        kind: DecisionKind,
        pattern: TapPattern,
        count: usize,
        candidates: CommandLists,
    ) {
        let executable = if self.config.loop_taps {
            table::resolve(&candidates, count)
        } else {
            table::resolve_clamped(&candidates, count)
        };
        self.queue(kind, pattern, count, candidates, executable);
    }

    /// Record a decision. Callers hold the core lock, so the queue order is
    /// the decision order.
    fn queue(
        &self,
        kind: DecisionKind,
        tap_pattern: TapPattern,
        tap_count: usize,
        potential: CommandLists,
        executable: CommandList,
    ) {
        let decision = Decision {
            kind,
            tap_pattern,
            tap_count,
            modifiers: self.modifiers.snapshot(),
            potential,
            executable,
        };
        debug!(?kind, tap_count, executable = ?decision.executable, "decision");
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(decision);
    }

    /// Hand queued decisions to the sink with no recognizer lock held.
    ///
    /// Returns at once if another caller is already draining; that caller
    /// picks up anything queued here.
    fn deliver_queued(&self) {
        loop {
            if self
                .delivering
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                return;
            }
            {
                let _delivering = DeliveringFlag(&self.delivering);
                while let Some(decision) = self.pop_queued() {
                    self.sink.on_decision(&decision);
                }
            }
            // A decision queued after the last pop but before the flag
            // cleared would otherwise wait for the next tap.
            if self
                .outbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
            {
                return;
            }
        }
    }

    fn pop_queued(&self) -> Option<Decision> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

/// Clears the draining flag even if the sink panics.
struct DeliveringFlag<'a>(&'a AtomicBool);

impl Drop for DeliveringFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
