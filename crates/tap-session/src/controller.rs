//! Entry point for raw taps.
//!
//! The controller owns the input gate: while an unlock sequence is armed
//! (mouse mode, or an explicit `ignore_input_until`) taps only feed the
//! sequence matcher and never reach the recognizer. Completed gestures are
//! executed first and then handed to the UI observer.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tap_core::keys::{AsciiCharacterMap, CharacterMap};
use tap_core::modifiers::ModifierState;
use tap_core::pattern::{self, PatternError};
use tap_core::sequence::SequenceMatcher;
use tap_core::settings::Settings;
use tap_core::table::TapMaps;
use tap_core::TapPattern;
use tracing::{debug, warn};

use crate::decision::{Decision, DecisionObserver};
use crate::executor::{CommandExecutor, KeySink};
use crate::recognizer::{MultiTapRecognizer, RecognizerConfig};
use crate::timer::{Scheduler, ThreadScheduler};

/// Device-side switches the controller needs from the SDK.
pub trait DeviceControl: Send + Sync {
    /// Put connected devices into mouse mode.
    fn start_mouse_mode(&self);
    /// Return connected devices to controller mode.
    fn end_mouse_mode(&self);
}

#[derive(Default)]
struct GateState {
    unlock: Option<SequenceMatcher>,
    mouse_mode: bool,
}

/// Input lock shared by the controller and the decision dispatcher.
struct InputGate {
    state: Mutex<GateState>,
    device: Arc<dyn DeviceControl>,
}

impl InputGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if the tap was consumed by the lock.
    fn intercept(&self, pattern: TapPattern) -> bool {
        let end_mouse = {
            let mut gate = self.lock();
            let Some(matcher) = gate.unlock.as_mut() else {
                return false;
            };
            if !matcher.feed(pattern) {
                return true;
            }
            debug!("unlock sequence complete");
            gate.unlock = None;
            std::mem::take(&mut gate.mouse_mode)
        };
        if end_mouse {
            self.device.end_mouse_mode();
        }
        true
    }

    fn lock_until(&self, sequence: Vec<TapPattern>) {
        self.lock().unlock = Some(SequenceMatcher::new(sequence));
    }

    fn start_mouse_mode(&self, exit: Vec<TapPattern>) {
        debug!(exit_len = exit.len(), "entering mouse mode");
        {
            let mut gate = self.lock();
            gate.mouse_mode = true;
            gate.unlock = Some(SequenceMatcher::new(exit));
        }
        self.device.start_mouse_mode();
    }

    /// Leave mouse mode, dropping the exit-sequence lock it armed.
    fn end_mouse_mode(&self) {
        {
            let mut gate = self.lock();
            if std::mem::take(&mut gate.mouse_mode) {
                gate.unlock = None;
            }
        }
        self.device.end_mouse_mode();
    }
}

/// Receives recognizer decisions: execute, then tell the observer.
struct Dispatch {
    executor: CommandExecutor,
    gate: Arc<InputGate>,
    observer: Option<Arc<dyn DecisionObserver>>,
}

impl DecisionObserver for Dispatch {
    fn on_decision(&self, decision: &Decision) {
        if !decision.executable.is_empty() {
            let outcome = self.executor.execute(&decision.executable);
            if let Some(exit) = outcome.mouse_exit {
                self.gate.start_mouse_mode(exit);
            }
        }
        if let Some(observer) = &self.observer {
            observer.on_decision(decision);
        }
    }
}

pub struct TapController {
    recognizer: MultiTapRecognizer,
    gate: Arc<InputGate>,
    maps: Arc<TapMaps>,
    modifiers: Arc<ModifierState>,
}

impl TapController {
    pub fn builder(
        maps: Arc<TapMaps>,
        keys: Arc<dyn KeySink>,
        device: Arc<dyn DeviceControl>,
    ) -> TapControllerBuilder {
        TapControllerBuilder {
            maps,
            keys,
            device,
            modifiers: None,
            scheduler: None,
            observer: None,
            chars: None,
            config: RecognizerConfig::default(),
            mouse_exit: default_mouse_exit(),
        }
    }

    /// Handle one raw tap from the device. Values outside 1..=31 are ignored.
    pub fn on_tap_input(&self, raw: u32) {
        let pattern = match TapPattern::from_raw(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(raw, %e, "ignoring tap");
                return;
            }
        };
        if self.gate.intercept(pattern) {
            return;
        }
        self.recognizer.on_tap(pattern);
    }

    /// Ignore every tap until `sequence` is tapped in order.
    pub fn ignore_input_until(&self, sequence: Vec<TapPattern>) {
        self.gate.lock_until(sequence);
    }

    /// Like [`ignore_input_until`](Self::ignore_input_until) with pattern strings.
    pub fn ignore_input_until_str<S: AsRef<str>>(
        &self,
        sequence: &[S],
    ) -> Result<(), PatternError> {
        let sequence = sequence
            .iter()
            .map(|s| pattern::decode(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.ignore_input_until(sequence);
        Ok(())
    }

    /// Enter mouse mode; input stays locked until `exit` is tapped.
    pub fn start_mouse_mode(&self, exit: Vec<TapPattern>) {
        self.gate.start_mouse_mode(exit);
    }

    pub fn end_mouse_mode(&self) {
        self.gate.end_mouse_mode();
    }

    pub fn is_locked(&self) -> bool {
        self.gate.lock().unlock.is_some()
    }

    pub fn is_mouse_mode(&self) -> bool {
        self.gate.lock().mouse_mode
    }

    /// Complete any pending multi-tap sequence now.
    pub fn flush(&self) {
        self.recognizer.flush();
    }

    pub fn recognizer(&self) -> &MultiTapRecognizer {
        &self.recognizer
    }

    pub fn maps(&self) -> &Arc<TapMaps> {
        &self.maps
    }

    pub fn modifiers(&self) -> &Arc<ModifierState> {
        &self.modifiers
    }
}

fn default_mouse_exit() -> Vec<TapPattern> {
    pattern::decode("01111").into_iter().collect()
}

pub struct TapControllerBuilder {
    maps: Arc<TapMaps>,
    keys: Arc<dyn KeySink>,
    device: Arc<dyn DeviceControl>,
    modifiers: Option<Arc<ModifierState>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    observer: Option<Arc<dyn DecisionObserver>>,
    chars: Option<Arc<dyn CharacterMap>>,
    config: RecognizerConfig,
    mouse_exit: Vec<TapPattern>,
}

impl TapControllerBuilder {
    /// Take timeout, looping and mouse exit from `settings`.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.config = RecognizerConfig::from_settings(settings);
        self.mouse_exit = settings.mouse_exit().to_vec();
        self
    }

    pub fn config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Exit sequence used when `STARTMOUSE` names none.
    pub fn mouse_exit(mut self, exit: Vec<TapPattern>) -> Self {
        self.mouse_exit = exit;
        self
    }

    pub fn modifiers(mut self, modifiers: Arc<ModifierState>) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    /// Defaults to a [`ThreadScheduler`].
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Defaults to [`AsciiCharacterMap`].
    pub fn character_map(mut self, chars: Arc<dyn CharacterMap>) -> Self {
        self.chars = Some(chars);
        self
    }

    /// Fails only if the timer thread cannot be spawned.
    pub fn build(self) -> io::Result<TapController> {
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(s) => s,
            None => Arc::new(ThreadScheduler::new()?),
        };
        let modifiers = self
            .modifiers
            .unwrap_or_else(|| Arc::new(ModifierState::new()));
        let chars = self
            .chars
            .unwrap_or_else(|| Arc::new(AsciiCharacterMap) as Arc<dyn CharacterMap>);
        let gate = Arc::new(InputGate {
            state: Mutex::new(GateState::default()),
            device: self.device,
        });
        let dispatch = Arc::new(Dispatch {
            executor: CommandExecutor::new(
                Arc::clone(&self.maps),
                Arc::clone(&modifiers),
                chars,
                self.keys,
                self.mouse_exit,
            ),
            gate: Arc::clone(&gate),
            observer: self.observer,
        });
        let recognizer = MultiTapRecognizer::new(
            Arc::clone(&self.maps),
            Arc::clone(&modifiers),
            scheduler,
            dispatch,
            self.config,
        );
        Ok(TapController {
            recognizer,
            gate,
            maps: self.maps,
            modifiers,
        })
    }
}
