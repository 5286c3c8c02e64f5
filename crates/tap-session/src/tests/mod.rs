
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tap_core::modifiers::ModifierState;
use tap_core::pattern::decode;
use tap_core::table::{CommandList, EmptySlotPolicy, MapBuilder, TapMaps};
use tap_core::TapPattern;

use crate::controller::DeviceControl;
use crate::decision::{Decision, DecisionKind, DecisionObserver};
use crate::executor::{KeyEvent, KeySink};
use crate::recognizer::{MultiTapRecognizer, RecognizerConfig};
use crate::timer::{ManualScheduler, Scheduler, TimerHandle, TimerTask};

pub(super) const TIMEOUT: Duration = Duration::from_millis(300);

pub(super) fn p(s: &str) -> TapPattern {
    decode(s).unwrap()
}

pub(super) fn list(tokens: &[&str]) -> CommandList {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Build maps from `(MAPNAME_N, csv)` sources.
pub(super) fn maps_from(sources: &[(&str, &str)]) -> Arc<TapMaps> {
    let mut builder = MapBuilder::new(EmptySlotPolicy::Aligned);
    for (key, content) in sources {
        builder.add_source(key, content);
    }
    Arc::new(builder.build().unwrap())
}

/// `10000` → [A, B, C], `01000` → [X, Y], `00100` → [single], `11111` → [" "].
pub(super) fn abc_maps() -> Arc<TapMaps> {
    maps_from(&[
        ("DEFAULT_1", "10000,A\n01000,X\n00100,single\n11111, \n"),
        ("DEFAULT_2", "10000,B\n01000,Y\n"),
        ("DEFAULT_3", "10000,C\n"),
    ])
}

#[derive(Default)]
pub(super) struct RecordingSink {
    decisions: Mutex<Vec<Decision>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<Decision> {
        std::mem::take(&mut *self.decisions.lock().unwrap())
    }

    /// Only the decisions that completed a gesture.
    pub fn take_final(&self) -> Vec<Decision> {
        self.take()
            .into_iter()
            .filter(|d| d.kind.is_final())
            .collect()
    }
}

impl DecisionObserver for RecordingSink {
    fn on_decision(&self, decision: &Decision) {
        self.decisions.lock().unwrap().push(decision.clone());
    }
}

#[derive(Default)]
pub(super) struct RecordingKeys {
    events: Mutex<Vec<KeyEvent>>,
}

impl RecordingKeys {
    pub fn take(&self) -> Vec<KeyEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl KeySink for RecordingKeys {
    fn key_event(&self, event: KeyEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub(super) struct RecordingDevice {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingDevice {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl DeviceControl for RecordingDevice {
    fn start_mouse_mode(&self) {
        self.calls.lock().unwrap().push("start");
    }

    fn end_mouse_mode(&self) {
        self.calls.lock().unwrap().push("end");
    }
}

/// Scheduler whose tasks run even after being cancelled, to reproduce a
/// timer that fires while a tap is cancelling it.
#[derive(Default)]
pub(super) struct RacyScheduler {
    tasks: Mutex<Vec<TimerTask>>,
}

impl RacyScheduler {
    /// Remove every task ever scheduled, oldest first.
    pub fn drain(&self) -> Vec<TimerTask> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

impl Scheduler for RacyScheduler {
    fn schedule(&self, _delay: Duration, task: TimerTask) -> TimerHandle {
        self.tasks.lock().unwrap().push(task);
        TimerHandle::default()
    }
}

pub(super) struct Harness {
    pub sched: Arc<ManualScheduler>,
    pub sink: Arc<RecordingSink>,
    pub modifiers: Arc<ModifierState>,
    pub recognizer: MultiTapRecognizer,
}

impl Harness {
    pub fn new(maps: Arc<TapMaps>, loop_taps: bool) -> Self {
        let sched = Arc::new(ManualScheduler::new());
        let sink = Arc::new(RecordingSink::default());
        let modifiers = Arc::new(ModifierState::new());
        let recognizer = MultiTapRecognizer::new(
            maps,
            Arc::clone(&modifiers),
            Arc::clone(&sched) as Arc<dyn Scheduler>,
            Arc::clone(&sink) as Arc<dyn DecisionObserver>,
            RecognizerConfig {
                timeout: TIMEOUT,
                loop_taps,
            },
        );
        Self {
            sched,
            sink,
            modifiers,
            recognizer,
        }
    }

    pub fn tap(&self, s: &str) {
        self.recognizer.on_tap(p(s));
    }

    pub fn timeout(&self) -> usize {
        self.sched.advance(TIMEOUT)
    }
}

pub(super) fn kinds(decisions: &[Decision]) -> Vec<DecisionKind> {
    decisions.iter().map(|d| d.kind).collect()
}
