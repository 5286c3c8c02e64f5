//! Replay a tap script through a controller on a virtual clock.
//!
//! A script is a whitespace-separated list of pattern strings; `.` lets the
//! multi-tap timeout elapse.

use std::process;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tap_core::pattern::{self, PatternError, TapPattern};
use tap_core::table::TapMaps;
use tap_session::{
    Decision, DecisionObserver, DeviceControl, KeyAction, KeyEvent, KeySink, ManualScheduler,
    RecognizerConfig, Scheduler, TapController,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Tap(TapPattern),
    Timeout,
}

pub fn parse_script(script: &str) -> Result<Vec<Step>, PatternError> {
    script
        .split_whitespace()
        .map(|token| match token {
            "." => Ok(Step::Timeout),
            s => pattern::decode(s).map(Step::Tap),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Tap {
        pattern: String,
    },
    Timeout {
        fired: usize,
    },
    Decision {
        kind: String,
        pattern: String,
        count: usize,
        executable: Vec<String>,
        map: String,
    },
    Key {
        code: i32,
        meta: i32,
        down: bool,
    },
    Device {
        mouse_mode: bool,
    },
}

type Log = Arc<Mutex<Vec<SimEvent>>>;

fn push(log: &Log, event: SimEvent) {
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(event);
}

struct Recorder {
    log: Log,
    maps: Arc<TapMaps>,
}

impl KeySink for Recorder {
    fn key_event(&self, event: KeyEvent) {
        push(
            &self.log,
            SimEvent::Key {
                code: event.key_code,
                meta: event.meta_state,
                down: event.action == KeyAction::Down,
            },
        );
    }
}

impl DeviceControl for Recorder {
    fn start_mouse_mode(&self) {
        push(&self.log, SimEvent::Device { mouse_mode: true });
    }

    fn end_mouse_mode(&self) {
        push(&self.log, SimEvent::Device { mouse_mode: false });
    }
}

impl DecisionObserver for Recorder {
    fn on_decision(&self, decision: &Decision) {
        push(
            &self.log,
            SimEvent::Decision {
                kind: format!("{:?}", decision.kind),
                pattern: decision.tap_pattern.to_string(),
                count: decision.tap_count,
                executable: decision.executable.clone(),
                map: self.maps.active_name(),
            },
        );
    }
}

/// Run `steps` and return everything that happened, in order.
///
/// Whatever is still pending at the end is left to time out.
pub fn run(
    maps: Arc<TapMaps>,
    config: RecognizerConfig,
    mouse_exit: Vec<TapPattern>,
    steps: &[Step],
) -> std::io::Result<Vec<SimEvent>> {
    let log: Log = Arc::default();
    let recorder = Arc::new(Recorder {
        log: Arc::clone(&log),
        maps: Arc::clone(&maps),
    });
    let sched = Arc::new(ManualScheduler::new());
    let ctl = TapController::builder(
        maps,
        Arc::clone(&recorder) as Arc<dyn KeySink>,
        Arc::clone(&recorder) as Arc<dyn DeviceControl>,
    )
    .config(config)
    .mouse_exit(mouse_exit)
    .scheduler(Arc::clone(&sched) as Arc<dyn Scheduler>)
    .observer(recorder as Arc<dyn DecisionObserver>)
    .build()?;

    for step in steps {
        match step {
            Step::Tap(p) => {
                push(
                    &log,
                    SimEvent::Tap {
                        pattern: p.to_string(),
                    },
                );
                ctl.on_tap_input(p.bits() as u32);
            }
            Step::Timeout => {
                // Inserted ahead of whatever the timeout caused.
                let at = log.lock().unwrap_or_else(PoisonError::into_inner).len();
                let fired = sched.advance(config.timeout);
                log.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(at, SimEvent::Timeout { fired });
            }
        }
    }
    sched.fire_all();

    let events = std::mem::take(&mut *log.lock().unwrap_or_else(PoisonError::into_inner));
    Ok(events)
}

fn format_event(event: &SimEvent) -> String {
    match event {
        SimEvent::Tap { pattern } => format!("tap {pattern}"),
        SimEvent::Timeout { fired } => format!("-- timeout ({fired} timer(s) fired)"),
        SimEvent::Decision {
            kind,
            pattern,
            count,
            executable,
            map,
        } => format!(
            "  {kind:<10} {pattern} x{count} [{}] ({map})",
            executable.join(" ")
        ),
        SimEvent::Key { code, meta, down } => format!(
            "    key {} {code} meta=0x{meta:x}",
            if *down { "down" } else { "up  " }
        ),
        SimEvent::Device { mouse_mode } => format!(
            "  device: mouse mode {}",
            if *mouse_mode { "on" } else { "off" }
        ),
    }
}

pub fn simulate(
    maps: TapMaps,
    config: RecognizerConfig,
    mouse_exit: Vec<TapPattern>,
    script: &str,
    json: bool,
) {
    let steps = parse_script(script).unwrap_or_else(|e| {
        eprintln!("Error in script: {e}");
        process::exit(1);
    });
    let events = run(Arc::new(maps), config, mouse_exit, &steps).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });
    for event in &events {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        } else {
            println!("{}", format_event(event));
        }
    }
}
