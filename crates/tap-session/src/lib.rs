//! Live tap handling: multi-tap recognition, command execution and the
//! controller that ties them to the device and the key output.
//!
//! `TapController` receives raw taps, gates them while an unlock sequence is
//! armed, and feeds the rest to `MultiTapRecognizer`. Completed gestures are
//! executed by `CommandExecutor` and then reported to the UI observer.

mod controller;
mod decision;
mod executor;
mod recognizer;
pub mod timer;

#[cfg(test)]
mod tests;

pub use controller::{DeviceControl, TapController, TapControllerBuilder};
pub use decision::{Decision, DecisionKind, DecisionObserver};
pub use executor::{
    CommandExecutor, ExecError, ExecOutcome, KeyAction, KeyEvent, KeySink, MAPSWITCH, STARTMOUSE,
};
pub use recognizer::{MultiTapRecognizer, RecognizerConfig};
pub use timer::{ManualScheduler, Scheduler, ThreadScheduler, TimerHandle, TimerTask};
