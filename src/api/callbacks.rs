//! Host-implemented interfaces and their adapters onto the engine traits.

use std::sync::Arc;

use tap_core::modifiers::{ModifierObserver, ModifierSnapshot};
use tap_session::{Decision, DecisionObserver, DeviceControl, KeyEvent, KeySink};

use super::{TapDecision, TapKeyEvent, TapModifiers};

/// Receives every key press and release the engine produces.
#[uniffi::export(with_foreign)]
pub trait TapKeyReceiver: Send + Sync {
    fn on_key_event(&self, event: TapKeyEvent);
}

/// Mouse-mode switching on the connected devices.
#[uniffi::export(with_foreign)]
pub trait TapDeviceControl: Send + Sync {
    fn start_mouse_mode(&self);
    fn end_mouse_mode(&self);
}

/// Called once per tap and once per timer-driven completion, after execution.
#[uniffi::export(with_foreign)]
pub trait TapDecisionObserver: Send + Sync {
    fn on_decision(&self, decision: TapDecision);
}

#[uniffi::export(with_foreign)]
pub trait TapModifierObserver: Send + Sync {
    fn on_modifiers_changed(&self, modifiers: TapModifiers);
}

pub(super) struct KeyBridge(pub Arc<dyn TapKeyReceiver>);

impl KeySink for KeyBridge {
    fn key_event(&self, event: KeyEvent) {
        self.0.on_key_event(event.into());
    }
}

pub(super) struct DeviceBridge(pub Arc<dyn TapDeviceControl>);

impl DeviceControl for DeviceBridge {
    fn start_mouse_mode(&self) {
        self.0.start_mouse_mode();
    }

    fn end_mouse_mode(&self) {
        self.0.end_mouse_mode();
    }
}

pub(super) struct DecisionBridge(pub Arc<dyn TapDecisionObserver>);

impl DecisionObserver for DecisionBridge {
    fn on_decision(&self, decision: &Decision) {
        self.0.on_decision(decision.into());
    }
}

pub(super) struct ModifierBridge(pub Arc<dyn TapModifierObserver>);

impl ModifierObserver for ModifierBridge {
    fn on_modifiers_changed(&self, snapshot: ModifierSnapshot) {
        self.0.on_modifiers_changed(snapshot.into());
    }
}
