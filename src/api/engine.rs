use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tap_core::modifiers::ObserverId;
use tap_core::pattern;
use tap_core::settings::settings;
use tap_core::table::{LoadError, MapBuilder, TableError};
use tap_session::{DecisionObserver, TapController};
use tracing::debug;

use super::callbacks::{DecisionBridge, DeviceBridge, KeyBridge, ModifierBridge};
use super::{
    TapDecisionObserver, TapDeviceControl, TapError, TapKeyReceiver, TapModifierObserver,
    TapModifiers,
};

fn load_error(e: LoadError) -> TapError {
    match e {
        LoadError::Io { .. } => TapError::Io { msg: e.to_string() },
        LoadError::InvalidSlotKey(_) | LoadError::Table(_) => {
            TapError::InvalidData { msg: e.to_string() }
        }
    }
}

#[derive(uniffi::Object)]
pub struct TapEngine {
    controller: TapController,
    subscriptions: Mutex<HashMap<u64, ObserverId>>,
    next_subscription: AtomicU64,
}

#[uniffi::export]
impl TapEngine {
    /// Load the bundled maps, overlay `user_map_dir` if given, and start a
    /// controller configured from the current settings.
    #[uniffi::constructor]
    fn new(
        user_map_dir: Option<String>,
        keys: Arc<dyn TapKeyReceiver>,
        device: Arc<dyn TapDeviceControl>,
        observer: Option<Arc<dyn TapDecisionObserver>>,
    ) -> Result<Arc<Self>, TapError> {
        let settings = settings();
        let mut builder = MapBuilder::with_builtins(settings.maps.empty_slots);
        if let Some(dir) = &user_map_dir {
            let added = builder.add_dir(Path::new(dir)).map_err(load_error)?;
            debug!(dir = %dir, added, "user maps loaded");
        }
        let maps = builder.build().map_err(load_error)?;

        let mut controller = TapController::builder(
            Arc::new(maps),
            Arc::new(KeyBridge(keys)),
            Arc::new(DeviceBridge(device)),
        )
        .settings(settings);
        if let Some(observer) = observer {
            let bridge: Arc<dyn DecisionObserver> = Arc::new(DecisionBridge(observer));
            controller = controller.observer(bridge);
        }
        let controller = controller
            .build()
            .map_err(|e| TapError::Internal { msg: e.to_string() })?;

        Ok(Arc::new(Self {
            controller,
            subscriptions: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(0),
        }))
    }

    /// Feed one raw tap from the device SDK. Values outside 1-31 are ignored.
    fn on_tap_input(&self, tap: u8) {
        self.controller.on_tap_input(u32::from(tap));
    }

    /// Complete a pending multi-tap sequence now.
    fn flush(&self) {
        self.controller.flush();
    }

    fn switch_map(&self, name: String) -> Result<(), TapError> {
        self.controller
            .maps()
            .switch_to(&name)
            .map_err(|e: TableError| TapError::InvalidData { msg: e.to_string() })
    }

    fn active_map(&self) -> String {
        self.controller.maps().active_name()
    }

    fn map_names(&self) -> Vec<String> {
        self.controller.maps().map_names()
    }

    /// Command lists bound to a pattern string in the active map, by tap count.
    fn commands_for(&self, pattern: String) -> Result<Vec<Vec<String>>, TapError> {
        let p = pattern::decode(&pattern)
            .map_err(|e| TapError::InvalidData { msg: e.to_string() })?;
        Ok(self.controller.maps().lookup(p))
    }

    fn modifiers(&self) -> TapModifiers {
        self.controller.modifiers().snapshot().into()
    }

    fn reset_modifiers(&self) {
        self.controller.modifiers().reset();
    }

    /// Returns a handle for `unsubscribe_modifiers`.
    fn subscribe_modifiers(&self, observer: Arc<dyn TapModifierObserver>) -> u64 {
        let id = self
            .controller
            .modifiers()
            .subscribe(Arc::new(ModifierBridge(observer)));
        let handle = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, id);
        handle
    }

    fn unsubscribe_modifiers(&self, handle: u64) -> bool {
        let id = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle);
        match id {
            Some(id) => self.controller.modifiers().unsubscribe(id),
            None => false,
        }
    }

    /// Swallow every tap until `sequence` (pattern strings) is tapped in order.
    fn ignore_input_until(&self, sequence: Vec<String>) -> Result<(), TapError> {
        self.controller
            .ignore_input_until_str(&sequence)
            .map_err(|e| TapError::InvalidData { msg: e.to_string() })
    }

    fn is_locked(&self) -> bool {
        self.controller.is_locked()
    }

    fn is_mouse_mode(&self) -> bool {
        self.controller.is_mouse_mode()
    }

    fn end_mouse_mode(&self) {
        self.controller.end_mouse_mode();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::api::{TapDecision, TapDecisionKind, TapKeyEvent};

    #[derive(Default)]
    struct Keys(Mutex<Vec<TapKeyEvent>>);

    impl TapKeyReceiver for Keys {
        fn on_key_event(&self, event: TapKeyEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[derive(Default)]
    struct Device(Mutex<Vec<bool>>);

    impl TapDeviceControl for Device {
        fn start_mouse_mode(&self) {
            self.0.lock().unwrap().push(true);
        }

        fn end_mouse_mode(&self) {
            self.0.lock().unwrap().push(false);
        }
    }

    #[derive(Default)]
    struct Decisions(Mutex<Vec<TapDecision>>);

    impl TapDecisionObserver for Decisions {
        fn on_decision(&self, decision: TapDecision) {
            self.0.lock().unwrap().push(decision);
        }
    }

    #[derive(Default)]
    struct Mods(Mutex<Vec<TapModifiers>>);

    impl TapModifierObserver for Mods {
        fn on_modifiers_changed(&self, modifiers: TapModifiers) {
            self.0.lock().unwrap().push(modifiers);
        }
    }

    fn engine(dir: Option<String>) -> (Arc<TapEngine>, Arc<Keys>, Arc<Device>, Arc<Decisions>) {
        let keys = Arc::new(Keys::default());
        let device = Arc::new(Device::default());
        let decisions = Arc::new(Decisions::default());
        let engine = TapEngine::new(
            dir,
            Arc::clone(&keys) as Arc<dyn TapKeyReceiver>,
            Arc::clone(&device) as Arc<dyn TapDeviceControl>,
            Some(Arc::clone(&decisions) as Arc<dyn TapDecisionObserver>),
        )
        .unwrap();
        (engine, keys, device, decisions)
    }

    #[test]
    fn bundled_maps_are_loaded() {
        let (engine, ..) = engine(None);
        assert_eq!(engine.active_map(), "DEFAULT");
        let mut names = engine.map_names();
        names.sort();
        assert_eq!(names, vec!["DEFAULT", "SHIFTMAP", "SWITCHMAP"]);
        let lists = engine.commands_for("10000".into()).unwrap();
        assert_eq!(lists[0], vec!["a".to_string()]);
        assert!(engine.commands_for("00000".into()).is_err());
    }

    #[test]
    fn single_alternative_types_immediately() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("DEFAULT_1.csv"), "00011,z\n").unwrap();
        let (engine, keys, _, decisions) = engine(Some(dir.path().display().to_string()));

        // the user file replaces the bundled DEFAULT_1; DEFAULT_2 and
        // DEFAULT_3 bind nothing to 00011
        engine.on_tap_input(0b11000);
        let d = decisions.0.lock().unwrap().clone();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].kind, TapDecisionKind::Immediate);
        assert_eq!(d[0].pattern, "00011");
        assert_eq!(d[0].executable, vec!["z".to_string()]);
        let events = keys.0.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, 0);
        assert_eq!(events[1].action, 1);
    }

    #[test]
    fn invalid_tap_is_ignored() {
        let (engine, keys, _, decisions) = engine(None);
        engine.on_tap_input(0);
        engine.on_tap_input(200);
        assert!(keys.0.lock().unwrap().is_empty());
        assert!(decisions.0.lock().unwrap().is_empty());
    }

    #[test]
    fn switch_map_validates_name() {
        let (engine, ..) = engine(None);
        engine.switch_map("SWITCHMAP".into()).unwrap();
        assert_eq!(engine.active_map(), "SWITCHMAP");
        assert!(matches!(
            engine.switch_map("NOPE".into()),
            Err(TapError::InvalidData { .. })
        ));
        assert_eq!(engine.active_map(), "SWITCHMAP");
    }

    #[test]
    fn ignore_input_until_locks() {
        let (engine, keys, device, _) = engine(None);
        assert!(engine.ignore_input_until(vec!["2".into()]).is_err());
        engine.ignore_input_until(vec!["11111".into()]).unwrap();
        assert!(engine.is_locked());
        engine.on_tap_input(1);
        assert!(keys.0.lock().unwrap().is_empty());
        engine.on_tap_input(31);
        assert!(!engine.is_locked());
        assert!(!engine.is_mouse_mode());
        assert!(device.0.lock().unwrap().is_empty());
    }

    #[test]
    fn modifier_subscription() {
        let (engine, ..) = engine(None);
        let mods = Arc::new(Mods::default());
        let handle =
            engine.subscribe_modifiers(Arc::clone(&mods) as Arc<dyn TapModifierObserver>);
        engine.controller.modifiers().activate(1, true);
        assert_eq!(
            engine.modifiers(),
            TapModifiers {
                bits: 1,
                use_once: true
            }
        );
        engine.reset_modifiers();
        assert_eq!(mods.0.lock().unwrap().len(), 2);

        assert!(engine.unsubscribe_modifiers(handle));
        assert!(!engine.unsubscribe_modifiers(handle));
        engine.controller.modifiers().activate(1, false);
        assert_eq!(mods.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn missing_user_dir_is_not_an_error() {
        let (engine, ..) = engine(Some("/nonexistent/tap-maps".into()));
        assert_eq!(engine.active_map(), "DEFAULT");
    }
}
