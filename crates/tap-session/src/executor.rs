//! Turning a command list into key events.
//!
//! Tokens are handled left to right:
//!
//! - `MAPSWITCH <name>` switches the active map and ends the list.
//! - `STARTMOUSE [pattern...]` asks for mouse mode, taking the remaining
//!   tokens as its exit sequence, and ends the list.
//! - Modifier tokens (`SHIFT`, `CTRLONCE`, ...) change the modifier state.
//! - Named keys (`ENTER`, `F5`, ...) press one key.
//! - Anything else is typed as literal text.

use std::sync::Arc;

use tap_core::keys::{self, CharacterMap, KeyStroke, ModifierCommand};
use tap_core::modifiers::ModifierState;
use tap_core::pattern;
use tap_core::table::{KeyCommand, TapMaps};
use tap_core::TapPattern;
use tracing::{debug, debug_span, warn};

pub const MAPSWITCH: &str = "MAPSWITCH";
pub const STARTMOUSE: &str = "STARTMOUSE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

impl KeyAction {
    /// Android `KeyEvent` action constant.
    pub fn code(self) -> i32 {
        match self {
            KeyAction::Down => keys::ACTION_DOWN,
            KeyAction::Up => keys::ACTION_UP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: i32,
    /// The key's own meta flags OR the active modifiers.
    pub meta_state: i32,
    pub action: KeyAction,
}

pub trait KeySink: Send + Sync {
    fn key_event(&self, event: KeyEvent);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("MAPSWITCH without a map name")]
    MissingMapName,
    #[error("MAPSWITCH to unknown map {0:?}")]
    UnknownMap(String),
}

/// What executing one command list did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Key events sent, counting presses and releases separately.
    pub events_sent: usize,
    /// Map made active by `MAPSWITCH`.
    pub switched_to: Option<String>,
    /// Exit sequence requested by `STARTMOUSE`.
    pub mouse_exit: Option<Vec<TapPattern>>,
    pub error: Option<ExecError>,
}

pub struct CommandExecutor {
    maps: Arc<TapMaps>,
    modifiers: Arc<ModifierState>,
    chars: Arc<dyn CharacterMap>,
    keys: Arc<dyn KeySink>,
    default_mouse_exit: Vec<TapPattern>,
}

impl CommandExecutor {
    pub fn new(
        maps: Arc<TapMaps>,
        modifiers: Arc<ModifierState>,
        chars: Arc<dyn CharacterMap>,
        keys: Arc<dyn KeySink>,
        default_mouse_exit: Vec<TapPattern>,
    ) -> Self {
        Self {
            maps,
            modifiers,
            chars,
            keys,
            default_mouse_exit,
        }
    }

    pub fn execute(&self, list: &[KeyCommand]) -> ExecOutcome {
        let _span = debug_span!("execute", tokens = list.len()).entered();
        let mut outcome = ExecOutcome::default();

        for (i, token) in list.iter().enumerate() {
            match token.as_str() {
                MAPSWITCH => {
                    self.map_switch(list.get(i + 1), &mut outcome);
                    return outcome;
                }
                STARTMOUSE => {
                    outcome.mouse_exit = Some(self.mouse_exit(&list[i + 1..]));
                    return outcome;
                }
                _ => {}
            }

            let strokes = self.strokes_for(token);
            let active = self.modifiers.snapshot();
            for stroke in &strokes {
                let meta_state = stroke.meta_state | active.bits;
                for action in [KeyAction::Down, KeyAction::Up] {
                    self.keys.key_event(KeyEvent {
                        key_code: stroke.key_code,
                        meta_state,
                        action,
                    });
                    outcome.events_sent += 1;
                }
            }
            // One-shot modifiers last for exactly one token that typed something.
            if active.use_once && !strokes.is_empty() {
                self.modifiers.reset();
            }
        }
        outcome
    }

    fn map_switch(&self, name: Option<&KeyCommand>, outcome: &mut ExecOutcome) {
        let Some(name) = name else {
            warn!("MAPSWITCH is missing its map name");
            outcome.error = Some(ExecError::MissingMapName);
            return;
        };
        match self.maps.switch_to(name) {
            Ok(()) => outcome.switched_to = Some(name.clone()),
            Err(_) => outcome.error = Some(ExecError::UnknownMap(name.clone())),
        }
    }

    fn mouse_exit(&self, params: &[KeyCommand]) -> Vec<TapPattern> {
        let exit: Vec<TapPattern> = params
            .iter()
            .filter_map(|text| match pattern::decode(text) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(%e, "skipping STARTMOUSE exit pattern");
                    None
                }
            })
            .collect();
        if exit.is_empty() {
            debug!("no usable exit pattern given, using default");
            return self.default_mouse_exit.clone();
        }
        exit
    }

    /// Apply a modifier token, or work out the key strokes for any other one.
    fn strokes_for(&self, token: &str) -> Vec<KeyStroke> {
        if let Some(cmd) = keys::modifier_token(token) {
            match cmd {
                ModifierCommand::Toggle(flag) => self.modifiers.toggle(flag),
                ModifierCommand::Once(flag) => self.modifiers.activate(flag, true),
            }
            return Vec::new();
        }
        if let Some(code) = keys::named_key(token) {
            return vec![KeyStroke::plain(code)];
        }
        let mut strokes = Vec::with_capacity(token.len());
        for c in token.chars() {
            match self.chars.strokes(c) {
                Some(s) => strokes.extend(s),
                None => warn!(character = ?c, "no key for character, skipped"),
            }
        }
        strokes
    }
}
