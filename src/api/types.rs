use tap_core::modifiers::ModifierSnapshot;
use tap_session::{Decision, DecisionKind, KeyEvent};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum TapError {
    #[error("IO error: {msg}")]
    Io { msg: String },
    #[error("invalid data: {msg}")]
    InvalidData { msg: String },
    #[error("internal error: {msg}")]
    Internal { msg: String },
}

// ---------------------------------------------------------------------------
// Records (value types, copied across FFI boundary)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct TapKeyEvent {
    pub key_code: i32,
    pub meta_state: i32,
    /// Android `KeyEvent.ACTION_DOWN` (0) or `ACTION_UP` (1).
    pub action: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Record)]
pub struct TapModifiers {
    pub bits: i32,
    pub use_once: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct TapDecision {
    pub kind: TapDecisionKind,
    /// Thumb-first pattern string, e.g. `"10000"`.
    pub pattern: String,
    pub pattern_value: u8,
    pub tap_count: u32,
    pub modifiers: TapModifiers,
    pub potential: Vec<Vec<String>>,
    pub executable: Vec<String>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum TapDecisionKind {
    Unmapped,
    Interim,
    Immediate,
    Flushed,
    TimedOut,
    MaxReached,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

impl From<ModifierSnapshot> for TapModifiers {
    fn from(s: ModifierSnapshot) -> Self {
        Self {
            bits: s.bits,
            use_once: s.use_once,
        }
    }
}

impl From<DecisionKind> for TapDecisionKind {
    fn from(kind: DecisionKind) -> Self {
        match kind {
            DecisionKind::Unmapped => Self::Unmapped,
            DecisionKind::Interim => Self::Interim,
            DecisionKind::Immediate => Self::Immediate,
            DecisionKind::Flushed => Self::Flushed,
            DecisionKind::TimedOut => Self::TimedOut,
            DecisionKind::MaxReached => Self::MaxReached,
        }
    }
}

impl From<&Decision> for TapDecision {
    fn from(d: &Decision) -> Self {
        Self {
            kind: d.kind.into(),
            pattern: d.tap_pattern.to_string(),
            pattern_value: d.tap_pattern.bits(),
            tap_count: u32::try_from(d.tap_count).unwrap_or(u32::MAX),
            modifiers: d.modifiers.into(),
            potential: d.potential.clone(),
            executable: d.executable.clone(),
        }
    }
}

impl From<KeyEvent> for TapKeyEvent {
    fn from(e: KeyEvent) -> Self {
        Self {
            key_code: e.key_code,
            meta_state: e.meta_state,
            action: e.action.code(),
        }
    }
}
