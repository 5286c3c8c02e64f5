use tap_core::modifiers::ModifierSnapshot;
use tap_core::table::{CommandList, CommandLists};
use tap_core::TapPattern;

/// Why a decision was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    /// The pattern has nothing configured in the active map.
    Unmapped,
    /// A multi-tap sequence started or grew; nothing to execute yet.
    Interim,
    /// The pattern has a single alternative and completed on the spot.
    Immediate,
    /// A different pattern arrived and completed the pending sequence.
    Flushed,
    /// The multi-tap window elapsed.
    TimedOut,
    /// Looping is off and the tap count reached the last alternative.
    MaxReached,
}

impl DecisionKind {
    /// True if this kind completes a gesture.
    pub fn is_final(self) -> bool {
        !matches!(self, DecisionKind::Unmapped | DecisionKind::Interim)
    }
}

/// One output of the recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: DecisionKind,
    pub tap_pattern: TapPattern,
    pub tap_count: usize,
    /// Modifier state when the decision was made.
    pub modifiers: ModifierSnapshot,
    /// Every alternative configured for `tap_pattern`.
    pub potential: CommandLists,
    /// What to execute now; empty unless the gesture completed.
    pub executable: CommandList,
}

pub trait DecisionObserver: Send + Sync {
    fn on_decision(&self, decision: &Decision);
}
