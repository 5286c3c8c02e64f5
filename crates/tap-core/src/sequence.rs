//! Matching a fixed sequence of taps, used to unlock input after mouse mode.

use tracing::debug;

use crate::pattern::TapPattern;

#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    target: Vec<TapPattern>,
    cursor: usize,
}

impl SequenceMatcher {
    pub fn new(target: Vec<TapPattern>) -> Self {
        debug!(len = target.len(), "lock sequence armed");
        Self { target, cursor: 0 }
    }

    pub fn target(&self) -> &[TapPattern] {
        &self.target
    }

    /// How many leading patterns have matched so far.
    pub fn progress(&self) -> usize {
        self.cursor
    }

    /// Feed one tap; true once the whole sequence has been seen in a row.
    ///
    /// A mismatch resets the match to the start. The mismatching tap itself
    /// does not count towards a new match.
    pub fn feed(&mut self, pattern: TapPattern) -> bool {
        if self.target.is_empty() {
            return true;
        }
        if self.cursor < self.target.len() && self.target[self.cursor] == pattern {
            self.cursor += 1;
        } else {
            self.cursor = 0;
        }
        debug!(%pattern, progress = self.cursor, len = self.target.len(), "lock sequence");
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.target.len()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
