//! Tap patterns and their textual form.
//!
//! A pattern is a bitmask of the fingers that touched down together: bit 0 is
//! the thumb, bit 4 the pinky. Map files write patterns thumb-first, so the
//! text `"10000"` is the thumb alone (value 1) and `"01101"` is value 22.

use std::fmt;
use std::str::FromStr;

/// Number of fingers on the device.
pub const FINGER_COUNT: usize = 5;

/// Largest valid pattern (all five fingers).
pub const MAX_PATTERN: u8 = (1 << FINGER_COUNT) - 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("{0:?} is not a tap pattern")]
    InvalidPatternFormat(String),
    #[error("tap pattern value {0} is out of range 1..=31")]
    OutOfRange(u32),
}

/// Which fingers were part of a single tap. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TapPattern(u8);

impl TapPattern {
    pub fn new(bits: u8) -> Result<Self, PatternError> {
        if bits == 0 || bits > MAX_PATTERN {
            return Err(PatternError::OutOfRange(bits as u32));
        }
        Ok(Self(bits))
    }

    /// Checked conversion from the raw integer the device SDK reports.
    pub fn from_raw(raw: u32) -> Result<Self, PatternError> {
        if raw == 0 || raw > MAX_PATTERN as u32 {
            return Err(PatternError::OutOfRange(raw));
        }
        Ok(Self(raw as u8))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn finger_count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn has_finger(self, finger: usize) -> bool {
        finger < FINGER_COUNT && self.0 & (1 << finger) != 0
    }

    /// Every valid pattern, in ascending order.
    pub fn all() -> impl Iterator<Item = TapPattern> {
        (1..=MAX_PATTERN).map(TapPattern)
    }
}

/// Parse a thumb-first binary string such as `"01101"`.
///
/// The string is reversed and read as a base-2 integer. Anything other than
/// one to five `0`/`1` characters describing a non-zero pattern is rejected.
pub fn decode(text: &str) -> Result<TapPattern, PatternError> {
    let invalid = || PatternError::InvalidPatternFormat(text.to_string());
    if text.is_empty() || text.len() > FINGER_COUNT {
        return Err(invalid());
    }
    // from_str_radix alone would accept a sign character
    if !text.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid());
    }
    let reversed: String = text.chars().rev().collect();
    let bits = u8::from_str_radix(&reversed, 2).map_err(|_| invalid())?;
    TapPattern::new(bits).map_err(|_| invalid())
}

/// Format a pattern as the five-character thumb-first string.
pub fn encode(pattern: TapPattern) -> String {
    let msb_first = format!("{:05b}", pattern.bits());
    msb_first.chars().rev().collect()
}

impl fmt::Display for TapPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(*self))
    }
}

impl FromStr for TapPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl TryFrom<u32> for TapPattern {
    type Error = PatternError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}
