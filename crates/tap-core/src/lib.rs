pub mod keys;
pub mod modifiers;
pub mod pattern;
pub mod sequence;
pub mod settings;
pub mod table;

pub use pattern::{PatternError, TapPattern};
