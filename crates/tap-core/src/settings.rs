//! Global settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::pattern::{self, TapPattern};
use crate::table::EmptySlotPolicy;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub multitap: MultiTapSettings,
    #[serde(default)]
    pub maps: MapSettings,
    #[serde(default)]
    pub mouse: MouseSettings,
    #[serde(skip)]
    mouse_exit_parsed: Vec<TapPattern>,
}

impl Settings {
    /// Default mouse-mode exit sequence, decoded.
    pub fn mouse_exit(&self) -> &[TapPattern] {
        &self.mouse_exit_parsed
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiTapSettings {
    pub timeout_ms: u64,
    #[serde(default = "default_loop_taps")]
    pub loop_taps: bool,
}

impl MultiTapSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MultiTapSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 300,
            loop_taps: true,
        }
    }
}

fn default_loop_taps() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapSettings {
    #[serde(default)]
    pub empty_slots: EmptySlotPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MouseSettings {
    #[serde(default = "default_exit_sequence")]
    pub exit_sequence: Vec<String>,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            exit_sequence: default_exit_sequence(),
        }
    }
}

fn default_exit_sequence() -> Vec<String> {
    vec!["01111".to_string()]
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let mut s: Settings =
        toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    s.mouse_exit_parsed = parse_exit_sequence(&s.mouse.exit_sequence)?;
    Ok(s)
}

fn parse_exit_sequence(raw: &[String]) -> Result<Vec<TapPattern>, SettingsError> {
    raw.iter()
        .enumerate()
        .map(|(i, text)| {
            pattern::decode(text).map_err(|e| SettingsError::InvalidValue {
                field: format!("mouse.exit_sequence[{i}]"),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    if s.multitap.timeout_ms == 0 {
        return Err(SettingsError::InvalidValue {
            field: "multitap.timeout_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if s.mouse.exit_sequence.is_empty() {
        return Err(SettingsError::InvalidValue {
            field: "mouse.exit_sequence".to_string(),
            reason: "must name at least one pattern".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.multitap.timeout_ms, 300);
        assert_eq!(s.multitap.timeout(), Duration::from_millis(300));
        assert!(s.multitap.loop_taps);
        assert_eq!(s.maps.empty_slots, EmptySlotPolicy::Aligned);
        assert_eq!(s.mouse.exit_sequence, vec!["01111".to_string()]);
        assert_eq!(s.mouse_exit(), &[pattern::decode("01111").unwrap()]);
    }

    #[test]
    fn parse_valid_custom_toml() {
        let toml = r#"
[multitap]
timeout_ms = 450
loop_taps = false

[maps]
empty_slots = "compact"

[mouse]
exit_sequence = ["11111", "11111"]
"#;
        let s = parse_settings_toml(toml).unwrap();
        assert_eq!(s.multitap.timeout_ms, 450);
        assert!(!s.multitap.loop_taps);
        assert_eq!(s.maps.empty_slots, EmptySlotPolicy::Compact);
        assert_eq!(s.mouse_exit().len(), 2);
    }

    #[test]
    fn optional_sections_take_defaults() {
        let s = parse_settings_toml("[multitap]\ntimeout_ms = 250\n").unwrap();
        assert!(s.multitap.loop_taps);
        assert_eq!(s.maps.empty_slots, EmptySlotPolicy::Aligned);
        assert_eq!(s.mouse_exit(), &[pattern::decode("01111").unwrap()]);
    }

    #[test]
    fn error_zero_timeout() {
        let err = parse_settings_toml("[multitap]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("multitap.timeout_ms"));
    }

    #[test]
    fn error_bad_exit_pattern() {
        let toml = r#"
[multitap]
timeout_ms = 300

[mouse]
exit_sequence = ["01111", "2"]
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(err.to_string().contains("mouse.exit_sequence[1]"));
    }

    #[test]
    fn error_empty_exit_sequence() {
        let toml = "[multitap]\ntimeout_ms = 300\n[mouse]\nexit_sequence = []\n";
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(err.to_string().contains("mouse.exit_sequence"));
    }

    #[test]
    fn error_unknown_slot_policy() {
        let toml = "[multitap]\ntimeout_ms = 300\n[maps]\nempty_slots = \"sparse\"\n";
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_invalid_toml() {
        let err = parse_settings_toml("not valid toml {{{").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_missing_section() {
        let err = parse_settings_toml("[maps]\nempty_slots = \"aligned\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
