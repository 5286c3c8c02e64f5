//! UniFFI export layer: Kotlin bindings for the tap engine.
//!
//! Each public type here maps to a generated Kotlin class, data class,
//! enum or interface.

mod callbacks;
mod engine;
mod types;

pub use callbacks::{TapDecisionObserver, TapDeviceControl, TapKeyReceiver, TapModifierObserver};
pub use engine::TapEngine;
pub use types::{TapDecision, TapDecisionKind, TapError, TapKeyEvent, TapModifiers};

use std::path::Path;

use tap_core::pattern::{self, TapPattern};

// ---------------------------------------------------------------------------
// Top-level functions
// ---------------------------------------------------------------------------

#[uniffi::export]
fn engine_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Thumb-first string for a pattern value in 1-31.
#[uniffi::export]
fn pattern_encode(value: u8) -> Result<String, TapError> {
    let p = TapPattern::new(value).map_err(|e| TapError::InvalidData { msg: e.to_string() })?;
    Ok(pattern::encode(p))
}

#[uniffi::export]
fn pattern_decode(text: String) -> Result<u8, TapError> {
    pattern::decode(&text)
        .map(TapPattern::bits)
        .map_err(|e| TapError::InvalidData { msg: e.to_string() })
}

#[uniffi::export]
fn settings_load_config(path: String) -> Result<(), TapError> {
    let content = std::fs::read_to_string(&path).map_err(|e| TapError::Io {
        msg: format!("{path}: {e}"),
    })?;
    tap_core::settings::init_custom(content)
        .map_err(|e| TapError::InvalidData { msg: e.to_string() })?;
    Ok(())
}

#[uniffi::export]
fn settings_default_config() -> String {
    tap_core::settings::DEFAULT_SETTINGS_TOML.to_string()
}

#[uniffi::export]
fn trace_init(log_dir: String) {
    crate::trace_init::init_tracing(Path::new(&log_dir));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_codec() {
        assert_eq!(pattern_encode(22).unwrap(), "01101");
        assert_eq!(pattern_decode("01101".into()).unwrap(), 22);
        assert!(pattern_encode(0).is_err());
        assert!(pattern_encode(32).is_err());
        assert!(matches!(
            pattern_decode("0110x".into()),
            Err(TapError::InvalidData { .. })
        ));
    }

    #[test]
    fn default_config_is_bundled_toml() {
        let toml = settings_default_config();
        assert!(toml.contains("[multitap]"));
        assert!(tap_core::settings::parse_settings_toml(&toml).is_ok());
    }

    #[test]
    fn load_config_reports_missing_file() {
        assert!(matches!(
            settings_load_config("/nonexistent/tapkey.toml".into()),
            Err(TapError::Io { .. })
        ));
    }
}
