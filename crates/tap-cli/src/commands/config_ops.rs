use std::fs;
use std::process;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn settings_export() {
    print!("{}", tap_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        tap_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    let exit: Vec<String> = s.mouse_exit().iter().map(|p| p.to_string()).collect();
    println!(
        "OK: multitap.timeout_ms={}, multitap.loop_taps={}, maps.empty_slots={:?}, mouse.exit_sequence=[{}]",
        s.multitap.timeout_ms,
        s.multitap.loop_taps,
        s.maps.empty_slots,
        exit.join(", ")
    );
}

/// Settings from `file`, or the process-wide settings when none is given.
pub fn load_settings(file: Option<&str>) -> tap_core::settings::Settings {
    match file {
        Some(file) => {
            let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
            die!(
                tap_core::settings::parse_settings_toml(&content),
                "Error: {}"
            )
        }
        None => tap_core::settings::settings().clone(),
    }
}
