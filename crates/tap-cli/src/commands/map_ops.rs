use std::path::Path;
use std::process;

use tap_core::pattern::{self, TapPattern};
use tap_core::table::{EmptySlotPolicy, MapBuilder, TapMaps};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// Bundled maps overlaid with the `*.csv` files in `dir`.
pub fn load_maps(dir: Option<&str>, policy: EmptySlotPolicy) -> TapMaps {
    let mut builder = MapBuilder::with_builtins(policy);
    if let Some(dir) = dir {
        die!(builder.add_dir(Path::new(dir)), "Error reading {dir}: {}");
    }
    die!(builder.build(), "Error: {}")
}

pub fn check(dir: &str, policy: EmptySlotPolicy) {
    let mut builder = MapBuilder::with_builtins(policy);
    let added = die!(builder.add_dir(Path::new(dir)), "Error reading {dir}: {}");
    let maps = builder.build_maps();

    println!("{added} user file(s) from {dir}");
    let mut names: Vec<&String> = maps.keys().collect();
    names.sort();
    for name in names {
        let map = &maps[name];
        println!(
            "  {name:<16} {:>2} patterns, up to {} taps",
            map.len(),
            map.max_tap_count()
        );
    }

    let warnings = builder.warnings();
    if !warnings.is_empty() {
        println!();
        println!("{} warning(s):", warnings.len());
        for w in warnings {
            println!("  {w}");
        }
    }

    die!(TapMaps::new(maps), "Error: {}");
}

pub fn show(maps: &TapMaps, pattern_str: &str, map_name: Option<&str>) {
    let pattern = die!(pattern::decode(pattern_str), "Error: {}");
    if let Some(name) = map_name {
        die!(maps.switch_to(name), "Error: {}");
    }
    let lists = maps.lookup(pattern);
    println!(
        "{pattern} (value {}) in {}",
        pattern.bits(),
        maps.active_name()
    );
    if lists.is_empty() {
        println!("  (not configured)");
        return;
    }
    for (i, list) in lists.iter().enumerate() {
        if list.is_empty() {
            println!("  x{}: (nothing)", i + 1);
        } else {
            println!("  x{}: {}", i + 1, list.join(" "));
        }
    }
}

pub fn encode(value: u32) {
    let pattern = die!(TapPattern::from_raw(value), "Error: {}");
    println!("{}", pattern::encode(pattern));
}

pub fn decode(text: &str) {
    let pattern = die!(pattern::decode(text), "Error: {}");
    println!("{}", pattern.bits());
}
