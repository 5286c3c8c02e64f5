use std::fs;

fn main() {
    // Validate embedded configuration at compile time.
    validate_toml(
        "src/default_settings.toml",
        include_str!("src/default_settings.toml"),
    );

    for entry in fs::read_dir("maps").expect("maps directory must exist") {
        let path = entry.expect("readable maps entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        println!("cargo:rerun-if-changed={}", path.display());
        let content = fs::read_to_string(&path).expect("readable map file");
        validate_map(&path.display().to_string(), &content);
    }
}

fn validate_toml(path: &str, content: &str) {
    println!("cargo:rerun-if-changed={path}");
    if content.parse::<toml::Value>().is_err() {
        panic!("{path} contains invalid TOML");
    }
}

fn validate_map(path: &str, content: &str) {
    for (i, line) in content.lines().enumerate() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let pattern = line.split(',').next().unwrap_or_default();
        if pattern.len() != 5 || !pattern.chars().all(|c| c == '0' || c == '1') {
            panic!("{path}:{}: bad pattern {pattern:?}", i + 1);
        }
    }
}
