use std::time::Duration;

use clap::{Parser, Subcommand};

use tap_cli::commands::{config_ops, map_ops, simulate_ops};
use tap_core::table::EmptySlotPolicy;
use tap_session::RecognizerConfig;

#[derive(Parser)]
#[command(name = "taptool", about = "Tap map and multi-tap diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load bundled and user maps, report pattern counts and warnings
    Check {
        /// Directory of MAPNAME_N.csv files
        dir: String,
        /// Remove empty tap-count slots instead of keeping them
        #[arg(long)]
        compact: bool,
    },
    /// Show the command lists bound to a pattern
    Show {
        /// Pattern string, thumb first (e.g. 10000)
        pattern: String,
        /// Directory of user map files (optional)
        #[arg(long)]
        dir: Option<String>,
        /// Map to look in (default: DEFAULT)
        #[arg(long)]
        map: Option<String>,
    },
    /// Print the pattern string for a numeric value (1-31)
    Encode {
        value: u32,
    },
    /// Print the numeric value of a pattern string
    Decode {
        pattern: String,
    },
    /// Run a tap script and print every decision and key event
    Simulate {
        /// Directory of user map files (optional)
        #[arg(long)]
        dir: Option<String>,
        /// Settings TOML file (default: built-in settings)
        #[arg(long)]
        settings: Option<String>,
        /// Wrap around past the last alternative
        #[arg(long, conflicts_with = "no_loop")]
        loop_taps: bool,
        /// Complete on the last alternative
        #[arg(long)]
        no_loop: bool,
        /// Multi-tap timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Output as JSON lines instead of text
        #[arg(long)]
        json: bool,
        /// Pattern strings separated by whitespace; "." lets the timeout elapse
        #[arg(required = true)]
        script: Vec<String>,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Check { dir, compact } => {
            let policy = if compact {
                EmptySlotPolicy::Compact
            } else {
                EmptySlotPolicy::Aligned
            };
            map_ops::check(&dir, policy);
        }
        Command::Show { pattern, dir, map } => {
            let settings = config_ops::load_settings(None);
            let maps = map_ops::load_maps(dir.as_deref(), settings.maps.empty_slots);
            map_ops::show(&maps, &pattern, map.as_deref());
        }
        Command::Encode { value } => map_ops::encode(value),
        Command::Decode { pattern } => map_ops::decode(&pattern),
        Command::Simulate {
            dir,
            settings,
            loop_taps,
            no_loop,
            timeout_ms,
            json,
            script,
        } => {
            let settings = config_ops::load_settings(settings.as_deref());
            let mut config = RecognizerConfig::from_settings(&settings);
            if loop_taps {
                config.loop_taps = true;
            }
            if no_loop {
                config.loop_taps = false;
            }
            if let Some(ms) = timeout_ms.filter(|ms| *ms > 0) {
                config.timeout = Duration::from_millis(ms);
            }
            let maps = map_ops::load_maps(dir.as_deref(), settings.maps.empty_slots);
            simulate_ops::simulate(
                maps,
                config,
                settings.mouse_exit().to_vec(),
                &script.join(" "),
                json,
            );
        }
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
