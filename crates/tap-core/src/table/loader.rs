//! Building `TapMaps` from CSV map files.
//!
//! Each source is keyed `MAPNAME_N`: its rows fill tap-count slot `N` of map
//! `MAPNAME`. Bundled sources are registered first; a user source with the
//! same key replaces the bundled one outright.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, debug_span, warn};

use super::{is_blank, CommandList, CommandLists, PatternMap, TableError, TapMaps};
use crate::pattern::{self, TapPattern};

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("DEFAULT_1", include_str!("../../maps/DEFAULT_1.csv")),
    ("DEFAULT_2", include_str!("../../maps/DEFAULT_2.csv")),
    ("DEFAULT_3", include_str!("../../maps/DEFAULT_3.csv")),
    ("SHIFTMAP_1", include_str!("../../maps/SHIFTMAP_1.csv")),
    ("SWITCHMAP_1", include_str!("../../maps/SWITCHMAP_1.csv")),
];

/// The bundled `(key, csv)` sources, in load order.
pub fn builtin_sources() -> &'static [(&'static str, &'static str)] {
    BUILTIN_SOURCES
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid map source name {0:?}: expected MAPNAME_N with N in 1-32, e.g. DEFAULT_1")]
    InvalidSlotKey(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// What to do with empty entries left between populated ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySlotPolicy {
    /// Keep an empty placeholder so later entries keep their tap count.
    #[default]
    Aligned,
    /// Drop empty entries and shift later ones down a tap count.
    Compact,
}

/// Highest tap count a map source may bind. Keeps a file name like
/// `DEFAULT_4000000000` from sizing the slot lists.
pub const MAX_SLOT: usize = 32;

/// A parsed `MAPNAME_N` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotKey {
    pub map: String,
    /// 1-based tap count.
    pub slot: usize,
}

/// Split `MAPNAME_N` at its last underscore.
pub fn parse_slot_key(key: &str) -> Result<SlotKey, LoadError> {
    let invalid = || LoadError::InvalidSlotKey(key.to_string());
    let (map, slot) = key.rsplit_once('_').ok_or_else(invalid)?;
    if map.is_empty() {
        return Err(invalid());
    }
    let slot: usize = slot.parse().map_err(|_| invalid())?;
    if slot == 0 || slot > MAX_SLOT {
        return Err(invalid());
    }
    Ok(SlotKey {
        map: map.to_string(),
        slot,
    })
}

/// A problem that was logged and skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    SkippedRow {
        source: String,
        line: u64,
        reason: String,
    },
    InvalidSlotKey(String),
    EmptySlotBeforeEntry {
        map: String,
        pattern: TapPattern,
        slot: usize,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::SkippedRow {
                source,
                line,
                reason,
            } => write!(f, "{source}:{line}: row skipped: {reason}"),
            LoadWarning::InvalidSlotKey(key) => {
                write!(f, "{key}: not a MAPNAME_N source, ignored")
            }
            LoadWarning::EmptySlotBeforeEntry { map, pattern, slot } => write!(
                f,
                "{map}: pattern {pattern} has an empty tap-count {slot} before a populated one"
            ),
        }
    }
}

/// Rows of one source file, pattern → command list.
pub type PatternRows = BTreeMap<TapPattern, CommandList>;

/// Parse one map file. Rows with a bad pattern are reported and skipped.
pub fn parse_map_csv(content: &str) -> (PatternRows, Vec<(u64, String)>) {
    let mut rows = PatternRows::new();
    let mut skipped = Vec::new();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                skipped.push((line, e.to_string()));
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let Some(field) = record.get(0) else {
            continue;
        };
        match pattern::decode(field.trim()) {
            Ok(p) => {
                let commands: CommandList = record.iter().skip(1).map(str::to_string).collect();
                rows.insert(p, commands);
            }
            Err(e) => skipped.push((line, e.to_string())),
        }
    }

    (rows, skipped)
}

/// Collects map sources and merges them into `TapMaps`.
pub struct MapBuilder {
    sources: BTreeMap<String, PatternRows>,
    policy: EmptySlotPolicy,
    warnings: Vec<LoadWarning>,
}

impl MapBuilder {
    pub fn new(policy: EmptySlotPolicy) -> Self {
        Self {
            sources: BTreeMap::new(),
            policy,
            warnings: Vec::new(),
        }
    }

    /// A builder pre-loaded with the bundled maps.
    pub fn with_builtins(policy: EmptySlotPolicy) -> Self {
        let mut builder = Self::new(policy);
        for (key, content) in builtin_sources() {
            builder.add_source(key, content);
        }
        builder
    }

    /// Parse `content` as source `key`, replacing any source with that key.
    pub fn add_source(&mut self, key: &str, content: &str) {
        let (rows, skipped) = parse_map_csv(content);
        for (line, reason) in skipped {
            warn!(source = key, line, %reason, "skipping map row");
            self.warnings.push(LoadWarning::SkippedRow {
                source: key.to_string(),
                line,
                reason,
            });
        }
        if self.sources.insert(key.to_string(), rows).is_some() {
            debug!(source = key, "replacing earlier source");
        }
    }

    /// Add every `*.csv` file in `dir`, keyed by file stem.
    ///
    /// A missing directory adds nothing. Returns the number of files added.
    pub fn add_dir(&mut self, dir: &Path) -> Result<usize, LoadError> {
        let files = load_map_dir(dir)?;
        let count = files.len();
        for (key, content) in files {
            self.add_source(&key, &content);
        }
        Ok(count)
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Merge all sources and prune empty entries.
    pub fn build_maps(&mut self) -> HashMap<String, PatternMap> {
        let _span = debug_span!("build_maps", sources = self.sources.len()).entered();

        let mut merged: BTreeMap<String, BTreeMap<TapPattern, CommandLists>> = BTreeMap::new();
        for (key, rows) in &self.sources {
            let slot_key = match parse_slot_key(key) {
                Ok(k) => k,
                Err(e) => {
                    warn!(source = %key, "{e}");
                    self.warnings.push(LoadWarning::InvalidSlotKey(key.clone()));
                    continue;
                }
            };
            let map = merged.entry(slot_key.map).or_default();
            for (pattern, commands) in rows {
                let lists = map.entry(*pattern).or_default();
                if lists.len() < slot_key.slot {
                    lists.resize(slot_key.slot, CommandList::new());
                }
                lists[slot_key.slot - 1] = commands.clone();
            }
        }

        let mut maps = HashMap::with_capacity(merged.len());
        for (name, mut entries) in merged {
            entries.retain(|pattern, lists| {
                prune_lists(&name, *pattern, lists, self.policy, &mut self.warnings);
                if lists.is_empty() {
                    debug!(map = %name, %pattern, "no command lists left, dropping pattern");
                }
                !lists.is_empty()
            });
            debug!(map = %name, patterns = entries.len(), "map built");
            maps.insert(name, PatternMap::new(entries));
        }
        maps
    }

    /// Merge, prune and activate the `DEFAULT` map.
    pub fn build(mut self) -> Result<TapMaps, LoadError> {
        let maps = self.build_maps();
        Ok(TapMaps::new(maps)?)
    }
}

fn prune_lists(
    map: &str,
    pattern: TapPattern,
    lists: &mut CommandLists,
    policy: EmptySlotPolicy,
    warnings: &mut Vec<LoadWarning>,
) {
    for list in lists.iter_mut() {
        if is_blank(list) {
            list.clear();
        }
    }

    // An empty slot followed by a populated one changes what tap count
    // selects the later entry under compaction; report it either way.
    let last_populated = lists.iter().rposition(|l| !l.is_empty());
    if let Some(last) = last_populated {
        for (i, list) in lists[..last].iter().enumerate() {
            if list.is_empty() {
                warn!(map, %pattern, slot = i + 1, "empty command list before a populated one");
                warnings.push(LoadWarning::EmptySlotBeforeEntry {
                    map: map.to_string(),
                    pattern,
                    slot: i + 1,
                });
            }
        }
    }

    match policy {
        EmptySlotPolicy::Aligned => lists.truncate(last_populated.map_or(0, |last| last + 1)),
        EmptySlotPolicy::Compact => lists.retain(|l| !l.is_empty()),
    }
}

/// Read every `*.csv` file in `dir` as `(file stem, content)`, sorted by name.
pub fn load_map_dir(dir: &Path) -> Result<Vec<(String, String)>, LoadError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no user map directory");
        return Ok(Vec::new());
    }
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LoadError::Io { path, source }
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(&path).map_err(io_err(&path))?;
        debug!(file = %path.display(), "loaded user map file");
        files.push((stem.to_string(), content));
    }
    Ok(files)
}
