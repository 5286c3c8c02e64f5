//! Pattern tables: which command lists each tap pattern produces.
//!
//! `PatternMap` holds one named map (e.g. `DEFAULT`). `TapMaps` owns every
//! loaded map plus a pointer to the active one. Maps are immutable once built;
//! switching maps replaces the active pointer and never touches map contents.

mod loader;

pub use loader::{
    builtin_sources, load_map_dir, parse_map_csv, parse_slot_key, EmptySlotPolicy, LoadError,
    LoadWarning, MapBuilder, PatternRows, SlotKey, MAX_SLOT,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::pattern::TapPattern;

/// Name of the map that must always exist and is active at startup.
pub const DEFAULT_MAP: &str = "DEFAULT";

/// One key command token, e.g. `"ENTER"`, `"SHIFTONCE"` or literal text.
pub type KeyCommand = String;
/// Tokens executed in order for one completed gesture.
pub type CommandList = Vec<KeyCommand>;
/// Alternatives for one pattern, indexed by tap count - 1.
pub type CommandLists = Vec<CommandList>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("no DEFAULT map was loaded")]
    MissingDefaultMap,
    #[error("unknown map: {0}")]
    UnknownMap(String),
}

/// Pick the command list for a 1-based tap count, wrapping past the end.
///
/// Returns an empty list when there are no alternatives or `tap_count` is 0.
pub fn resolve(lists: &[CommandList], tap_count: usize) -> CommandList {
    if lists.is_empty() || tap_count == 0 {
        return CommandList::new();
    }
    lists[(tap_count - 1) % lists.len()].clone()
}

/// Like [`resolve`] but counts at or past the end select the final entry.
pub fn resolve_clamped(lists: &[CommandList], tap_count: usize) -> CommandList {
    if lists.is_empty() || tap_count == 0 {
        return CommandList::new();
    }
    lists[(tap_count - 1).min(lists.len() - 1)].clone()
}

/// True if a command list would do nothing when executed.
pub fn is_blank(list: &[KeyCommand]) -> bool {
    list.iter().all(|token| token.is_empty())
}

/// Immutable pattern → alternatives table for one named map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternMap {
    entries: BTreeMap<TapPattern, CommandLists>,
}

impl PatternMap {
    pub fn new(entries: BTreeMap<TapPattern, CommandLists>) -> Self {
        Self { entries }
    }

    pub fn get(&self, pattern: TapPattern) -> Option<&CommandLists> {
        self.entries.get(&pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TapPattern, &CommandLists)> {
        self.entries.iter().map(|(p, lists)| (*p, lists))
    }

    /// Deepest multi-tap slot configured for any pattern.
    pub fn max_tap_count(&self) -> usize {
        self.entries.values().map(Vec::len).max().unwrap_or(0)
    }
}

struct ActiveMap {
    name: String,
    map: Arc<PatternMap>,
}

/// Every loaded map plus the currently active one.
pub struct TapMaps {
    maps: HashMap<String, Arc<PatternMap>>,
    active: ArcSwap<ActiveMap>,
}

impl TapMaps {
    /// Build the registry with [`DEFAULT_MAP`] active.
    pub fn new(maps: HashMap<String, PatternMap>) -> Result<Self, TableError> {
        let maps: HashMap<String, Arc<PatternMap>> = maps
            .into_iter()
            .map(|(name, map)| (name, Arc::new(map)))
            .collect();
        let default = maps
            .get(DEFAULT_MAP)
            .cloned()
            .ok_or(TableError::MissingDefaultMap)?;
        debug!(map_count = maps.len(), "tap maps ready");
        Ok(Self {
            maps,
            active: ArcSwap::from_pointee(ActiveMap {
                name: DEFAULT_MAP.to_string(),
                map: default,
            }),
        })
    }

    /// Alternatives for `pattern` in the active map; empty if unconfigured.
    pub fn lookup(&self, pattern: TapPattern) -> CommandLists {
        self.active
            .load()
            .map
            .get(pattern)
            .cloned()
            .unwrap_or_default()
    }

    /// Make `name` the active map. Unknown names leave the active map as is.
    pub fn switch_to(&self, name: &str) -> Result<(), TableError> {
        let Some(map) = self.maps.get(name) else {
            warn!(name, "requested map does not exist");
            return Err(TableError::UnknownMap(name.to_string()));
        };
        self.active.store(Arc::new(ActiveMap {
            name: name.to_string(),
            map: Arc::clone(map),
        }));
        debug!(name, "switched active map");
        Ok(())
    }

    pub fn active_name(&self) -> String {
        self.active.load().name.clone()
    }

    pub fn active_map(&self) -> Arc<PatternMap> {
        Arc::clone(&self.active.load().map)
    }

    pub fn get(&self, name: &str) -> Option<Arc<PatternMap>> {
        self.maps.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    /// All map names, sorted.
    pub fn map_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.maps.keys().cloned().collect();
        names.sort();
        names
    }
}
