use crate::tile::{GroupKey, Tile};
use crate::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// One indexed file: the stat fields used for change detection, the version
/// group it belongs to and the derived tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file_name: String,
    pub mtime_ms: u64,
    pub size: u64,
    pub group_key: GroupKey,
    /// Winner of its version group; at most one entry per group has this set.
    pub is_current: bool,
    pub tile: Tile,
}

#[derive(Serialize, Deserialize)]
struct StoredIndex {
    schema_version: u32,
    entries: BTreeMap<String, IndexEntry>,
}

/// On-disk tile index, one JSON document per corpus directory.
///
/// Writes go through a sibling temp file and a rename so a crash mid-save
/// leaves the previous index intact.
pub struct TileStore {
    path: PathBuf,
    entries: BTreeMap<String, IndexEntry>,
}

impl TileStore {
    /// Load the store at `path`, or start empty when no file exists yet.
    /// An unreadable or wrong-version file is reported as `Corrupt`; the
    /// caller decides whether to rebuild.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let bytes = std::fs::read(&path)?;
        let stored: StoredIndex =
            serde_json::from_slice(&bytes).map_err(|err| IndexError::Corrupt {
                path: path.clone(),
                detail: err.to_string(),
            })?;
        if stored.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::Corrupt {
                path,
                detail: format!(
                    "schema version {} (expected {INDEX_SCHEMA_VERSION})",
                    stored.schema_version
                ),
            });
        }

        Ok(Self {
            path,
            entries: stored.entries,
        })
    }

    /// Start empty at `path`, discarding whatever is on disk.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        let stored = StoredIndex {
            schema_version: INDEX_SCHEMA_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec_pretty(&stored)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!(
            "saved {} entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn get(&self, file_name: &str) -> Option<&IndexEntry> {
        self.entries.get(file_name)
    }

    pub fn upsert(&mut self, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(entry.file_name.clone(), entry)
    }

    pub fn remove(&mut self, file_name: &str) -> Option<IndexEntry> {
        self.entries.remove(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, IndexEntry> {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut BTreeMap<String, IndexEntry> {
        &mut self.entries
    }

    /// All group keys present in the store.
    pub fn group_keys(&self) -> Vec<GroupKey> {
        let mut keys: Vec<GroupKey> = self.entries.values().map(|e| e.group_key.clone()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl IndexEntry {
    pub fn new(file_name: &str, mtime_ms: u64, size: u64, tile: Tile) -> Self {
        Self {
            file_name: file_name.to_string(),
            mtime_ms,
            size,
            group_key: tile.group_key(),
            is_current: false,
            tile,
        }
    }
}
