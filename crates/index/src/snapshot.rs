use crate::store::IndexEntry;
use crate::tile::Tile;
use std::collections::BTreeMap;

/// Immutable view of the index at one point in time.
///
/// Readers hold an `Arc<Snapshot>` and never observe a half-applied
/// refresh; the indexer swaps in a fresh snapshot after each pass.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: BTreeMap<String, IndexEntry>,
}

impl Snapshot {
    pub fn from_entries(entries: BTreeMap<String, IndexEntry>) -> Self {
        Self { entries }
    }

    /// All indexed files, superseded versions included, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Tiles of current versions only, one per group.
    pub fn current_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.entries
            .values()
            .filter(|e| e.is_current)
            .map(|e| &e.tile)
    }

    pub fn get(&self, file_name: &str) -> Option<&IndexEntry> {
        self.entries.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_current(&self) -> usize {
        self.entries.values().filter(|e| e.is_current).count()
    }
}
