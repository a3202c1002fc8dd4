use crate::filters::SearchFilters;
use crate::sort::{sort_tiles, SortDir, SortKey};
use crate::{QueryError, Result};
use pb_index::{IndexError, PbIndex, Tile};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// One page of search results plus the filtered size before pagination.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub tiles: Vec<Tile>,
    pub total_count: usize,
}

/// A `(country, unit, year)` triple that occurs among current tiles, so a
/// client can offer only combinations that yield results.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FilterCombination {
    pub country: String,
    pub unit: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub countries: Vec<String>,
    pub units: Vec<String>,
    pub years: Vec<i32>,
    pub combinations: Vec<FilterCombination>,
}

/// Read-only query layer over an index's snapshots.
///
/// Every call reads one consistent snapshot; a refresh running in parallel
/// is observed only by the next call.
pub struct QueryEngine {
    index: Arc<PbIndex>,
}

impl QueryEngine {
    pub fn new(index: Arc<PbIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<PbIndex> {
        &self.index
    }

    /// Filter, sort and paginate the current tiles.
    pub fn search(
        &self,
        filters: &SearchFilters,
        key: SortKey,
        dir: SortDir,
        offset: usize,
        limit: usize,
    ) -> SearchPage {
        let snapshot = self.index.snapshot();
        let mut compiled = filters.compile();
        let mut matched: Vec<&Tile> = snapshot
            .current_tiles()
            .filter(|tile| compiled.matches(tile))
            .collect();
        sort_tiles(&mut matched, key, dir);

        let total_count = matched.len();
        let tiles = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        SearchPage { tiles, total_count }
    }

    /// Distinct filter values among current tiles, each list sorted.
    pub fn distinct_filter_options(&self) -> FilterOptions {
        let snapshot = self.index.snapshot();
        let mut countries = BTreeSet::new();
        let mut units = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut combinations = BTreeSet::new();

        for tile in snapshot.current_tiles() {
            if !tile.country.is_empty() {
                countries.insert(tile.country.clone());
            }
            if !tile.unit.is_empty() {
                units.insert(tile.unit.clone());
            }
            if let Some(year) = tile.year {
                years.insert(year);
            }
            if !tile.country.is_empty() || !tile.unit.is_empty() || tile.year.is_some() {
                combinations.insert(FilterCombination {
                    country: tile.country.clone(),
                    unit: tile.unit.clone(),
                    year: tile.year,
                });
            }
        }

        FilterOptions {
            countries: countries.into_iter().collect(),
            units: units.into_iter().collect(),
            years: years.into_iter().collect(),
            combinations: combinations.into_iter().collect(),
        }
    }

    /// Tile for one file by name, superseded versions included.
    ///
    /// The raw file is re-read and re-derived when still present, so the
    /// caller sees the file as it is now; a file that is gone or no longer
    /// parses falls back to the stored tile.
    pub async fn get_tile(&self, file_name: &str) -> Result<Tile> {
        let stored = match self.index.get_tile(file_name) {
            Ok(tile) => tile,
            Err(IndexError::UnknownFile(name)) => return Err(QueryError::NotFound(name)),
            Err(err) => return Err(err.into()),
        };

        match self.index.read_source(file_name).await {
            Ok(text) => match pb_format::parse_str(&text) {
                Ok(record) => Ok(Tile::from_record(file_name, &record)),
                Err(err) => {
                    log::debug!("{file_name}: stored tile used, re-parse failed: {err}");
                    Ok(stored)
                }
            },
            Err(_) => Ok(stored),
        }
    }
}
