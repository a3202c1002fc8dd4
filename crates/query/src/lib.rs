//! # PB Query
//!
//! Read-only filter, sort and aggregation layer over a [`pb_index`]
//! snapshot. All queries see current tiles only; superseded file versions
//! stay reachable by name through [`QueryEngine::get_tile`].

mod aggregate;
mod engine;
mod error;
mod filters;
mod sort;

pub use aggregate::{aggregate_comments, aggregate_statistics, CommentGroup, CorpusStatistics};
pub use engine::{FilterCombination, FilterOptions, QueryEngine, SearchPage};
pub use error::{QueryError, Result};
pub use filters::SearchFilters;
pub use sort::{sort_tiles, SortDir, SortKey};
