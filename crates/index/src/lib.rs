//! # PB Index
//!
//! Incremental tile index over a directory of participatory budgeting files.
//!
//! ## Pipeline
//!
//! ```text
//! Corpus directory
//!     │
//!     ├──> Scanner (flat *.pb listing with stat)
//!     │      └─> changed / added / removed files
//!     │
//!     ├──> Parser (pb-format) + quality scoring
//!     │      └─> Tiles
//!     │
//!     └──> Tile store (JSON, atomic writes)
//!            └─> version resolution per group
//!                   └─> immutable Snapshot for readers
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pb_index::PbIndex;
//!
//! #[tokio::main]
//! async fn main() -> pb_index::Result<()> {
//!     let index = PbIndex::open("pb_files").await?;
//!     let report = index.refresh(false).await?;
//!
//!     println!(
//!         "{} added, {} updated, {} current tiles",
//!         report.added,
//!         report.updated,
//!         index.snapshot().num_current()
//!     );
//!     Ok(())
//! }
//! ```

mod error;
pub mod fmt;
mod indexer;
mod lock;
mod quality;
mod resolver;
mod scanner;
mod snapshot;
mod stats;
mod store;
mod tile;
mod watcher;

pub use error::{IndexError, Result};
pub use indexer::{PbIndex, PbIndexConfig, STATE_DIR_NAME};
pub use quality::{compute as compute_quality, QualityFlags, QUALITY_DISPLAY_DIGITS};
pub use resolver::resolve_group;
pub use scanner::{is_safe_file_name, scan, ScannedFile};
pub use snapshot::Snapshot;
pub use stats::RefreshReport;
pub use store::{IndexEntry, TileStore, INDEX_SCHEMA_VERSION};
pub use tile::{GroupKey, Tile};
pub use watcher::{CorpusWatcher, WatcherConfig};
