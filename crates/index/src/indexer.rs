use crate::lock::acquire_refresh_lock;
use crate::resolver::resolve_group;
use crate::scanner::{self, is_safe_file_name, ScannedFile};
use crate::snapshot::Snapshot;
use crate::stats::RefreshReport;
use crate::store::{IndexEntry, TileStore};
use crate::tile::{GroupKey, Tile};
use crate::{IndexError, Result};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as TokioMutex;

/// Directory under the corpus root where the index keeps its state.
pub const STATE_DIR_NAME: &str = ".pb-atlas";

const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Copy)]
pub struct PbIndexConfig {
    /// Upper bound on waiting for a single file to parse.
    pub parse_timeout: Duration,
}

impl Default for PbIndexConfig {
    fn default() -> Self {
        Self {
            parse_timeout: Duration::from_secs(10),
        }
    }
}

/// Incremental index over one directory of `.pb` files.
///
/// `refresh` re-derives tiles for files whose stat changed, drops entries
/// for files that disappeared and re-elects the current version inside
/// every touched group. Readers go through [`Snapshot`]s and are never
/// blocked by a running refresh.
pub struct PbIndex {
    dir: PathBuf,
    state_dir: PathBuf,
    store: TokioMutex<TileStore>,
    snapshot: RwLock<Arc<Snapshot>>,
    config: PbIndexConfig,
}

impl PbIndex {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(dir, PbIndexConfig::default()).await
    }

    pub async fn open_with(dir: impl AsRef<Path>, config: PbIndexConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(IndexError::InvalidPath(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let state_dir = dir.join(STATE_DIR_NAME);
        tokio::fs::create_dir_all(&state_dir).await?;

        let store_path = state_dir.join(INDEX_FILE_NAME);
        let store = match TileStore::open(&store_path) {
            Ok(store) => store,
            Err(IndexError::Corrupt { path, detail }) => {
                warn!("index store unreadable, rebuilding from scratch: {detail}");
                TileStore::empty(path)
            }
            Err(err) => return Err(err),
        };

        let snapshot = Arc::new(Snapshot::from_entries(store.entries().clone()));
        Ok(Self {
            dir,
            state_dir,
            store: TokioMutex::new(store),
            snapshot: RwLock::new(snapshot),
            config,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The current immutable view. Cheap to call; holders keep reading the
    /// same view until the next refresh completes.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Tile for one indexed file, current or superseded.
    pub fn get_tile(&self, file_name: &str) -> Result<Tile> {
        self.snapshot()
            .get(file_name)
            .map(|entry| entry.tile.clone())
            .ok_or_else(|| IndexError::UnknownFile(file_name.to_string()))
    }

    /// Raw text of one corpus file, for display next to its tile.
    pub async fn read_source(&self, file_name: &str) -> Result<String> {
        if !is_safe_file_name(file_name) {
            return Err(IndexError::InvalidPath(file_name.to_string()));
        }
        match tokio::fs::read_to_string(self.dir.join(file_name)).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(IndexError::UnknownFile(file_name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Bring the index in line with the directory. `full` re-parses every
    /// file regardless of stat; otherwise only added or changed files are
    /// read. Refreshes are serialized, across tasks and across processes.
    pub async fn refresh(&self, full: bool) -> Result<RefreshReport> {
        let _lock = acquire_refresh_lock(&self.state_dir).await?;
        let mut store = self.store.lock().await;
        let started = Instant::now();
        let mut report = RefreshReport::default();

        let scanned = scanner::scan(&self.dir)?;
        let present: BTreeSet<&str> = scanned.iter().map(|f| f.file_name.as_str()).collect();

        let to_parse: Vec<ScannedFile> = scanned
            .iter()
            .filter(|file| {
                full || match store.get(&file.file_name) {
                    Some(entry) => entry.mtime_ms != file.mtime_ms || entry.size != file.size,
                    None => true,
                }
            })
            .cloned()
            .collect();

        let gone: Vec<String> = store
            .entries()
            .keys()
            .filter(|name| !present.contains(name.as_str()))
            .cloned()
            .collect();

        let mut touched: BTreeSet<GroupKey> = BTreeSet::new();

        for name in gone {
            if let Some(entry) = store.remove(&name) {
                touched.insert(entry.group_key);
                report.removed += 1;
            }
        }

        for (file, outcome) in self.parse_all(to_parse).await {
            match outcome {
                Ok(record) => {
                    report.parsed += 1;
                    for warning in &record.warnings {
                        warn!("{}: {warning}", file.file_name);
                    }
                    let tile = Tile::from_record(&file.file_name, &record);
                    let entry = IndexEntry::new(&file.file_name, file.mtime_ms, file.size, tile);
                    touched.insert(entry.group_key.clone());
                    match store.upsert(entry) {
                        Some(previous) => {
                            touched.insert(previous.group_key);
                            report.updated += 1;
                        }
                        None => report.added += 1,
                    }
                }
                // A file removed between the scan and the read is not an
                // error; the next refresh records the removal.
                Err(ParseFailure::Vanished) => {
                    log::debug!("{} vanished before parsing, skipped", file.file_name);
                }
                Err(ParseFailure::Failed(message)) => {
                    report.parsed += 1;
                    report.add_error(&file.file_name, &message);
                    if let Some(previous) = store.remove(&file.file_name) {
                        touched.insert(previous.group_key);
                    }
                }
            }
        }

        let groups = if full {
            store.group_keys()
        } else {
            touched.into_iter().collect()
        };
        for group in &groups {
            resolve_group(store.entries_mut(), group);
        }

        store.save()?;

        let snapshot = Arc::new(Snapshot::from_entries(store.entries().clone()));
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;

        report.time_ms = started.elapsed().as_millis() as u64;
        info!(
            "refresh done in {}ms: {} added, {} updated, {} removed, {} errors",
            report.time_ms,
            report.added,
            report.updated,
            report.removed,
            report.errors.len()
        );
        Ok(report)
    }

    /// Parse files a batch at a time, bounded by the host's parallelism.
    async fn parse_all(
        &self,
        files: Vec<ScannedFile>,
    ) -> Vec<(ScannedFile, std::result::Result<pb_format::RawRecord, ParseFailure>)> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .clamp(2, 8);

        let mut results = Vec::with_capacity(files.len());
        for chunk in files.chunks(workers) {
            let mut handles = Vec::with_capacity(chunk.len());
            for file in chunk {
                let file = file.clone();
                let limit = self.config.parse_timeout;
                handles.push(tokio::spawn(async move {
                    let outcome = parse_one(file.path.clone(), limit).await;
                    (file, outcome)
                }));
            }
            for handle in handles {
                match handle.await {
                    Ok(pair) => results.push(pair),
                    Err(err) => log::error!("parse task panicked: {err}"),
                }
            }
        }
        results
    }
}

#[derive(Debug)]
enum ParseFailure {
    /// The file disappeared between the scan and the read.
    Vanished,
    Failed(String),
}

async fn parse_one(
    path: PathBuf,
    limit: Duration,
) -> std::result::Result<pb_format::RawRecord, ParseFailure> {
    let work = tokio::task::spawn_blocking(move || {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ParseFailure::Vanished);
            }
            Err(err) => return Err(ParseFailure::Failed(err.to_string())),
        };
        pb_format::parse(&bytes).map_err(|err| ParseFailure::Failed(err.to_string()))
    });
    match tokio::time::timeout(limit, work).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join)) => Err(ParseFailure::Failed(format!("parse task failed: {join}"))),
        Err(_) => Err(ParseFailure::Failed(
            pb_format::ParseError::Timeout(limit).to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_rejects_missing_directory() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            PbIndex::open(&missing).await,
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn read_source_rejects_traversal() {
        let temp = tempdir().unwrap();
        let index = PbIndex::open(temp.path()).await.unwrap();
        assert!(matches!(
            index.read_source("../etc/passwd").await,
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_reads_as_vanished_not_failed() {
        let temp = tempdir().unwrap();
        let gone = temp.path().join("gone.pb");
        assert!(matches!(
            parse_one(gone, Duration::from_secs(1)).await,
            Err(ParseFailure::Vanished)
        ));
    }

    #[tokio::test]
    async fn get_tile_on_unknown_file_errors() {
        let temp = tempdir().unwrap();
        let index = PbIndex::open(temp.path()).await.unwrap();
        assert!(matches!(
            index.get_tile("missing.pb"),
            Err(IndexError::UnknownFile(_))
        ));
    }
}
