use crate::{IndexError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};

/// Exclusive advisory lock held for the duration of a refresh, so two
/// processes sharing one corpus directory never interleave store writes.
pub(crate) struct RefreshLock {
    file: std::fs::File,
}

impl Drop for RefreshLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join("refresh.lock")
}

pub(crate) async fn acquire_refresh_lock(state_dir: &Path) -> Result<RefreshLock> {
    let path = lock_path(state_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let lock = tokio::task::spawn_blocking(move || -> Result<RefreshLock> {
        use std::fs::OpenOptions;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|err| {
                IndexError::Lock(format!("open refresh lock {}: {err}", path.display()))
            })?;

        file.lock_exclusive().map_err(|err| {
            IndexError::Lock(format!("acquire refresh lock {}: {err}", path.display()))
        })?;

        Ok(RefreshLock { file })
    })
    .await
    .map_err(|err| IndexError::Lock(format!("join refresh lock task: {err}")))??;

    Ok(lock)
}
