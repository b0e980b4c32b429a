//! Atomic file-write helpers.
//!
//! Every persisted cache file goes through these: bytes land in a
//! sibling temp file first and reach the final path via rename, so a
//! concurrent reader never observes a partially written file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::error::{StoreError, StoreResult};

/// Temp-file sibling for the given target path.
///
/// The full file name (extension included) is kept in the temp name so
/// `<id>.json` and `<id>.mp4` writes can never collide on one temp file.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` atomically (temp file + rename).
///
/// Creates the parent directory if needed. On any failure the temp file
/// is removed and the previous contents of `path`, if any, are left
/// untouched.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let tmp = tmp_sibling(path);

    if let Err(e) = fs::write(&tmp, bytes).await {
        let _ = std::fs::remove_file(&tmp);
        return Err(StoreError::Io(e));
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = std::fs::remove_file(&tmp);
        return Err(StoreError::Io(e));
    }

    Ok(())
}

/// Serialize `value` as pretty-printed JSON and write it atomically.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

/// Remove a file, treating "already absent" as success.
pub async fn remove_if_exists(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(e)),
    }
}
