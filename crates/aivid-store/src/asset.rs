//! Disk-backed media record + blob store.
//!
//! One JSON record file and one blob file per id, written atomically.
//! Record updates are read-merge-write and serialized per id, so
//! concurrent partial updates never lose fields.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use aivid_models::{MediaRecord, MediaRecordPatch, VideoId};

use crate::error::StoreResult;
use crate::fetch::BlobFetcher;
use crate::fs::{remove_if_exists, write_atomic, write_json_atomic};

/// Content-addressed cache for generated media.
pub struct AssetStore {
    dir: PathBuf,
    fetcher: Arc<dyn BlobFetcher>,
    record_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AssetStore {
    /// Open (and create if needed) the store at `dir`.
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn BlobFetcher>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            fetcher,
            record_locks: StdMutex::new(HashMap::new()),
        })
    }

    fn blob_path(&self, id: &VideoId) -> PathBuf {
        self.dir.join(format!("{}.mp4", id))
    }

    fn record_path(&self, id: &VideoId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn placeholder_path(&self, id: &VideoId) -> PathBuf {
        self.dir.join(format!("{}.jpg", id))
    }

    /// Per-id write lock; serializes read-merge-write cycles for one id.
    fn lock_for(&self, id: &VideoId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.record_locks.lock().expect("record lock map poisoned");
        locks
            .entry(id.as_str().to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Write a blob atomically under its deterministic per-id path.
    ///
    /// Overwrites any prior blob for the same id.
    pub async fn put(&self, id: &VideoId, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.blob_path(id);
        write_atomic(&path, bytes).await?;
        debug!(id = %id, path = %path.display(), "Blob cached");
        Ok(path)
    }

    /// Blob path for `id`, if the blob exists on disk.
    pub fn get(&self, id: &VideoId) -> Option<PathBuf> {
        let path = self.blob_path(id);
        path.exists().then_some(path)
    }

    /// Whether the blob for `id` is cached locally.
    pub fn has_blob(&self, id: &VideoId) -> bool {
        self.blob_path(id).exists()
    }

    /// Cache the pending-state placeholder image for `id`.
    pub async fn put_placeholder_image(&self, id: &VideoId, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.placeholder_path(id);
        write_atomic(&path, bytes).await?;
        Ok(path)
    }

    /// Merge a partial update into the stored record (creating it if
    /// absent) and persist the result.
    ///
    /// If the merged record still references a remote video URL, the blob
    /// is eagerly downloaded; on success the reference is rewritten to be
    /// local-only, so a finished record is self-contained. A failed
    /// download keeps the reference and leaves any existing blob alone.
    pub async fn put_record(&self, patch: MediaRecordPatch) -> StoreResult<MediaRecord> {
        let lock = self.lock_for(&patch.id);
        let _guard = lock.lock().await;

        let mut record = match self.read_record_file(&patch.id).await {
            Some(mut existing) => {
                existing.apply(&patch);
                existing
            }
            None => patch.into_record(),
        };

        if self.has_blob(&record.id) {
            record.remote_video_ref = None;
        } else if let Some(url) = record.remote_video_ref.clone() {
            match self.fetcher.fetch(&url).await {
                Ok(bytes) => {
                    self.put(&record.id, &bytes).await?;
                    record.remote_video_ref = None;
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "Video download failed, keeping remote reference");
                }
            }
        }

        write_json_atomic(&self.record_path(&record.id), &record).await?;
        Ok(record)
    }

    /// Load the record for `id`; absent or unreadable records read as `None`.
    pub async fn get_record(&self, id: &VideoId) -> Option<MediaRecord> {
        self.read_record_file(id).await
    }

    /// Load every readable record, unordered.
    ///
    /// A placeholder-image path whose file no longer exists is cleared in
    /// the returned copy only; the record on disk is left as-is.
    pub async fn list_records(&self) -> StoreResult<Vec<MediaRecord>> {
        let mut records = Vec::new();

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                    continue;
                }
            };

            match serde_json::from_slice::<MediaRecord>(&bytes) {
                Ok(mut record) => {
                    if let Some(image) = &record.placeholder_image_path {
                        if !Path::new(image).exists() {
                            debug!(id = %record.id, image = %image, "Placeholder image missing, clearing reference");
                            record.placeholder_image_path = None;
                        }
                    }
                    records.push(record);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping corrupt record");
                }
            }
        }

        Ok(records)
    }

    /// Remove the record, blob, and placeholder image for `id`.
    ///
    /// Deleting an absent id is not an error.
    pub async fn delete_record(&self, id: &VideoId) -> StoreResult<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        remove_if_exists(&self.record_path(id)).await?;
        remove_if_exists(&self.blob_path(id)).await?;
        remove_if_exists(&self.placeholder_path(id)).await?;
        Ok(())
    }

    async fn read_record_file(&self, id: &VideoId) -> Option<MediaRecord> {
        let path = self.record_path(id);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to read record");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(id = %id, error = %e, "Corrupt record treated as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use aivid_models::GenerationId;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, fetcher: StubFetcher) -> AssetStore {
        AssetStore::new(dir.path().join("media"), Arc::new(fetcher)).unwrap()
    }

    fn pending_patch(id: &VideoId) -> MediaRecordPatch {
        MediaRecordPatch::new(id.clone())
            .with_display_name("Cyberpunk")
            .with_generation_id(GenerationId::from_string("gen-1"))
            .with_finished(false)
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        let path = store.put(&id, b"blob-bytes").await.unwrap();
        let found = store.get(&id).unwrap();

        assert_eq!(path, found);
        assert_eq!(std::fs::read(&found).unwrap(), b"blob-bytes");
    }

    #[tokio::test]
    async fn test_put_empty_blob() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        store.put(&id, b"").await.unwrap();

        assert_eq!(std::fs::read(store.get(&id).unwrap()).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_get_absent_blob() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());

        assert!(store.get(&VideoId::from_string("nope")).is_none());
    }

    #[tokio::test]
    async fn test_put_record_creates_then_merges() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        store.put_record(pending_patch(&id)).await.unwrap();

        let updated = store
            .put_record(MediaRecordPatch::new(id.clone()).with_placeholder_image_path("/tmp/x.jpg"))
            .await
            .unwrap();

        // Fields absent from the second patch are preserved.
        assert_eq!(updated.display_name, "Cyberpunk");
        assert_eq!(updated.generation_id.as_str(), "gen-1");
        assert_eq!(updated.placeholder_image_path.as_deref(), Some("/tmp/x.jpg"));
    }

    #[tokio::test]
    async fn test_put_record_eagerly_downloads_remote_ref() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::new().with_blob("http://x/a.mp4", b"result");
        let store = store_with(&dir, fetcher);
        let id = VideoId::from_string("vid-1");

        store.put_record(pending_patch(&id)).await.unwrap();
        let record = store
            .put_record(
                MediaRecordPatch::new(id.clone())
                    .with_remote_video_ref("http://x/a.mp4")
                    .with_finished(true),
            )
            .await
            .unwrap();

        assert!(record.remote_video_ref.is_none());
        assert!(record.is_finished());
        assert_eq!(std::fs::read(store.get(&id).unwrap()).unwrap(), b"result");

        // The persisted copy matches the returned one.
        let reloaded = store.get_record(&id).await.unwrap();
        assert_eq!(reloaded, record);
    }

    #[tokio::test]
    async fn test_put_record_failed_download_keeps_reference_and_no_blob() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        let record = store
            .put_record(pending_patch(&id).with_remote_video_ref("http://x/missing.mp4"))
            .await
            .unwrap();

        assert_eq!(record.remote_video_ref.as_deref(), Some("http://x/missing.mp4"));
        assert!(store.get(&id).is_none());

        // No stray temp files from the failed download.
        let stray: Vec<_> = std::fs::read_dir(dir.path().join("media"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(stray.is_empty());
    }

    #[tokio::test]
    async fn test_put_record_skips_download_when_blob_cached() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::new().with_blob("http://x/a.mp4", b"result");
        let store = store_with(&dir, fetcher);
        let id = VideoId::from_string("vid-1");

        store.put(&id, b"already-local").await.unwrap();
        let record = store
            .put_record(pending_patch(&id).with_remote_video_ref("http://x/a.mp4"))
            .await
            .unwrap();

        assert!(record.remote_video_ref.is_none());
        assert_eq!(std::fs::read(store.get(&id).unwrap()).unwrap(), b"already-local");
    }

    #[tokio::test]
    async fn test_finish_clears_placeholder_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        store
            .put_record(pending_patch(&id).with_placeholder_image_path("/tmp/ph.jpg"))
            .await
            .unwrap();
        store
            .put_record(MediaRecordPatch::new(id.clone()).with_finished(true))
            .await
            .unwrap();

        let record = store.get_record(&id).await.unwrap();
        assert!(record.is_finished());
        assert!(record.placeholder_image_path.is_none());
    }

    #[tokio::test]
    async fn test_list_records_skips_corrupt_entries() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());

        store
            .put_record(pending_patch(&VideoId::from_string("vid-1")))
            .await
            .unwrap();
        std::fs::write(dir.path().join("media").join("junk.json"), b"{not json").unwrap();

        let records = store.list_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "vid-1");
    }

    #[tokio::test]
    async fn test_list_records_clears_dangling_placeholder_in_memory_only() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        let missing = dir.path().join("gone.jpg");
        store
            .put_record(pending_patch(&id).with_placeholder_image_path(missing.to_string_lossy()))
            .await
            .unwrap();

        let listed = store.list_records().await.unwrap();
        assert!(listed[0].placeholder_image_path.is_none());

        // Disk copy still carries the stale reference.
        let on_disk = store.get_record(&id).await.unwrap();
        assert!(on_disk.placeholder_image_path.is_some());
    }

    #[tokio::test]
    async fn test_placeholder_image_roundtrip_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        let image_path = store.put_placeholder_image(&id, b"jpeg-bytes").await.unwrap();
        store
            .put_record(pending_patch(&id).with_placeholder_image_path(image_path.to_string_lossy()))
            .await
            .unwrap();

        let listed = store.list_records().await.unwrap();
        assert_eq!(
            listed[0].placeholder_image_path.as_deref(),
            Some(image_path.to_str().unwrap())
        );

        store.delete_record(&id).await.unwrap();
        assert!(!image_path.exists());
    }

    #[tokio::test]
    async fn test_delete_record_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_with(&dir, StubFetcher::new());
        let id = VideoId::from_string("vid-1");

        store.put_record(pending_patch(&id)).await.unwrap();
        store.put(&id, b"blob").await.unwrap();

        store.delete_record(&id).await.unwrap();
        store.delete_record(&id).await.unwrap();

        assert!(store.get(&id).is_none());
        assert!(store.get_record(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_patches_to_same_id_both_land() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_with(&dir, StubFetcher::new()));
        let id = VideoId::from_string("vid-1");

        store.put_record(pending_patch(&id)).await.unwrap();

        let a = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                store
                    .put_record(MediaRecordPatch::new(id).with_display_name("Renamed"))
                    .await
            })
        };
        let b = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move {
                store
                    .put_record(MediaRecordPatch::new(id).with_placeholder_image_path("/tmp/p.jpg"))
                    .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let record = store.get_record(&id).await.unwrap();
        assert_eq!(record.display_name, "Renamed");
        assert_eq!(record.placeholder_image_path.as_deref(), Some("/tmp/p.jpg"));
    }
}
