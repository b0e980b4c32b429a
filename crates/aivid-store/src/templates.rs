//! Flat-file template catalog cache + preview clip cache.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use aivid_models::Template;

use crate::error::{StoreError, StoreResult};
use crate::fetch::BlobFetcher;
use crate::fs::{write_atomic, write_json_atomic};

const CATALOG_FILE: &str = "templates.json";

/// Whole-snapshot cache of the effect template catalog.
///
/// The catalog file is replaced wholesale on refresh; preview clips are
/// cached per template id and survive catalog replacements.
pub struct TemplateCache {
    dir: PathBuf,
    fetcher: Arc<dyn BlobFetcher>,
    write_lock: Mutex<()>,
}

impl TemplateCache {
    /// Open (and create if needed) the cache at `dir`.
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn BlobFetcher>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            fetcher,
            write_lock: Mutex::new(()),
        })
    }

    fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }

    /// Path of the cached preview clip for a template.
    pub fn preview_path(&self, template_id: i64) -> PathBuf {
        self.dir.join(format!("{}.mp4", template_id))
    }

    /// Replace the cached catalog with a new snapshot.
    pub async fn replace_all(&self, templates: &[Template]) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        write_json_atomic(&self.catalog_path(), templates).await?;
        debug!(count = templates.len(), "Template catalog cached");
        Ok(())
    }

    /// Load the cached catalog.
    ///
    /// An absent or corrupt cache file reads as an empty catalog.
    pub async fn load_all(&self) -> Vec<Template> {
        let path = self.catalog_path();

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached template catalog");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read template catalog");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(templates) => templates,
            Err(e) => {
                warn!(error = %e, "Corrupt template catalog treated as empty");
                Vec::new()
            }
        }
    }

    /// Return the cached preview clip for a template, downloading it
    /// first if it is not on disk yet.
    pub async fn cache_preview(&self, template: &Template) -> StoreResult<PathBuf> {
        let path = self.preview_path(template.id);
        if path.exists() {
            debug!(template_id = template.id, "Preview already cached");
            return Ok(path);
        }

        self.refresh_preview(template).await
    }

    /// Download the preview clip unconditionally, replacing any cached
    /// copy. Used when a template's `preview_url` changed.
    pub async fn refresh_preview(&self, template: &Template) -> StoreResult<PathBuf> {
        if template.preview_url.is_empty() {
            return Err(StoreError::NoPreview(template.id));
        }

        let path = self.preview_path(template.id);
        let bytes = self.fetcher.fetch(&template.preview_url).await?;
        write_atomic(&path, &bytes).await?;
        debug!(template_id = template.id, path = %path.display(), "Preview cached");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use tempfile::TempDir;

    fn template(id: i64, preview: &str) -> Template {
        Template {
            id,
            engine: "pv".into(),
            position: None,
            effect_name: format!("Effect {id}"),
            preview_url: preview.into(),
            preview_small_url: String::new(),
            local_video_name: None,
        }
    }

    #[tokio::test]
    async fn test_replace_all_then_load_all() {
        let dir = TempDir::new().unwrap();
        let cache = TemplateCache::new(dir.path().join("templates"), Arc::new(StubFetcher::new()))
            .unwrap();

        let templates = vec![template(1, "https://cdn/a.mp4"), template(2, "https://cdn/b.mp4")];
        cache.replace_all(&templates).await.unwrap();

        assert_eq!(cache.load_all().await, templates);
    }

    #[tokio::test]
    async fn test_replace_all_is_wholesale() {
        let dir = TempDir::new().unwrap();
        let cache = TemplateCache::new(dir.path().join("templates"), Arc::new(StubFetcher::new()))
            .unwrap();

        cache
            .replace_all(&[template(1, "https://cdn/a.mp4")])
            .await
            .unwrap();
        cache
            .replace_all(&[template(2, "https://cdn/b.mp4")])
            .await
            .unwrap();

        let loaded = cache.load_all().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 2);
    }

    #[tokio::test]
    async fn test_load_all_absent_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = TemplateCache::new(dir.path().join("templates"), Arc::new(StubFetcher::new()))
            .unwrap();

        assert!(cache.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_corrupt_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("templates");
        let cache = TemplateCache::new(&cache_dir, Arc::new(StubFetcher::new())).unwrap();

        std::fs::write(cache_dir.join(CATALOG_FILE), b"][").unwrap();

        assert!(cache.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_preview_downloads_once() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(StubFetcher::new().with_blob("https://cdn/a.mp4", b"clip"));
        let cache =
            TemplateCache::new(dir.path().join("templates"), fetcher.clone()).unwrap();
        let t = template(1, "https://cdn/a.mp4");

        let first = cache.cache_preview(&t).await.unwrap();
        let second = cache.cache_preview(&t).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"clip");
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_preview_rejects_empty_url() {
        let dir = TempDir::new().unwrap();
        let cache = TemplateCache::new(dir.path().join("templates"), Arc::new(StubFetcher::new()))
            .unwrap();

        let err = cache.cache_preview(&template(9, "")).await.unwrap_err();
        assert!(matches!(err, StoreError::NoPreview(9)));
    }

    #[tokio::test]
    async fn test_cache_preview_failed_download_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("templates");
        let cache = TemplateCache::new(&cache_dir, Arc::new(StubFetcher::new())).unwrap();
        let t = template(3, "https://cdn/missing.mp4");

        assert!(cache.cache_preview(&t).await.is_err());
        assert!(!cache.preview_path(3).exists());
    }
}
