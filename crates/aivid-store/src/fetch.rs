//! Blob fetch capability.
//!
//! The stores download remote assets (result videos, preview clips)
//! through this seam instead of owning an HTTP client, so they stay
//! testable in isolation.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// A failed blob download.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Downloads bytes from an http(s) URL.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[cfg(test)]
pub(crate) mod stub {
    //! In-memory fetcher used by the store tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct StubFetcher {
        blobs: HashMap<String, Vec<u8>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_blob(mut self, url: &str, bytes: &[u8]) -> Self {
            self.blobs.insert(url.to_string(), bytes.to_vec());
            self
        }
    }

    #[async_trait]
    impl BlobFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.blobs
                .get(url)
                .map(|b| Bytes::from(b.clone()))
                .ok_or_else(|| FetchError::new(format!("no blob for {url}")))
        }
    }
}
