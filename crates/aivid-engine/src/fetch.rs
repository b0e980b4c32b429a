//! HTTP-backed blob fetcher for the stores.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use aivid_api::GenerationClient;
use aivid_store::{BlobFetcher, FetchError};

/// [`BlobFetcher`] backed by the generation backend client.
pub struct HttpBlobFetcher {
    client: Arc<GenerationClient>,
}

impl HttpBlobFetcher {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.client
            .download(url)
            .await
            .map_err(|e| FetchError::new(e.to_string()))
    }
}
