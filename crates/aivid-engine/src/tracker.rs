//! Bounded memory of recently submitted generation jobs.
//!
//! Persisted in settings storage and consulted on cold start to resume
//! polling jobs the app was killed in the middle of. The cache record is
//! the source of truth for job state; this list only remembers which
//! jobs might still be in flight.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use aivid_models::GenerationId;
use aivid_store::{KeyValueSettings, StoreResult};

const PENDING_JOBS_KEY: &str = "recentVideoGenerationIds";

/// Default number of job ids remembered.
const DEFAULT_CAPACITY: usize = 2;

/// Rolling list of in-flight generation job ids.
pub struct GenerationJobTracker {
    settings: Arc<dyn KeyValueSettings>,
    capacity: usize,
}

impl GenerationJobTracker {
    pub fn new(settings: Arc<dyn KeyValueSettings>) -> Self {
        Self::with_capacity(settings, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(settings: Arc<dyn KeyValueSettings>, capacity: usize) -> Self {
        Self { settings, capacity }
    }

    /// Append a job id, evicting the oldest entry beyond capacity.
    pub fn record_pending(&self, id: &GenerationId) -> StoreResult<()> {
        let mut ids = self.raw_ids();
        ids.push(id.as_str().to_string());
        while ids.len() > self.capacity {
            let evicted = ids.remove(0);
            debug!(generation_id = %evicted, "Evicted oldest pending job id");
        }

        self.settings.set_raw(PENDING_JOBS_KEY, json!(ids))
    }

    /// Job ids still believed to be in flight, most recent last.
    pub fn pending_jobs(&self) -> Vec<GenerationId> {
        self.raw_ids()
            .into_iter()
            .map(GenerationId::from_string)
            .collect()
    }

    fn raw_ids(&self) -> Vec<String> {
        match self.settings.get_raw(PENDING_JOBS_KEY) {
            Some(Value::Array(values)) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}
