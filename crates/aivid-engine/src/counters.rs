//! Settings-backed counters and client identity.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use aivid_store::{KeyValueSettings, StoreResult};

const GENERATION_COUNT_KEY: &str = "generationCount";
const USER_ID_KEY: &str = "userId";

/// User-facing count of completed generation submissions.
///
/// Incremented optimistically when a job is submitted; decremented again
/// if the user's first-ever generation fails terminally (rollback).
pub struct GenerationCounter {
    settings: Arc<dyn KeyValueSettings>,
}

impl GenerationCounter {
    pub fn new(settings: Arc<dyn KeyValueSettings>) -> Self {
        Self { settings }
    }

    pub fn get(&self) -> u64 {
        self.settings
            .get_raw(GENERATION_COUNT_KEY)
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }

    /// Whether the next submission is the user's first generation.
    pub fn is_first_generation(&self) -> bool {
        self.get() == 0
    }

    pub fn increment(&self) -> StoreResult<u64> {
        let next = self.get() + 1;
        self.settings.set_raw(GENERATION_COUNT_KEY, json!(next))?;
        Ok(next)
    }

    /// Saturating decrement, for rolling back an optimistic increment.
    pub fn decrement(&self) -> StoreResult<u64> {
        let next = self.get().saturating_sub(1);
        self.settings.set_raw(GENERATION_COUNT_KEY, json!(next))?;
        Ok(next)
    }
}

/// Stable client identity sent with submissions.
///
/// Generated on first access and persisted.
pub fn client_user_id(settings: &dyn KeyValueSettings) -> StoreResult<String> {
    if let Some(existing) = settings.get_raw(USER_ID_KEY).and_then(|v| {
        v.as_str().map(str::to_string)
    }) {
        return Ok(existing);
    }

    let user_id = Uuid::new_v4().to_string();
    settings.set_raw(USER_ID_KEY, json!(user_id))?;
    Ok(user_id)
}
