//! Engine error types.

use thiserror::Error;

use aivid_api::ApiError;
use aivid_models::GenerationStatus;
use aivid_store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by polling and cache coordination.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The server declared the job invalid or failed; the caller rolls
    /// back any optimistic counters.
    #[error("Generation job reported terminal status '{status}'")]
    JobInvalid { status: GenerationStatus },

    /// Consecutive transient server errors exceeded the configured cap.
    #[error("Gave up after {attempts} consecutive transient server errors")]
    TransientLimit { attempts: u32 },

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the caller should offer a manual retry affordance.
    ///
    /// Terminal job rejections are not retryable with the same input;
    /// transport and storage failures are.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EngineError::JobInvalid { .. })
    }
}
