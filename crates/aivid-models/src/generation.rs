//! Generation job status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Server-reported status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Generation finished; a result reference is available
    Finished,
    /// Server rejected the job (bad input)
    Invalid,
    /// Server-side failure
    Error,
    /// Job is actively being processed
    Processing,
    /// Queued or any status string the client does not recognize
    #[default]
    #[serde(other)]
    Pending,
}

impl GenerationStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Finished => "finished",
            GenerationStatus::Invalid => "invalid",
            GenerationStatus::Error => "error",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Pending => "pending",
        }
    }

    /// Check if this is a terminal state (no more polling transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStatus::Finished | GenerationStatus::Invalid | GenerationStatus::Error
        )
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One status snapshot for an in-flight generation job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationUpdate {
    /// Current status
    pub status: GenerationStatus,
    /// Download URL for the result, present once finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    /// Progress percentage (0-100), when the backend reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl GenerationUpdate {
    /// Check if this update reports a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
