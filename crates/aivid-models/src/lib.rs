//! Shared data models for the AiVid client core.
//!
//! This crate provides Serde-serializable types for:
//! - Cached media records and partial-update patches
//! - Effect templates
//! - Generation job identifiers and status
//! - Remote URL validation helpers

pub mod generation;
pub mod ids;
pub mod media;
pub mod template;
pub mod utils;

// Re-export common types
pub use generation::{GenerationStatus, GenerationUpdate};
pub use ids::{GenerationId, VideoId};
pub use media::{MediaRecord, MediaRecordPatch};
pub use template::Template;
pub use utils::{parse_remote_url, MediaUrlError};
