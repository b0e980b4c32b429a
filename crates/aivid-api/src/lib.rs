//! HTTP client for the AiVid generation backend.
//!
//! This crate provides:
//! - Generation job submission (multipart photo + template/prompt)
//! - Generation status queries
//! - Template catalog fetching
//! - Generic blob download for result assets and preview clips

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiConfig, GenerationClient};
pub use error::{ApiError, ApiResult};
pub use types::{ApiEnvelope, ImageAttachment, SubmissionData, SubmitRequest};
