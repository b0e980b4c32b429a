//! Generation engine for the AiVid client core.
//!
//! This crate drives the moving parts around the caches:
//! - [`GenerationPoller`]: interval polling of in-flight jobs until a
//!   terminal state, with slot-bounded concurrency
//! - [`GenerationJobTracker`]: bounded pending-job memory for restart
//!   resumption
//! - [`resume_pending`]: cold-start recovery of unfinished jobs
//! - [`refresh_templates`]: catalog refresh with preview-aware diffing

pub mod counters;
pub mod error;
pub mod fetch;
pub mod poller;
pub mod resume;
pub mod slots;
pub mod templates;
pub mod tracker;

pub use counters::{client_user_id, GenerationCounter};
pub use error::{EngineError, EngineResult};
pub use fetch::HttpBlobFetcher;
pub use poller::{GenerationPoller, PollConfig, PollHandle, PollJob, PollOutcome};
pub use resume::resume_pending;
pub use slots::GenerationSlots;
pub use templates::refresh_templates;
pub use tracker::GenerationJobTracker;
