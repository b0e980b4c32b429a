//! Concurrency slots for active polling loops.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{EngineError, EngineResult};

/// Bounded pool of polling slots.
///
/// The app allows a small fixed number of simultaneously active
/// generations (two, by default). Acquiring waits cooperatively for a
/// free slot instead of rejecting.
#[derive(Clone)]
pub struct GenerationSlots {
    semaphore: Arc<Semaphore>,
}

impl GenerationSlots {
    /// Create a pool with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Wait for a free slot; the slot is released when the permit drops.
    pub async fn acquire(&self) -> EngineResult<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EngineError::Internal(format!("slot pool closed: {e}")))
    }

    /// Number of currently free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for GenerationSlots {
    fn default() -> Self {
        Self::new(2)
    }
}
