//! Interval-based generation status polling.
//!
//! One spawned task per in-flight job: `Submitted → Polling →
//! {Finished, Invalid, Failed}`. Polling is the only state with repeated
//! transitions; a terminal outcome is delivered exactly once through the
//! awaited [`PollHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aivid_api::GenerationClient;
use aivid_models::{GenerationId, GenerationStatus, MediaRecord, MediaRecordPatch, VideoId};
use aivid_store::AssetStore;

use crate::error::{EngineError, EngineResult};
use crate::slots::GenerationSlots;

/// Polling configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status queries
    pub interval: Duration,
    /// Consecutive transient (5xx) failures tolerated before giving up
    pub max_transient_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_transient_failures: 120,
        }
    }
}

impl PollConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(
                std::env::var("AIVID_POLL_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            max_transient_failures: std::env::var("AIVID_POLL_MAX_TRANSIENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        }
    }
}

/// One job to poll to completion.
#[derive(Debug, Clone)]
pub struct PollJob {
    /// Cache record the poll writes through
    pub record_id: VideoId,
    /// Server-side job identifier
    pub generation_id: GenerationId,
    /// Human label for the record (effect name or prompt)
    pub display_name: String,
    /// Placeholder image shown while pending, if one was captured
    pub placeholder_image_path: Option<String>,
}

impl PollJob {
    /// Create a job with a fresh record id.
    pub fn new(generation_id: GenerationId, display_name: impl Into<String>) -> Self {
        Self {
            record_id: VideoId::new(),
            generation_id,
            display_name: display_name.into(),
            placeholder_image_path: None,
        }
    }

    /// Reuse an existing record id (resume path).
    pub fn with_record_id(mut self, record_id: VideoId) -> Self {
        self.record_id = record_id;
        self
    }

    pub fn with_placeholder(mut self, path: impl Into<String>) -> Self {
        self.placeholder_image_path = Some(path.into());
        self
    }

    /// Build a job resuming an existing cache record.
    pub fn from_record(record: &MediaRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            generation_id: record.generation_id.clone(),
            display_name: record.display_name.clone(),
            placeholder_image_path: record.placeholder_image_path.clone(),
        }
    }
}

/// Terminal result of one polling task.
#[derive(Debug)]
pub enum PollOutcome {
    /// Job finished; the blob is cached and the record persisted
    Finished(MediaRecord),
    /// Job reached a terminal failure (server rejection, transport,
    /// storage, or the transient-retry cap)
    Failed(EngineError),
    /// `cancel()` stopped the loop before a terminal status
    Cancelled,
}

impl PollOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, PollOutcome::Finished(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollOutcome::Cancelled)
    }
}

/// Handle to a spawned polling task.
pub struct PollHandle {
    generation_id: GenerationId,
    cancel: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// The job this handle polls.
    pub fn generation_id(&self) -> &GenerationId {
        &self.generation_id
    }

    /// Stop future ticks.
    ///
    /// Takes effect at the next tick boundary; an in-flight status
    /// request completes and its result is discarded.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the terminal outcome.
    pub async fn join(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => PollOutcome::Failed(EngineError::Internal(format!(
                "poll task aborted: {e}"
            ))),
        }
    }
}

/// Spawns and drives polling tasks.
pub struct GenerationPoller {
    client: Arc<GenerationClient>,
    store: Arc<AssetStore>,
    slots: GenerationSlots,
    config: PollConfig,
}

impl GenerationPoller {
    pub fn new(
        client: Arc<GenerationClient>,
        store: Arc<AssetStore>,
        slots: GenerationSlots,
        config: PollConfig,
    ) -> Self {
        Self {
            client,
            store,
            slots,
            config,
        }
    }

    /// Start polling `job`.
    ///
    /// Waits cooperatively for a free slot before the first tick; never
    /// rejects for lack of capacity.
    pub fn spawn(&self, job: PollJob) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let client = self.client.clone();
        let store = self.store.clone();
        let slots = self.slots.clone();
        let config = self.config.clone();
        let generation_id = job.generation_id.clone();

        let task = tokio::spawn(async move {
            run_poll(client, store, slots, config, job, cancel_rx).await
        });

        PollHandle {
            generation_id,
            cancel: cancel_tx,
            task,
        }
    }
}

async fn run_poll(
    client: Arc<GenerationClient>,
    store: Arc<AssetStore>,
    slots: GenerationSlots,
    config: PollConfig,
    job: PollJob,
    mut cancel: watch::Receiver<bool>,
) -> PollOutcome {
    let _slot = match slots.acquire().await {
        Ok(permit) => permit,
        Err(e) => return PollOutcome::Failed(e),
    };

    if *cancel.borrow() {
        return PollOutcome::Cancelled;
    }

    // Seed the pending record so the job survives an app restart.
    let mut seed = MediaRecordPatch::new(job.record_id.clone())
        .with_display_name(&job.display_name)
        .with_generation_id(job.generation_id.clone())
        .with_finished(false);
    if let Some(image) = &job.placeholder_image_path {
        seed = seed.with_placeholder_image_path(image.clone());
    }
    if let Err(e) = store.put_record(seed).await {
        return PollOutcome::Failed(e.into());
    }

    info!(
        generation_id = %job.generation_id,
        record_id = %job.record_id,
        "Polling generation job"
    );

    let mut transient_failures = 0u32;

    loop {
        if *cancel.borrow() {
            return PollOutcome::Cancelled;
        }

        let result = client.generation_status(&job.generation_id).await;

        if *cancel.borrow() {
            // Cancelled mid-request: the tick's result is discarded.
            return PollOutcome::Cancelled;
        }

        match result {
            Ok(update) => match update.status {
                GenerationStatus::Finished => match update.result_url {
                    Some(url) => match finalize(&client, &store, &job, &url).await {
                        Ok(record) => {
                            info!(
                                generation_id = %job.generation_id,
                                record_id = %record.id,
                                "Generation finished and cached"
                            );
                            return PollOutcome::Finished(record);
                        }
                        Err(EngineError::Api(e)) if e.is_transient() => {
                            transient_failures += 1;
                            if transient_failures >= config.max_transient_failures {
                                return PollOutcome::Failed(EngineError::TransientLimit {
                                    attempts: transient_failures,
                                });
                            }
                            warn!(
                                generation_id = %job.generation_id,
                                error = %e,
                                "Result download hit a server error, will retry"
                            );
                        }
                        Err(e) => return PollOutcome::Failed(e),
                    },
                    None => {
                        warn!(
                            generation_id = %job.generation_id,
                            "Finished status without result URL, continuing to poll"
                        );
                    }
                },
                GenerationStatus::Invalid | GenerationStatus::Error => {
                    return PollOutcome::Failed(EngineError::JobInvalid {
                        status: update.status,
                    });
                }
                GenerationStatus::Pending | GenerationStatus::Processing => {
                    transient_failures = 0;
                    if let Some(progress) = update.progress {
                        debug!(
                            generation_id = %job.generation_id,
                            status = %update.status,
                            progress = progress,
                            "Generation in progress"
                        );
                    }
                }
            },
            Err(e) if e.is_transient() => {
                transient_failures += 1;
                if transient_failures >= config.max_transient_failures {
                    return PollOutcome::Failed(EngineError::TransientLimit {
                        attempts: transient_failures,
                    });
                }
                warn!(
                    generation_id = %job.generation_id,
                    error = %e,
                    failures = transient_failures,
                    "Transient server error, continuing to poll"
                );
            }
            Err(e) => return PollOutcome::Failed(e.into()),
        }

        // One interval between ticks; a cancel wakes the sleep early.
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() {
                    // Handle dropped without cancelling; keep the cadence.
                    tokio::time::sleep(config.interval).await;
                }
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

/// Download the result and persist the finished record.
async fn finalize(
    client: &GenerationClient,
    store: &AssetStore,
    job: &PollJob,
    result_url: &str,
) -> EngineResult<MediaRecord> {
    let bytes = client.download(result_url).await?;
    store.put(&job.record_id, &bytes).await?;

    let record = store
        .put_record(MediaRecordPatch::new(job.record_id.clone()).with_finished(true))
        .await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_config_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.max_transient_failures, 120);
    }

    #[test]
    fn test_poll_job_from_record() {
        let record = MediaRecord::new(
            VideoId::from_string("vid-1"),
            "Melt",
            GenerationId::from_string("gen-1"),
        );
        let job = PollJob::from_record(&record);

        assert_eq!(job.record_id.as_str(), "vid-1");
        assert_eq!(job.generation_id.as_str(), "gen-1");
        assert_eq!(job.display_name, "Melt");
    }

    #[test]
    fn test_poll_job_new_generates_record_id() {
        let a = PollJob::new(GenerationId::from_string("gen-1"), "Melt");
        let b = PollJob::new(GenerationId::from_string("gen-1"), "Melt");
        assert_ne!(a.record_id, b.record_id);
    }
}
