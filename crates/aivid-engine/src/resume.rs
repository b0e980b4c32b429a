//! Cold-start resumption of in-flight generation jobs.

use tracing::{debug, info};

use aivid_store::AssetStore;

use crate::error::EngineResult;
use crate::poller::{GenerationPoller, PollHandle, PollJob};
use crate::tracker::GenerationJobTracker;

/// Resume polling every pending job that is not already finished.
///
/// For each id in the tracker's pending list, the cache is consulted: a
/// record marked finished means the job completed in a previous run and
/// the entry is just history; anything else (unfinished record, or no
/// record at all) gets exactly one new polling task.
pub async fn resume_pending(
    poller: &GenerationPoller,
    tracker: &GenerationJobTracker,
    store: &AssetStore,
) -> EngineResult<Vec<PollHandle>> {
    let records = store.list_records().await?;
    let mut handles = Vec::new();

    for generation_id in tracker.pending_jobs() {
        let existing = records
            .iter()
            .find(|record| record.generation_id == generation_id);

        match existing {
            Some(record) if record.is_finished() => {
                debug!(
                    generation_id = %generation_id,
                    record_id = %record.id,
                    "Pending entry already finished, skipping"
                );
            }
            Some(record) => {
                info!(
                    generation_id = %generation_id,
                    record_id = %record.id,
                    "Resuming unfinished generation"
                );
                handles.push(poller.spawn(PollJob::from_record(record)));
            }
            None => {
                info!(generation_id = %generation_id, "Resuming generation with no cached record");
                handles.push(poller.spawn(PollJob::new(generation_id.clone(), "")));
            }
        }
    }

    Ok(handles)
}
