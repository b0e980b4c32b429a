//! End-to-end demo: submit a generation job and poll it to completion.
//!
//! Needs a reachable backend. Configure via environment (or `.env`):
//! `AIVID_API_URL`, `AIVID_API_TOKEN`, `AIVID_APP_ID`,
//! `AIVID_DEMO_PROMPT`.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aivid_api::{GenerationClient, SubmitRequest};
use aivid_engine::{
    client_user_id, GenerationCounter, GenerationJobTracker, GenerationPoller, GenerationSlots,
    HttpBlobFetcher, PollConfig, PollJob, PollOutcome,
};
use aivid_store::{AssetStore, JsonFileSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("aivid=info".parse()?))
        .init();

    let cache_root = std::env::temp_dir().join("aivid-demo");
    let settings = Arc::new(JsonFileSettings::open(cache_root.join("settings.json"))?);

    let client = Arc::new(GenerationClient::from_env()?);
    let fetcher = Arc::new(HttpBlobFetcher::new(client.clone()));
    let store = Arc::new(AssetStore::new(cache_root.join("media"), fetcher)?);

    let app_id = std::env::var("AIVID_APP_ID").unwrap_or_else(|_| "com.aivid.app".to_string());
    let prompt = std::env::var("AIVID_DEMO_PROMPT")
        .unwrap_or_else(|_| "a cat surfing a wave at sunset".to_string());
    let user_id = client_user_id(settings.as_ref())?;

    let counter = GenerationCounter::new(settings.clone());
    let is_first_generation = counter.is_first_generation();
    counter.increment()?;

    let request = SubmitRequest::for_prompt(&prompt, &user_id, &app_id);
    let generation_id = client
        .submit_generation(&request)
        .await
        .context("job submission failed")?;
    info!(generation_id = %generation_id, "Job submitted");

    let tracker = GenerationJobTracker::new(settings.clone());
    tracker.record_pending(&generation_id)?;

    let poller = GenerationPoller::new(
        client,
        store.clone(),
        GenerationSlots::default(),
        PollConfig::from_env(),
    );

    match poller.spawn(PollJob::new(generation_id, &prompt)).join().await {
        PollOutcome::Finished(record) => {
            let path = store.get(&record.id).context("blob missing after finish")?;
            info!(record_id = %record.id, path = %path.display(), "Generation cached");
        }
        PollOutcome::Failed(e) => {
            if is_first_generation {
                counter.decrement()?;
            }
            anyhow::bail!("generation failed: {e}");
        }
        PollOutcome::Cancelled => info!("Polling cancelled"),
    }

    Ok(())
}
