//! Template catalog refresh with preview-aware diffing.

use tracing::{info, warn};

use aivid_api::GenerationClient;
use aivid_models::Template;
use aivid_store::TemplateCache;

use crate::error::EngineResult;

/// Refresh the template catalog from the backend.
///
/// Server entries are diffed against the cached snapshot by `id`:
/// - unchanged `preview_url` keeps the cached entry, preserving its
///   already-downloaded preview clip;
/// - a changed preview is re-downloaded before the updated entry is
///   accepted;
/// - a new entry is accepted only once its preview clip is cached.
///
/// A failed preview download keeps the previously cached entry when one
/// exists, and drops the new entry otherwise. The merged list replaces
/// the cached snapshot wholesale and is returned to the caller.
pub async fn refresh_templates(
    client: &GenerationClient,
    cache: &TemplateCache,
    app_id: &str,
) -> EngineResult<Vec<Template>> {
    let cached = cache.load_all().await;
    let server = client.fetch_templates(app_id).await?;

    let mut merged = Vec::with_capacity(server.len());

    for template in server {
        let prior = cached.iter().find(|c| c.id == template.id);

        match prior {
            Some(cached_entry) if !template.preview_changed(cached_entry) => {
                merged.push(cached_entry.clone());
            }
            _ => {
                let download = match prior {
                    Some(_) => cache.refresh_preview(&template).await,
                    None => cache.cache_preview(&template).await,
                };

                match download {
                    Ok(path) => {
                        let mut accepted = template;
                        accepted.local_video_name = path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned());
                        merged.push(accepted);
                    }
                    Err(e) => {
                        warn!(template_id = template.id, error = %e, "Preview download failed");
                        if let Some(cached_entry) = prior {
                            merged.push(cached_entry.clone());
                        }
                    }
                }
            }
        }
    }

    cache.replace_all(&merged).await?;
    info!(count = merged.len(), "Template catalog refreshed");

    Ok(merged)
}
