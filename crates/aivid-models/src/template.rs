//! Effect template descriptors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One remote effect template, as served by the template endpoint.
///
/// `local_video_name` is client-side state: the file name of the cached
/// preview clip, populated after the clip has been downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Server-assigned template ID (collection identity)
    pub id: i64,

    /// Engine tag the template runs on
    #[serde(rename = "ai")]
    pub engine: String,

    /// Ordering hint within listings
    #[serde(rename = "pos", skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,

    /// Display name of the effect
    #[serde(rename = "effect")]
    pub effect_name: String,

    /// URL of the full-size preview clip
    #[serde(rename = "preview")]
    pub preview_url: String,

    /// URL of the small preview clip
    #[serde(rename = "previewSmall")]
    pub preview_small_url: String,

    /// File name of the locally cached preview clip, once downloaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_video_name: Option<String>,
}

impl Template {
    /// Whether the preview clip has been cached locally.
    pub fn has_local_preview(&self) -> bool {
        self.local_video_name.is_some()
    }

    /// Whether the remote preview changed relative to a cached entry.
    ///
    /// Entries are compared by `preview_url` only; other metadata changes
    /// do not invalidate an already-downloaded clip.
    pub fn preview_changed(&self, cached: &Template) -> bool {
        self.preview_url != cached.preview_url
    }
}
