//! Cached media records and partial-update patches.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{GenerationId, VideoId};

/// Metadata for one cached or in-progress media item.
///
/// Persisted as one JSON file per `id`, next to the companion blob file.
/// Field names follow the original wire format (`image` for the
/// placeholder path, `video` for the remote reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Unique record ID (also names the blob file)
    pub id: VideoId,

    /// Human label (effect name or prompt)
    #[serde(rename = "name")]
    pub display_name: String,

    /// Remote URL of the generated video; cleared once the blob is local
    #[serde(rename = "video", skip_serializing_if = "Option::is_none")]
    pub remote_video_ref: Option<String>,

    /// Path to the locally cached placeholder image shown while pending
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub placeholder_image_path: Option<String>,

    /// Unset/false = pending, true = terminal success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_finished: Option<bool>,

    /// Creation timestamp, used for descending sort in listings
    pub created_at: DateTime<Utc>,

    /// Server-side job identifier this record corresponds to
    pub generation_id: GenerationId,
}

impl MediaRecord {
    /// Create a new pending record.
    pub fn new(
        id: VideoId,
        display_name: impl Into<String>,
        generation_id: GenerationId,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            remote_video_ref: None,
            placeholder_image_path: None,
            is_finished: Some(false),
            created_at: Utc::now(),
            generation_id,
        }
    }

    /// Whether the record has reached terminal success.
    pub fn is_finished(&self) -> bool {
        self.is_finished == Some(true)
    }

    /// Apply a partial update, preserving fields the patch does not carry.
    ///
    /// Once the merged record is finished, the placeholder image reference
    /// is dropped: a finished record owns exactly one visual
    /// representation.
    pub fn apply(&mut self, patch: &MediaRecordPatch) {
        if let Some(name) = &patch.display_name {
            self.display_name = name.clone();
        }
        if let Some(video) = &patch.remote_video_ref {
            self.remote_video_ref = Some(video.clone());
        }
        if let Some(image) = &patch.placeholder_image_path {
            self.placeholder_image_path = Some(image.clone());
        }
        if let Some(finished) = patch.is_finished {
            self.is_finished = Some(finished);
        }
        if let Some(generation_id) = &patch.generation_id {
            self.generation_id = generation_id.clone();
        }

        if self.is_finished() {
            self.placeholder_image_path = None;
        }
    }
}

/// Partial update for a [`MediaRecord`].
///
/// `None` fields preserve the stored value; merging is field-wise
/// last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct MediaRecordPatch {
    pub id: VideoId,
    pub display_name: Option<String>,
    pub remote_video_ref: Option<String>,
    pub placeholder_image_path: Option<String>,
    pub is_finished: Option<bool>,
    pub generation_id: Option<GenerationId>,
}

impl MediaRecordPatch {
    /// Create an empty patch for the given record ID.
    pub fn new(id: VideoId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_remote_video_ref(mut self, url: impl Into<String>) -> Self {
        self.remote_video_ref = Some(url.into());
        self
    }

    pub fn with_placeholder_image_path(mut self, path: impl Into<String>) -> Self {
        self.placeholder_image_path = Some(path.into());
        self
    }

    pub fn with_finished(mut self, finished: bool) -> Self {
        self.is_finished = Some(finished);
        self
    }

    pub fn with_generation_id(mut self, generation_id: GenerationId) -> Self {
        self.generation_id = Some(generation_id);
        self
    }

    /// Materialize a record from this patch alone (create-if-absent path).
    pub fn into_record(self) -> MediaRecord {
        let mut record = MediaRecord::new(
            self.id.clone(),
            self.display_name.clone().unwrap_or_default(),
            self.generation_id.clone().unwrap_or_default(),
        );
        record.apply(&self);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_record() -> MediaRecord {
        MediaRecord::new(
            VideoId::from_string("vid-1"),
            "Cyberpunk",
            GenerationId::from_string("gen-1"),
        )
    }

    #[test]
    fn test_apply_preserves_absent_fields() {
        let mut record = pending_record();
        record.placeholder_image_path = Some("/tmp/ph.jpg".into());

        let patch = MediaRecordPatch::new(record.id.clone()).with_finished(false);
        record.apply(&patch);

        assert_eq!(record.display_name, "Cyberpunk");
        assert_eq!(record.placeholder_image_path.as_deref(), Some("/tmp/ph.jpg"));
        assert_eq!(record.generation_id.as_str(), "gen-1");
    }

    #[test]
    fn test_finish_clears_placeholder() {
        let mut record = pending_record();
        record.placeholder_image_path = Some("/tmp/ph.jpg".into());

        let patch = MediaRecordPatch::new(record.id.clone())
            .with_remote_video_ref("http://x/a.mp4")
            .with_finished(true);
        record.apply(&patch);

        assert!(record.is_finished());
        assert!(record.placeholder_image_path.is_none());
        assert_eq!(record.remote_video_ref.as_deref(), Some("http://x/a.mp4"));
    }

    #[test]
    fn test_merge_is_last_writer_wins() {
        let mut record = pending_record();

        let patches = [
            MediaRecordPatch::new(record.id.clone()).with_display_name("First"),
            MediaRecordPatch::new(record.id.clone()).with_placeholder_image_path("/a.jpg"),
            MediaRecordPatch::new(record.id.clone()).with_display_name("Second"),
        ];
        for patch in &patches {
            record.apply(patch);
        }

        assert_eq!(record.display_name, "Second");
        assert_eq!(record.placeholder_image_path.as_deref(), Some("/a.jpg"));
    }

    #[test]
    fn test_wire_format_field_names() {
        let mut record = pending_record();
        record.remote_video_ref = Some("http://x/a.mp4".into());
        record.placeholder_image_path = Some("/tmp/ph.jpg".into());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Cyberpunk");
        assert_eq!(json["video"], "http://x/a.mp4");
        assert_eq!(json["image"], "/tmp/ph.jpg");
        assert_eq!(json["generationId"], "gen-1");
        assert!(json.get("isFinished").is_some());
    }

    #[test]
    fn test_patch_into_record() {
        let patch = MediaRecordPatch::new(VideoId::from_string("vid-2"))
            .with_display_name("Anime")
            .with_generation_id(GenerationId::from_string("gen-2"))
            .with_placeholder_image_path("/tmp/p.jpg");

        let record = patch.into_record();
        assert_eq!(record.display_name, "Anime");
        assert_eq!(record.generation_id.as_str(), "gen-2");
        assert!(!record.is_finished());
        assert_eq!(record.placeholder_image_path.as_deref(), Some("/tmp/p.jpg"));
    }
}
