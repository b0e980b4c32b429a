//! Backend request/response types.

use serde::{Deserialize, Serialize};

use aivid_models::GenerationId;

/// Standard response envelope used by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// True when the backend rejected the request at the application level
    pub error: bool,
    /// Human-readable messages accompanying the response
    #[serde(default)]
    pub messages: Vec<String>,
    /// Endpoint-specific payload
    pub data: T,
}

/// Payload returned by a successful job submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionData {
    /// Server-assigned job identifier to poll with
    pub generation_id: GenerationId,
    /// Submissions counted against the weekly quota
    #[serde(default)]
    pub total_week_generations: Option<u32>,
    /// Weekly quota ceiling
    #[serde(default)]
    pub max_generations: Option<u32>,
}

/// Image bytes attached to a submission.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// File name reported in the multipart form
    pub file_name: String,
    /// JPEG-encoded image bytes
    pub bytes: Vec<u8>,
}

/// A generation job submission.
///
/// Carries a template reference (effect flow) or a free-form prompt
/// (text-to-video flow); either way the optional photo rides along as a
/// multipart file part.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    /// Template to apply, for effect generations
    pub template_id: Option<String>,
    /// Free-form prompt, for prompt generations
    pub prompt: Option<String>,
    /// Stable client identity
    pub user_id: String,
    /// Application identifier sent with every submission
    pub app_id: String,
    /// Source photo, when the flow uses one
    pub image: Option<ImageAttachment>,
}

impl SubmitRequest {
    /// Create a template-effect submission.
    pub fn for_template(
        template_id: impl Into<String>,
        user_id: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            template_id: Some(template_id.into()),
            user_id: user_id.into(),
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    /// Create a prompt submission.
    pub fn for_prompt(
        prompt: impl Into<String>,
        user_id: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: Some(prompt.into()),
            user_id: user_id.into(),
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    /// Attach a source photo.
    pub fn with_image(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.image = Some(ImageAttachment {
            file_name: file_name.into(),
            bytes,
        });
        self
    }
}
