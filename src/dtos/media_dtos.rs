use serde::Deserialize;
use utoipa::ToSchema;

/// Image sent inline as base64, optionally with a `data:` URL prefix.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImageUpload {
    pub image_data: String,
    #[serde(default)]
    pub file_name: String,
    /// "image/jpeg", "image/png", etc.
    pub content_type: String,
}
