use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::media_dtos::ImageUpload;
use super::non_empty;
use crate::error::{ApiError, ApiResult};
use crate::models::post::{
    hashtag_filter_labels, normalize_hashtags, Image, PostDetail, PostQuery,
};
use crate::services::media_services::MediaStorage;

fn default_published() -> bool {
    true
}

/// Hashtags are accepted as `{"text": "rust"}` or plain `"rust"`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum HashtagIn {
    Object { text: String },
    Plain(String),
}

impl HashtagIn {
    pub fn text(&self) -> &str {
        match self {
            HashtagIn::Object { text } => text,
            HashtagIn::Plain(text) => text,
        }
    }
}

pub fn hashtag_labels(raw: &[HashtagIn]) -> ApiResult<Vec<String>> {
    normalize_hashtags(raw.iter().map(HashtagIn::text)).map_err(|msg| ApiError::field("hashtags", msg))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostDTO {
    pub content: Option<String>,
    pub image: Option<ImageUpload>,
    #[serde(default)]
    pub hashtags: Vec<HashtagIn>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub time_to_publicate: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePostDTO {
    pub content: Option<String>,
    pub hashtags: Option<Vec<HashtagIn>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadImageDTO {
    pub picture: Option<ImageUpload>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LikeToggleDTO {
    pub is_likes: Option<bool>,
}

impl LikeToggleDTO {
    /// The body is optional: an empty one toggles, anything else must parse.
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("Json deserialize error: {}", e)))
    }
}

/// `/post?tags=a,b&author=..&content=..`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListQuery {
    /// Comma separated hashtags; a post matches if it carries any of them
    pub tags: Option<String>,
    /// Case-insensitive author username substring
    pub author: Option<String>,
    /// Case-insensitive content substring
    pub content: Option<String>,
}

impl PostListQuery {
    pub fn into_query(self) -> PostQuery {
        let tags = non_empty(self.tags)
            .map(|raw| hashtag_filter_labels(&raw))
            .unwrap_or_default();
        PostQuery {
            published_only: true,
            tags,
            author: non_empty(self.author),
            content: non_empty(self.content),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageRef {
    pub picture: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostOut {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub hashtags: Vec<String>,
    pub images: Vec<ImageRef>,
    pub is_published: bool,
    pub time_to_publicate: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PostOut {
    pub fn from_detail(detail: PostDetail, media: &MediaStorage) -> Self {
        Self {
            id: detail.post.id,
            author: detail.author_username,
            content: detail.post.content,
            hashtags: detail.hashtags,
            images: detail
                .images
                .iter()
                .map(|path| ImageRef {
                    picture: media.url_for(path),
                })
                .collect(),
            is_published: detail.post.is_published,
            time_to_publicate: detail.post.time_to_publicate,
            created_at: detail.post.created_at,
        }
    }

    pub fn list(details: Vec<PostDetail>, media: &MediaStorage) -> Vec<Self> {
        details
            .into_iter()
            .map(|detail| Self::from_detail(detail, media))
            .collect()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageOut {
    pub id: i64,
    pub post: i64,
    pub picture: String,
}

impl ImageOut {
    pub fn new(image: &Image, media: &MediaStorage) -> Self {
        Self {
            id: image.id,
            post: image.post_id,
            picture: media.url_for(&image.picture),
        }
    }
}
