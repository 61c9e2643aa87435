use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::parse_id_param;
use crate::error::{ApiResult, ErrorCollector};
use crate::models::like::{Like, LikeFilter};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLikeDTO {
    pub post: Option<i64>,
    #[serde(default)]
    pub is_likes: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLikeDTO {
    pub is_likes: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LikeQuery {
    /// Post id, an integer
    pub post: Option<String>,
}

impl LikeQuery {
    pub fn into_filter(self) -> ApiResult<LikeFilter> {
        let mut errors = ErrorCollector::new();
        let post_id = parse_id_param(
            self.post.as_deref(),
            "post",
            "Invalid post ID format. Use integer ?post=5",
            &mut errors,
        );
        errors.finish()?;
        Ok(LikeFilter { post_id })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeOut {
    pub id: i64,
    pub post: i64,
    pub reviewer: i64,
    pub is_likes: bool,
}

impl From<Like> for LikeOut {
    fn from(like: Like) -> Self {
        Self {
            id: like.id,
            post: like.post_id,
            reviewer: like.reviewer_id,
            is_likes: like.is_likes,
        }
    }
}
