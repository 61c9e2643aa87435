use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{non_empty, parse_id_param};
use crate::error::{ApiResult, ErrorCollector};
use crate::models::comment::{Comment, CommentFilter};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentDTO {
    pub post: Option<i64>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommentDTO {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommentQuery {
    /// Post id, an integer
    pub post: Option<String>,
    /// Reviewer user id, an integer
    pub reviewer_id: Option<String>,
    /// Case-insensitive reviewer username substring
    pub reviewer: Option<String>,
}

impl CommentQuery {
    pub fn into_filter(self) -> ApiResult<CommentFilter> {
        let mut errors = ErrorCollector::new();
        let post_id = parse_id_param(
            self.post.as_deref(),
            "post",
            "Invalid post ID format. Use integer ?post=5",
            &mut errors,
        );
        let reviewer_id = parse_id_param(
            self.reviewer_id.as_deref(),
            "reviewer_id",
            "Invalid reviewer ID format. Use integer ?reviewer_id=5",
            &mut errors,
        );
        errors.finish()?;
        Ok(CommentFilter {
            post_id,
            reviewer_id,
            reviewer: non_empty(self.reviewer),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentOut {
    pub id: i64,
    pub reviewer: i64,
    pub content: String,
    pub post: i64,
}

impl From<Comment> for CommentOut {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            reviewer: comment.reviewer_id,
            content: comment.content,
            post: comment.post_id,
        }
    }
}
