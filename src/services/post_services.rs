use chrono::Utc;
use log::{info, warn};

use crate::dtos::post_dtos::{hashtag_labels, CreatePostDTO};
use crate::error::{ApiError, ApiResult};
use crate::models::like::{validate_like, Like, DUPLICATE_LIKE};
use crate::models::post::{validate_publication, NewPost, PostDetail};
use crate::repositories::constraints;
use crate::AppState;

/// Validates the payload, stores the optional image, writes the post and
/// schedules its publication when needed.
pub async fn create_post(
    state: &AppState,
    author_id: i64,
    body: CreatePostDTO,
) -> ApiResult<PostDetail> {
    let content = body.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(ApiError::field("content", "This field may not be blank."));
    }
    validate_publication(body.is_published, body.time_to_publicate, Utc::now())
        .map_err(ApiError::non_field)?;
    let hashtags = hashtag_labels(&body.hashtags)?;

    let image = match &body.image {
        Some(upload) => Some(
            state
                .media
                .save_post_image(upload)
                .await
                .map_err(|e| ApiError::from_media("image", e))?,
        ),
        None => None,
    };

    let new_post = NewPost {
        author_id,
        content,
        is_published: body.is_published,
        time_to_publicate: body.time_to_publicate,
        hashtags,
        image: image.clone(),
    };
    let post = match state.repos.posts.create(new_post).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = &image {
                state.media.remove(path).await;
            }
            return Err(e.into());
        }
    };
    info!("user #{} created post #{}", author_id, post.id);

    if !post.is_published {
        if let Some(eta) = post.time_to_publicate {
            // the row is committed; startup recovery picks it up if this fails
            if let Err(e) = state.publisher.enqueue(post.id, eta) {
                warn!("post #{} stored but not scheduled: {}", post.id, e);
            }
        }
    }

    state.repos.posts.find(post.id).await?.ok_or(ApiError::NotFound)
}

/// Result of `POST /post/{id}/like`.
#[derive(Debug)]
pub enum LikeToggle {
    Created(Like),
    Updated(Like),
}

/// Creates the caller's like, or sets/flips an existing one.
pub async fn toggle_like(
    state: &AppState,
    post: &PostDetail,
    reviewer_id: i64,
    is_likes: Option<bool>,
) -> ApiResult<LikeToggle> {
    validate_like(reviewer_id, post.post.author_id).map_err(ApiError::non_field)?;

    if let Some(existing) = state.repos.likes.find_for(post.post.id, reviewer_id).await? {
        let value = is_likes.unwrap_or(!existing.is_likes);
        let like = state
            .repos
            .likes
            .set_is_likes(existing.id, value)
            .await?
            .ok_or(ApiError::NotFound)?;
        return Ok(LikeToggle::Updated(like));
    }

    match state
        .repos
        .likes
        .create(post.post.id, reviewer_id, is_likes.unwrap_or(true))
        .await
    {
        Ok(like) => Ok(LikeToggle::Created(like)),
        // lost a race with a concurrent toggle
        Err(e) if e.is_conflict_on(constraints::UNIQUE_LIKE) => {
            warn!("duplicate like on post #{} by user #{}", post.post.id, reviewer_id);
            Err(ApiError::non_field(DUPLICATE_LIKE))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::models::user::NewUser;
    use crate::repositories::Repositories;
    use crate::services::auth_services::AuthService;
    use crate::services::media_services::MediaStorage;
    use crate::services::publish_scheduler::PublishQueue;

    #[tokio::test]
    async fn scheduled_post_survives_a_stopped_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            repos: Repositories::in_memory(),
            auth: AuthService::new("secret", Duration::from_secs(60)),
            media: MediaStorage::new(dir.path(), "/media", 1024 * 1024),
            publisher: PublishQueue::detached(),
        };
        let author = state
            .repos
            .users
            .create_user(NewUser {
                email: "ann@example.com".into(),
                username: "ann".into(),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();

        let eta = Utc::now() + chrono::Duration::hours(1);
        let body = CreatePostDTO {
            content: Some("later".into()),
            image: None,
            hashtags: Vec::new(),
            is_published: false,
            time_to_publicate: Some(eta),
        };
        let detail = create_post(&state, author.id, body).await.unwrap();
        assert!(!detail.post.is_published);

        let pending = state.repos.posts.pending_publications().await.unwrap();
        assert_eq!(pending, vec![(detail.post.id, eta)]);
    }
}
