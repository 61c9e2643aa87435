// src/handlers/post_handlers.rs
use actix_web::{delete, get, post, route, web, HttpResponse};
use log::{debug, info};

use super::{created, ok};
use crate::dtos::post_dtos::{
    hashtag_labels, CreatePostDTO, ImageOut, LikeToggleDTO, PostListQuery, PostOut,
    UpdatePostDTO, UploadImageDTO,
};
use crate::dtos::like_dtos::LikeOut;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::middleware::permissions::ensure_owner;
use crate::models::post::{PostChanges, PostDetail, PostQuery};
use crate::services::post_services::{self, LikeToggle};
use crate::AppState;

/// Loads a post the caller is allowed to see; hidden posts look missing.
async fn visible_post(state: &AppState, id: i64, user: &AuthenticatedUser) -> ApiResult<PostDetail> {
    state
        .repos
        .posts
        .find(id)
        .await?
        .filter(|detail| detail.is_visible_to(user.user_id))
        .ok_or(ApiError::NotFound)
}

async fn list_with(state: &AppState, query: PostQuery) -> ApiResult<Vec<PostOut>> {
    let posts = state.repos.posts.list(&query).await?;
    Ok(PostOut::list(posts, &state.media))
}

/// GET /post?tags&author&content
#[utoipa::path(
    get,
    path = "/post",
    tag = "posts",
    params(PostListQuery),
    responses((status = 200, description = "Published posts, newest first", body = [PostOut]))
)]
#[get("/post")]
pub async fn list_posts(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<PostListQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner().into_query();
    debug!("listing posts with {:?}", query);
    Ok(ok("Posts retrieved successfully", list_with(&state, query).await?))
}

/// POST /post
#[utoipa::path(
    post,
    path = "/post",
    tag = "posts",
    request_body = CreatePostDTO,
    responses(
        (status = 201, description = "Post created or scheduled", body = PostOut),
        (status = 400, description = "Blank content, bad schedule, hashtag or image")
    )
)]
#[post("/post")]
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreatePostDTO>,
) -> ApiResult<HttpResponse> {
    let detail = post_services::create_post(&state, user.user_id, body.into_inner()).await?;
    Ok(created(
        "Post created successfully",
        PostOut::from_detail(detail, &state.media),
    ))
}

/// GET /post/my_posts; scheduled posts included.
#[utoipa::path(
    get,
    path = "/post/my_posts",
    tag = "posts",
    responses((status = 200, description = "All posts of the caller", body = [PostOut]))
)]
#[get("/post/my_posts")]
pub async fn my_posts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let query = PostQuery {
        author_id: Some(user.user_id),
        ..Default::default()
    };
    Ok(ok("Posts retrieved successfully", list_with(&state, query).await?))
}

/// GET /post/my_following
#[utoipa::path(
    get,
    path = "/post/my_following",
    tag = "posts",
    responses((status = 200, description = "Published posts of followed users", body = [PostOut]))
)]
#[get("/post/my_following")]
pub async fn my_following_posts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let query = PostQuery {
        published_only: true,
        followed_by: Some(user.user_id),
        ..Default::default()
    };
    Ok(ok("Posts retrieved successfully", list_with(&state, query).await?))
}

/// GET /post/liked
#[utoipa::path(
    get,
    path = "/post/liked",
    tag = "posts",
    responses((status = 200, description = "Published posts the caller likes", body = [PostOut]))
)]
#[get("/post/liked")]
pub async fn liked_posts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let query = PostQuery {
        published_only: true,
        liked_by: Some(user.user_id),
        ..Default::default()
    };
    Ok(ok("Posts retrieved successfully", list_with(&state, query).await?))
}

/// GET /post/{id}
#[utoipa::path(
    get,
    path = "/post/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = PostOut),
        (status = 404, description = "Missing or not yet published")
    )
)]
#[get("/post/{id}")]
pub async fn get_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let detail = visible_post(&state, path.into_inner(), &user).await?;
    Ok(ok(
        "Post retrieved successfully",
        PostOut::from_detail(detail, &state.media),
    ))
}

/// PUT|PATCH /post/{id}
#[utoipa::path(
    method(put, patch),
    path = "/post/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    request_body = UpdatePostDTO,
    responses(
        (status = 200, description = "Post updated", body = PostOut),
        (status = 403, description = "Not the author")
    )
)]
#[route("/post/{id}", method = "PUT", method = "PATCH")]
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdatePostDTO>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = visible_post(&state, id, &user).await?;
    ensure_owner(&user, current.post.author_id)?;
    let body = body.into_inner();

    if let Some(content) = &body.content {
        if content.trim().is_empty() {
            return Err(ApiError::field("content", "This field may not be blank."));
        }
    }
    let hashtags = match &body.hashtags {
        Some(raw) => Some(hashtag_labels(raw)?),
        None => None,
    };

    let updated = state
        .repos
        .posts
        .update(
            id,
            PostChanges {
                content: body.content,
                hashtags,
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ok(
        "Post updated successfully",
        PostOut::from_detail(updated, &state.media),
    ))
}

/// DELETE /post/{id}
#[utoipa::path(
    delete,
    path = "/post/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not the author")
    )
)]
#[delete("/post/{id}")]
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = visible_post(&state, id, &user).await?;
    ensure_owner(&user, current.post.author_id)?;

    if !state.repos.posts.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    for picture in &current.images {
        state.media.remove(picture).await;
    }
    info!("user #{} deleted post #{}", user.user_id, id);
    Ok(HttpResponse::NoContent().finish())
}

/// POST /post/{id}/upload_image
#[utoipa::path(
    post,
    path = "/post/{id}/upload_image",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    request_body = UploadImageDTO,
    responses(
        (status = 201, description = "Image attached", body = ImageOut),
        (status = 400, description = "Missing or invalid image"),
        (status = 403, description = "Not the author")
    )
)]
#[post("/post/{id}/upload_image")]
pub async fn upload_image(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UploadImageDTO>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = visible_post(&state, id, &user).await?;
    ensure_owner(&user, current.post.author_id)?;

    let upload = body
        .into_inner()
        .picture
        .ok_or_else(|| ApiError::field("picture", "No file was submitted."))?;
    let relative = state
        .media
        .save_post_image(&upload)
        .await
        .map_err(|e| ApiError::from_media("picture", e))?;

    let image = match state.repos.posts.add_image(id, &relative).await {
        Ok(image) => image,
        Err(e) => {
            state.media.remove(&relative).await;
            return Err(e.into());
        }
    };
    info!("user #{} attached image #{} to post #{}", user.user_id, image.id, id);
    Ok(created(
        "Image uploaded successfully",
        ImageOut::new(&image, &state.media),
    ))
}

/// POST /post/{id}/like
#[utoipa::path(
    post,
    path = "/post/{id}/like",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    request_body(content = LikeToggleDTO, description = "Optional; without `is_likes` the like flips"),
    responses(
        (status = 201, description = "Like created", body = LikeOut),
        (status = 200, description = "Like updated", body = LikeOut),
        (status = 400, description = "Own post or malformed body")
    )
)]
#[post("/post/{id}/like")]
pub async fn like_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let is_likes = LikeToggleDTO::from_body(&body)?.is_likes;
    let post = visible_post(&state, path.into_inner(), &user).await?;

    match post_services::toggle_like(&state, &post, user.user_id, is_likes).await? {
        LikeToggle::Created(like) => Ok(created("Post liked", LikeOut::from(like))),
        LikeToggle::Updated(like) => Ok(ok("Like updated", LikeOut::from(like))),
    }
}
