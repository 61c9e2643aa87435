use actix_web::{delete, get, post, route, web, HttpResponse};
use log::info;

use super::{created, ok};
use crate::dtos::like_dtos::{CreateLikeDTO, LikeOut, LikeQuery, UpdateLikeDTO};
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::middleware::permissions::ensure_owner;
use crate::models::like::{validate_like, Like, DUPLICATE_LIKE};
use crate::repositories::constraints;
use crate::AppState;

async fn load_like(state: &AppState, id: i64) -> ApiResult<Like> {
    state.repos.likes.find(id).await?.ok_or(ApiError::NotFound)
}

/// GET /like?post
#[utoipa::path(
    get,
    path = "/like",
    tag = "likes",
    params(LikeQuery),
    responses(
        (status = 200, description = "Matching likes", body = [LikeOut]),
        (status = 400, description = "Invalid filter values")
    )
)]
#[get("/like")]
pub async fn list_likes(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<LikeQuery>,
) -> ApiResult<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    let likes = state.repos.likes.list(&filter).await?;
    let out: Vec<LikeOut> = likes.into_iter().map(LikeOut::from).collect();
    Ok(ok("Likes retrieved successfully", out))
}

/// POST /like
#[utoipa::path(
    post,
    path = "/like",
    tag = "likes",
    request_body = CreateLikeDTO,
    responses(
        (status = 201, description = "Like created", body = LikeOut),
        (status = 400, description = "Unknown post, own post or duplicate")
    )
)]
#[post("/like")]
pub async fn create_like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateLikeDTO>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let post_id = body
        .post
        .ok_or_else(|| ApiError::field("post", "This field is required."))?;
    let post = state
        .repos
        .posts
        .find(post_id)
        .await?
        .filter(|detail| detail.is_visible_to(user.user_id))
        .ok_or_else(|| {
            ApiError::field(
                "post",
                format!(r#"Invalid pk "{}" - object does not exist."#, post_id),
            )
        })?;
    validate_like(user.user_id, post.post.author_id).map_err(ApiError::non_field)?;

    if state.repos.likes.find_for(post_id, user.user_id).await?.is_some() {
        return Err(ApiError::non_field(DUPLICATE_LIKE));
    }
    let like = state
        .repos
        .likes
        .create(post_id, user.user_id, body.is_likes)
        .await
        .map_err(|e| {
            if e.is_conflict_on(constraints::UNIQUE_LIKE) {
                ApiError::non_field(DUPLICATE_LIKE)
            } else {
                e.into()
            }
        })?;
    info!("user #{} rated post #{}", user.user_id, post_id);
    Ok(created("Like created successfully", LikeOut::from(like)))
}

/// GET /like/{id}
#[utoipa::path(
    get,
    path = "/like/{id}",
    tag = "likes",
    params(("id" = i64, Path, description = "Like id")),
    responses(
        (status = 200, description = "The like", body = LikeOut),
        (status = 404, description = "No such like")
    )
)]
#[get("/like/{id}")]
pub async fn get_like(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let like = load_like(&state, path.into_inner()).await?;
    Ok(ok("Like retrieved successfully", LikeOut::from(like)))
}

/// PUT|PATCH /like/{id}; post and reviewer are read-only.
#[utoipa::path(
    method(put, patch),
    path = "/like/{id}",
    tag = "likes",
    params(("id" = i64, Path, description = "Like id")),
    request_body = UpdateLikeDTO,
    responses(
        (status = 200, description = "Like updated", body = LikeOut),
        (status = 403, description = "Not the reviewer")
    )
)]
#[route("/like/{id}", method = "PUT", method = "PATCH")]
pub async fn update_like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdateLikeDTO>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = load_like(&state, id).await?;
    ensure_owner(&user, current.reviewer_id)?;

    let like = match body.into_inner().is_likes {
        Some(value) => state
            .repos
            .likes
            .set_is_likes(id, value)
            .await?
            .ok_or(ApiError::NotFound)?,
        None => current,
    };
    Ok(ok("Like updated successfully", LikeOut::from(like)))
}

/// DELETE /like/{id}
#[utoipa::path(
    delete,
    path = "/like/{id}",
    tag = "likes",
    params(("id" = i64, Path, description = "Like id")),
    responses(
        (status = 204, description = "Like deleted"),
        (status = 403, description = "Not the reviewer")
    )
)]
#[delete("/like/{id}")]
pub async fn delete_like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = load_like(&state, id).await?;
    ensure_owner(&user, current.reviewer_id)?;
    if !state.repos.likes.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::NoContent().finish())
}
