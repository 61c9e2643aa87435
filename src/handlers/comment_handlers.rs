use actix_web::{delete, get, post, route, web, HttpResponse};
use log::info;

use super::{created, ok};
use crate::dtos::comment_dtos::{CommentOut, CommentQuery, CreateCommentDTO, UpdateCommentDTO};
use crate::error::{ApiError, ApiResult, ErrorCollector};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::middleware::permissions::ensure_owner;
use crate::models::comment::{validate_feedback, Comment};
use crate::AppState;

const BLANK: &str = "This field may not be blank.";

async fn load_comment(state: &AppState, id: i64) -> ApiResult<Comment> {
    state
        .repos
        .comments
        .find(id)
        .await?
        .ok_or(ApiError::NotFound)
}

/// GET /comment?post&reviewer_id&reviewer
#[utoipa::path(
    get,
    path = "/comment",
    tag = "comments",
    params(CommentQuery),
    responses(
        (status = 200, description = "Matching comments", body = [CommentOut]),
        (status = 400, description = "Invalid filter values")
    )
)]
#[get("/comment")]
pub async fn list_comments(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<CommentQuery>,
) -> ApiResult<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    let comments = state.repos.comments.list(&filter).await?;
    let out: Vec<CommentOut> = comments.into_iter().map(CommentOut::from).collect();
    Ok(ok("Comments retrieved successfully", out))
}

/// POST /comment
#[utoipa::path(
    post,
    path = "/comment",
    tag = "comments",
    request_body = CreateCommentDTO,
    responses(
        (status = 201, description = "Comment created", body = CommentOut),
        (status = 400, description = "Unknown post, own post or blank content")
    )
)]
#[post("/comment")]
pub async fn create_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<CreateCommentDTO>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let mut errors = ErrorCollector::new();
    let content = body.content.unwrap_or_default();
    if content.trim().is_empty() {
        errors.add("content", BLANK);
    }

    let post = match body.post {
        None => {
            errors.add("post", "This field is required.");
            None
        }
        Some(post_id) => {
            let post = state
                .repos
                .posts
                .find(post_id)
                .await?
                .filter(|detail| detail.is_visible_to(user.user_id));
            if post.is_none() {
                errors.add(
                    "post",
                    format!(r#"Invalid pk "{}" - object does not exist."#, post_id),
                );
            }
            post
        }
    };
    errors.finish()?;
    let post = post.ok_or(ApiError::NotFound)?;

    validate_feedback(user.user_id, post.post.author_id).map_err(ApiError::non_field)?;

    let comment = state
        .repos
        .comments
        .create(user.user_id, post.post.id, content.trim())
        .await?;
    info!("user #{} commented on post #{}", user.user_id, post.post.id);
    Ok(created("Comment created successfully", CommentOut::from(comment)))
}

/// GET /comment/{id}
#[utoipa::path(
    get,
    path = "/comment/{id}",
    tag = "comments",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "The comment", body = CommentOut),
        (status = 404, description = "No such comment")
    )
)]
#[get("/comment/{id}")]
pub async fn get_comment(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let comment = load_comment(&state, path.into_inner()).await?;
    Ok(ok("Comment retrieved successfully", CommentOut::from(comment)))
}

/// PUT|PATCH /comment/{id}; only the content can change.
#[utoipa::path(
    method(put, patch),
    path = "/comment/{id}",
    tag = "comments",
    params(("id" = i64, Path, description = "Comment id")),
    request_body = UpdateCommentDTO,
    responses(
        (status = 200, description = "Comment updated", body = CommentOut),
        (status = 403, description = "Not the reviewer")
    )
)]
#[route("/comment/{id}", method = "PUT", method = "PATCH")]
pub async fn update_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdateCommentDTO>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = load_comment(&state, id).await?;
    ensure_owner(&user, current.reviewer_id)?;

    let comment = match body.into_inner().content {
        None => current,
        Some(content) if content.trim().is_empty() => {
            return Err(ApiError::field("content", BLANK));
        }
        Some(content) => state
            .repos
            .comments
            .update_content(id, content.trim())
            .await?
            .ok_or(ApiError::NotFound)?,
    };
    Ok(ok("Comment updated successfully", CommentOut::from(comment)))
}

/// DELETE /comment/{id}
#[utoipa::path(
    delete,
    path = "/comment/{id}",
    tag = "comments",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the reviewer")
    )
)]
#[delete("/comment/{id}")]
pub async fn delete_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = load_comment(&state, id).await?;
    ensure_owner(&user, current.reviewer_id)?;
    if !state.repos.comments.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::NoContent().finish())
}
