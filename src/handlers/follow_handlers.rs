use actix_web::{delete, get, post, web, HttpResponse};
use log::info;

use super::{created, ok};
use crate::dtos::follow_dtos::{FollowCreatedOut, FollowIn, FollowOut, FollowersOut, FollowingOut};
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::follow::{check_not_me, DUPLICATE_FOLLOW};
use crate::repositories::constraints;
use crate::AppState;

/// GET /follow
#[utoipa::path(
    get,
    path = "/follow",
    tag = "follows",
    responses((status = 200, description = "Follows of the caller, newest first", body = [FollowOut]))
)]
#[get("/follow")]
pub async fn list_follows(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let follows = state.repos.follows.list_for_follower(user.user_id).await?;
    let out: Vec<FollowOut> = follows.iter().map(FollowOut::from).collect();
    Ok(ok("Follows retrieved successfully", out))
}

/// POST /follow
#[utoipa::path(
    post,
    path = "/follow",
    tag = "follows",
    request_body = FollowIn,
    responses(
        (status = 201, description = "Now following", body = FollowCreatedOut),
        (status = 400, description = "Self follow, unknown user or duplicate")
    )
)]
#[post("/follow")]
pub async fn create_follow(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<FollowIn>,
) -> ApiResult<HttpResponse> {
    let followee_id = body
        .followee
        .ok_or_else(|| ApiError::field("followee", "This field is required."))?;
    check_not_me(user.user_id, followee_id).map_err(ApiError::non_field)?;

    if state.repos.users.find_by_id(followee_id).await?.is_none() {
        return Err(ApiError::field(
            "followee",
            format!(r#"Invalid pk "{}" - object does not exist."#, followee_id),
        ));
    }

    let follow = state
        .repos
        .follows
        .create(user.user_id, followee_id)
        .await
        .map_err(|e| {
            if e.is_conflict_on(constraints::UNIQUE_FOLLOW) {
                ApiError::non_field(DUPLICATE_FOLLOW)
            } else if e.is_conflict_on(constraints::FOLLOWER_NOT_FOLLOWEE) {
                ApiError::non_field("You cannot follow yourself.")
            } else {
                e.into()
            }
        })?;

    info!("user #{} now follows user #{}", user.user_id, followee_id);
    Ok(created("Followed successfully", FollowCreatedOut::from(&follow)))
}

/// GET /follow/{id}
#[utoipa::path(
    get,
    path = "/follow/{id}",
    tag = "follows",
    params(("id" = i64, Path, description = "Follow id")),
    responses(
        (status = 200, description = "One of the caller's follows", body = FollowOut),
        (status = 404, description = "Not one of the caller's follows")
    )
)]
#[get("/follow/{id}")]
pub async fn get_follow(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let follow = state
        .repos
        .follows
        .find_for_follower(path.into_inner(), user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ok("Follow retrieved successfully", FollowOut::from(&follow)))
}

/// DELETE /follow/{id}
#[utoipa::path(
    delete,
    path = "/follow/{id}",
    tag = "follows",
    params(("id" = i64, Path, description = "Follow id")),
    responses(
        (status = 204, description = "Unfollowed"),
        (status = 404, description = "Not one of the caller's follows")
    )
)]
#[delete("/follow/{id}")]
pub async fn delete_follow(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    if !state.repos.follows.delete_for_follower(id, user.user_id).await? {
        return Err(ApiError::NotFound);
    }
    info!("user #{} removed follow #{}", user.user_id, id);
    Ok(HttpResponse::NoContent().finish())
}

/// GET /following
#[utoipa::path(
    get,
    path = "/following",
    tag = "follows",
    responses((status = 200, description = "Usernames the caller follows", body = FollowingOut))
)]
#[get("/following")]
pub async fn following(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let following = state.repos.follows.following_usernames(user.user_id).await?;
    Ok(ok("Following retrieved successfully", FollowingOut { following }))
}

/// GET /followers
#[utoipa::path(
    get,
    path = "/followers",
    tag = "follows",
    responses((status = 200, description = "Usernames following the caller", body = FollowersOut))
)]
#[get("/followers")]
pub async fn followers(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    let followers = state.repos.follows.follower_usernames(user.user_id).await?;
    Ok(ok("Followers retrieved successfully", FollowersOut { followers }))
}
