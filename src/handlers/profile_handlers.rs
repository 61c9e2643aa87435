// src/handlers/profile_handlers.rs
use actix_web::{delete, get, post, route, web, HttpResponse};
use log::info;

use super::{created, ok};
use crate::dtos::profile_dtos::{ProfileDetailOut, ProfileIn, ProfileOut, ProfileQuery};
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::middleware::permissions::ensure_owner;
use crate::models::profile::ProfileChanges;
use crate::repositories::constraints;
use crate::AppState;

const PROFILE_EXISTS: &str = "Profile for this user already exists.";

/// GET /profile?user_id&username&firstname&lastname&joined
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profiles",
    params(ProfileQuery),
    responses(
        (status = 200, description = "Matching profiles", body = [ProfileOut]),
        (status = 400, description = "Invalid filter values")
    )
)]
#[get("/profile")]
pub async fn list_profiles(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<ProfileQuery>,
) -> ApiResult<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    let rows = state.repos.profiles.list(&filter).await?;
    let out: Vec<ProfileOut> = rows
        .iter()
        .map(|row| ProfileOut::from_row(row, &state.media))
        .collect();
    Ok(ok("Profiles retrieved successfully", out))
}

/// POST /profile
#[utoipa::path(
    post,
    path = "/profile",
    tag = "profiles",
    request_body = ProfileIn,
    responses(
        (status = 201, description = "Profile created", body = ProfileOut),
        (status = 400, description = "Profile exists or picture is invalid")
    )
)]
#[post("/profile")]
pub async fn create_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<ProfileIn>,
) -> ApiResult<HttpResponse> {
    if state.repos.profiles.exists_for_user(user.user_id).await? {
        return Err(ApiError::non_field(PROFILE_EXISTS));
    }
    let body = body.into_inner();

    let picture = match &body.picture {
        Some(upload) => Some(
            state
                .media
                .save_profile_picture(&user.email, upload)
                .await
                .map_err(|e| ApiError::from_media("picture", e))?,
        ),
        None => None,
    };

    let profile = match state
        .repos
        .profiles
        .create(user.user_id, picture.clone(), body.bio)
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            if let Some(path) = &picture {
                state.media.remove(path).await;
            }
            if e.is_conflict_on(constraints::PROFILE_USER) {
                return Err(ApiError::non_field(PROFILE_EXISTS));
            }
            return Err(e.into());
        }
    };

    info!("user #{} created profile #{}", user.user_id, profile.id);
    Ok(created(
        "Profile created successfully",
        ProfileOut::new(
            profile.id,
            &user.username,
            profile.picture.as_deref(),
            profile.bio,
            &state.media,
        ),
    ))
}

/// GET /profile/{id}
#[utoipa::path(
    get,
    path = "/profile/{id}",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile with its user", body = ProfileDetailOut),
        (status = 404, description = "No such profile")
    )
)]
#[get("/profile/{id}")]
pub async fn get_profile(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let row = state
        .repos
        .profiles
        .find(path.into_inner())
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(ok(
        "Profile retrieved successfully",
        ProfileDetailOut::from_row(&row, &state.media),
    ))
}

/// PUT|PATCH /profile/{id}; both are partial.
#[utoipa::path(
    method(put, patch),
    path = "/profile/{id}",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile id")),
    request_body = ProfileIn,
    responses(
        (status = 200, description = "Profile updated", body = ProfileOut),
        (status = 403, description = "Not the owner")
    )
)]
#[route("/profile/{id}", method = "PUT", method = "PATCH")]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<ProfileIn>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = state
        .repos
        .profiles
        .find(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    ensure_owner(&user, current.profile.user_id)?;
    let body = body.into_inner();

    let picture = match &body.picture {
        Some(upload) => Some(
            state
                .media
                .save_profile_picture(&user.email, upload)
                .await
                .map_err(|e| ApiError::from_media("picture", e))?,
        ),
        None => None,
    };

    let changes = ProfileChanges {
        picture: picture.clone(),
        bio: body.bio,
    };
    let updated = match state.repos.profiles.update(id, changes).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return Err(ApiError::NotFound),
        Err(e) => {
            if let Some(path) = &picture {
                state.media.remove(path).await;
            }
            return Err(e.into());
        }
    };

    // the replaced file is no longer referenced
    if picture.is_some() {
        if let Some(old) = &current.profile.picture {
            state.media.remove(old).await;
        }
    }

    Ok(ok(
        "Profile updated successfully",
        ProfileOut::new(
            updated.id,
            &user.username,
            updated.picture.as_deref(),
            updated.bio,
            &state.media,
        ),
    ))
}

/// DELETE /profile/{id}
#[utoipa::path(
    delete,
    path = "/profile/{id}",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile id")),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 403, description = "Not the owner")
    )
)]
#[delete("/profile/{id}")]
pub async fn delete_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = state
        .repos
        .profiles
        .find(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    ensure_owner(&user, current.profile.user_id)?;

    if !state.repos.profiles.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    if let Some(picture) = &current.profile.picture {
        state.media.remove(picture).await;
    }
    info!("user #{} deleted profile #{}", user.user_id, id);
    Ok(HttpResponse::NoContent().finish())
}
