// src/handlers/auth_handlers.rs
use actix_web::{post, web, HttpResponse};
use log::{debug, info};

use super::{created, ok};
use crate::dtos::auth_dtos::{DetailOut, LoginIn, RegisterIn, TokenOut, UserOut};
use crate::error::{ApiError, ApiResult, ErrorCollector};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::user::{
    looks_like_email, normalize_email, validate_password, validate_username, NewUser,
};
use crate::repositories::constraints;
use crate::services::auth_services::AuthService;
use crate::AppState;

const REQUIRED: &str = "This field is required.";

/// POST /register
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterIn,
    responses(
        (status = 201, description = "User registered", body = UserOut),
        (status = 400, description = "Field errors")
    ),
    security(())
)]
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterIn>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let mut errors = ErrorCollector::new();

    let email = body.email.as_deref().map(normalize_email).unwrap_or_default();
    if email.is_empty() {
        errors.add("email", REQUIRED);
    } else if !looks_like_email(&email) {
        errors.add("email", "Enter a valid email address.");
    } else if state.repos.users.email_exists(&email).await? {
        errors.add("email", "user with this email already exists.");
    }

    let username = body.username.as_deref().map(str::trim).unwrap_or_default().to_string();
    match body.username {
        None => errors.add("username", REQUIRED),
        Some(_) => {
            if let Err(msg) = validate_username(&username) {
                errors.add("username", msg);
            } else if state.repos.users.username_exists(&username).await? {
                errors.add("username", "A user with that username already exists.");
            }
        }
    }

    let password = body.password.unwrap_or_default();
    if password.is_empty() {
        errors.add("password", REQUIRED);
    } else if let Err(msg) = validate_password(&password) {
        errors.add("password", msg);
    }
    errors.finish()?;

    let password_hash = state.auth.hash_password(&password)?;
    let user = state
        .repos
        .users
        .create_user(NewUser {
            email,
            username,
            first_name: body.first_name.trim().to_string(),
            last_name: body.last_name.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(|e| {
            if e.is_conflict_on(constraints::USER_EMAIL) {
                ApiError::field("email", "user with this email already exists.")
            } else if e.is_conflict_on(constraints::USER_USERNAME) {
                ApiError::field("username", "A user with that username already exists.")
            } else {
                e.into()
            }
        })?;

    info!("registered user #{} ({})", user.id, user.username);
    Ok(created("User registered successfully", UserOut::from(&user)))
}

/// POST /login
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginIn,
    responses(
        (status = 200, description = "Token issued", body = TokenOut),
        (status = 400, description = "Missing or wrong credentials")
    ),
    security(())
)]
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginIn>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (normalize_email(&email), password)
        }
        _ => return Err(ApiError::non_field(r#"Must include "email" and "password"."#)),
    };

    let bad_credentials = || ApiError::non_field("Unable to log in with provided credentials.");
    let user = state
        .repos
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(bad_credentials)?;
    if !state.auth.verify_password(&password, &user.password_hash)? {
        debug!("wrong password for user #{}", user.id);
        return Err(bad_credentials());
    }

    let key = state
        .repos
        .tokens
        .get_or_create(user.id, &AuthService::new_token_key())
        .await?;
    let token = state.auth.issue_token(user.id, &key)?;

    info!("user #{} logged in", user.id);
    Ok(ok("Login successful", TokenOut { token }))
}

/// POST /logout
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Token key revoked", body = DetailOut),
        (status = 401, description = "Not authenticated")
    )
)]
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<HttpResponse> {
    state.repos.tokens.revoke(user.user_id).await?;
    info!("user #{} logged out", user.user_id);
    Ok(ok(
        "Logout successful",
        DetailOut {
            detail: "Successfully logged out.".to_string(),
        },
    ))
}
