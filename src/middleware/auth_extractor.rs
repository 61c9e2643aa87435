// src/middleware/auth_extractor.rs
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use log::debug;

use crate::error::ApiError;
use crate::AppState;

const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";
const INVALID_TOKEN: &str = "Invalid token.";

/// The caller, resolved from a bearer token whose key is still active.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// token key the request was authenticated with
    pub token_key: String,
}

/// Accepts `Bearer <jwt>` and `Token <jwt>`.
fn bearer_token(req: &HttpRequest) -> Result<String, ApiError> {
    let header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized(MISSING_CREDENTIALS.to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(INVALID_TOKEN.to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(INVALID_TOKEN.to_string()))?;
    Ok(token.to_string())
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token?;
            let state = state.ok_or_else(|| ApiError::Internal("app state missing".to_string()))?;

            let claims = state.auth.decode_token(&token)?;
            let user_id = claims.user_id()?;
            if !state.repos.tokens.is_active(user_id, &claims.jti).await? {
                debug!("rejected revoked token for user #{}", user_id);
                return Err(ApiError::Unauthorized(INVALID_TOKEN.to_string()));
            }
            let user = state
                .repos
                .users
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| ApiError::Unauthorized(INVALID_TOKEN.to_string()))?;

            Ok(AuthenticatedUser {
                user_id: user.id,
                username: user.username,
                email: user.email,
                token_key: claims.jti,
            })
        })
    }
}
