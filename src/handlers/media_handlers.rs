use actix_web::{http::header, web, HttpResponse};
use log::debug;

use crate::error::{ApiError, ApiResult};
use crate::services::media_services::content_type_for;
use crate::AppState;

/// GET {MEDIA_URL}/{path:.*}; registered in `routes` because the prefix is
/// configurable.
pub async fn serve_media(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let relative = path.into_inner();
    let bytes = state
        .media
        .read(&relative)
        .await
        .map_err(|e| ApiError::from_media("path", e))?
        .ok_or(ApiError::NotFound)?;
    debug!("serving media {} ({} bytes)", relative, bytes.len());

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&relative))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
