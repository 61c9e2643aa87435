use actix_web::HttpResponse;
use serde::Serialize;

pub mod auth_handlers;
pub mod comment_handlers;
pub mod follow_handlers;
pub mod like_handlers;
pub mod media_handlers;
pub mod post_handlers;
pub mod profile_handlers;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

pub(crate) fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(message, data))
}

pub(crate) fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::success(message, data))
}
