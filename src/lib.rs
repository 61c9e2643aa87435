pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod routes;
pub mod services;

use crate::repositories::Repositories;
use crate::services::auth_services::AuthService;
use crate::services::media_services::MediaStorage;
use crate::services::publish_scheduler::PublishQueue;

/// Shared by every worker through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub auth: AuthService,
    pub media: MediaStorage,
    pub publisher: PublishQueue,
}
