use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::openapi::{ApiDoc, OPENAPI_JSON_PATH, SWAGGER_UI_PATH};
use crate::handlers::{
    auth_handlers, comment_handlers, follow_handlers, like_handlers, media_handlers,
    post_handlers, profile_handlers,
};

/// Registers every endpoint. Fixed `/post/...` routes go before `/post/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig, media_url: &str, json_limit: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(json_limit)
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(web::PathConfig::default().error_handler(|_err, _req| ApiError::NotFound.into()))
    // auth
    .service(auth_handlers::register)
    .service(auth_handlers::login)
    .service(auth_handlers::logout)
    // profiles
    .service(profile_handlers::list_profiles)
    .service(profile_handlers::create_profile)
    .service(profile_handlers::get_profile)
    .service(profile_handlers::update_profile)
    .service(profile_handlers::delete_profile)
    // follows
    .service(follow_handlers::list_follows)
    .service(follow_handlers::create_follow)
    .service(follow_handlers::get_follow)
    .service(follow_handlers::delete_follow)
    .service(follow_handlers::following)
    .service(follow_handlers::followers)
    // posts
    .service(post_handlers::list_posts)
    .service(post_handlers::create_post)
    .service(post_handlers::my_posts)
    .service(post_handlers::my_following_posts)
    .service(post_handlers::liked_posts)
    .service(post_handlers::get_post)
    .service(post_handlers::update_post)
    .service(post_handlers::delete_post)
    .service(post_handlers::upload_image)
    .service(post_handlers::like_post)
    // comments
    .service(comment_handlers::list_comments)
    .service(comment_handlers::create_comment)
    .service(comment_handlers::get_comment)
    .service(comment_handlers::update_comment)
    .service(comment_handlers::delete_comment)
    // likes
    .service(like_handlers::list_likes)
    .service(like_handlers::create_like)
    .service(like_handlers::get_like)
    .service(like_handlers::update_like)
    .service(like_handlers::delete_like)
    // docs; the UI lives at /swagger-ui/index.html
    .service(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
    // uploaded files
    .route(
        &format!("{}/{{path:.*}}", media_url.trim_end_matches('/')),
        web::get().to(media_handlers::serve_media),
    );
}
