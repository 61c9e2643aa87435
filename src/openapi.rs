use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers::{
    auth_handlers, comment_handlers, follow_handlers, like_handlers, post_handlers,
    profile_handlers,
};

pub const OPENAPI_JSON_PATH: &str = "/api/openapi.json";
pub const SWAGGER_UI_PATH: &str = "/swagger-ui/{_:.*}";

/// Successful bodies are wrapped as `{"status": "success", "message", "data"}`;
/// the schemas below describe `data`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Socialnet API",
        version = "0.1.0",
        description = "Users, profiles, follows, posts with hashtags and images, comments and likes. Successful responses wrap the documented schema in `{status, message, data}`; errors carry `{status, message, errors}`."
    ),
    paths(
        auth_handlers::register,
        auth_handlers::login,
        auth_handlers::logout,
        profile_handlers::list_profiles,
        profile_handlers::create_profile,
        profile_handlers::get_profile,
        profile_handlers::update_profile,
        profile_handlers::delete_profile,
        follow_handlers::list_follows,
        follow_handlers::create_follow,
        follow_handlers::get_follow,
        follow_handlers::delete_follow,
        follow_handlers::following,
        follow_handlers::followers,
        post_handlers::list_posts,
        post_handlers::create_post,
        post_handlers::my_posts,
        post_handlers::my_following_posts,
        post_handlers::liked_posts,
        post_handlers::get_post,
        post_handlers::update_post,
        post_handlers::delete_post,
        post_handlers::upload_image,
        post_handlers::like_post,
        comment_handlers::list_comments,
        comment_handlers::create_comment,
        comment_handlers::get_comment,
        comment_handlers::update_comment,
        comment_handlers::delete_comment,
        like_handlers::list_likes,
        like_handlers::create_like,
        like_handlers::get_like,
        like_handlers::update_like,
        like_handlers::delete_like,
    ),
    tags(
        (name = "auth", description = "Registration and token sessions"),
        (name = "profiles", description = "One profile per user"),
        (name = "follows", description = "Who follows whom"),
        (name = "posts", description = "Posts, images, scheduling and like toggling"),
        (name = "comments", description = "Comments on other users' posts"),
        (name = "likes", description = "Likes on other users' posts"),
    ),
    security(("bearer_auth" = [])),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /login"))
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_filter_parameters() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let names = |path: &str| -> Vec<String> {
            doc["paths"][path]["get"]["parameters"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["name"].as_str().unwrap().to_string())
                .collect()
        };
        assert_eq!(names("/post"), vec!["tags", "author", "content"]);
        assert_eq!(
            names("/profile"),
            vec!["user_id", "username", "firstname", "lastname", "joined"]
        );
        assert_eq!(names("/comment"), vec!["post", "reviewer_id", "reviewer"]);
        assert_eq!(names("/like"), vec!["post"]);
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    }

    #[test]
    fn login_needs_no_token() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["paths"]["/login"]["post"]["security"][0]
            .get("bearer_auth")
            .is_none());
        assert!(doc["paths"]["/post/{id}"]["patch"].is_object());
        assert!(doc["paths"]["/post/{id}"]["put"].is_object());
    }
}
