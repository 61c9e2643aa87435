#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::NormalizePath;
use actix_web::{test, web, App};
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use serde_json::{json, Value};
use tempfile::TempDir;

use socialnet_be::repositories::Repositories;
use socialnet_be::routes;
use socialnet_be::services::auth_services::AuthService;
use socialnet_be::services::media_services::MediaStorage;
use socialnet_be::services::publish_scheduler::{spawn_publish_worker, SchedulerConfig};
use socialnet_be::AppState;

pub const PASSWORD: &str = "secret123";

/// In-memory state plus the temp dir backing its media root.
pub struct TestState {
    pub state: web::Data<AppState>,
    pub media_dir: TempDir,
}

pub fn test_state() -> TestState {
    let media_dir = tempfile::tempdir().expect("temp media dir");
    let repos = Repositories::in_memory();
    let (publisher, _worker) = spawn_publish_worker(
        repos.posts.clone(),
        SchedulerConfig {
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        },
    );
    let state = web::Data::new(AppState {
        repos,
        auth: AuthService::new("integration-secret", Duration::from_secs(3600)),
        media: MediaStorage::new(media_dir.path(), "/media", 10 * 1024 * 1024),
        publisher,
    });
    TestState { state, media_dir }
}

pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .wrap(NormalizePath::trim())
            .app_data(state)
            .configure(|cfg| routes::configure(cfg, "/media", 20 * 1024 * 1024)),
    )
    .await
}

/// Sends `req` and returns the status with the JSON body (`Null` when empty).
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, value)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub async fn get<S, B>(app: &S, uri: &str, token: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::get()
        .uri(uri)
        .insert_header(bearer(token))
        .to_request();
    send(app, req).await
}

pub async fn post_json<S, B>(app: &S, uri: &str, token: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri(uri)
        .insert_header(bearer(token))
        .set_json(body)
        .to_request();
    send(app, req).await
}

pub async fn patch_json<S, B>(app: &S, uri: &str, token: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::patch()
        .uri(uri)
        .insert_header(bearer(token))
        .set_json(body)
        .to_request();
    send(app, req).await
}

pub async fn delete<S, B>(app: &S, uri: &str, token: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::delete()
        .uri(uri)
        .insert_header(bearer(token))
        .to_request();
    send(app, req).await
}

/// Registers `name` and logs in; returns the user id and a token.
pub async fn signup<S, B>(app: &S, name: &str) -> (i64, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "email": format!("{}@Example.com", name),
            "username": name,
            "password": PASSWORD,
            "first_name": name.to_uppercase(),
        }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    let id = body["data"]["id"].as_i64().expect("user id");

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": format!("{}@example.com", name), "password": PASSWORD }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    let token = body["data"]["token"].as_str().expect("token").to_string();
    (id, token)
}

/// Creates a published post and returns its id.
pub async fn publish_post<S, B>(app: &S, token: &str, content: &str, tags: Value) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = post_json(
        app,
        "/post",
        token,
        json!({ "content": content, "hashtags": tags }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create post failed: {}", body);
    body["data"]["id"].as_i64().expect("post id")
}

pub fn png_upload(width: u32, height: u32) -> Value {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 30, 30])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png).expect("encode png");
    json!({
        "image_data": format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(buf.into_inner())),
        "file_name": "photo.png",
        "content_type": "image/png",
    })
}

pub fn non_field(body: &Value) -> Vec<String> {
    body["errors"]["non_field_errors"]
        .as_array()
        .map(|msgs| {
            msgs.iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
