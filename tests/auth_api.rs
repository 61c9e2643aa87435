mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;

use common::*;

#[actix_web::test]
async fn register_login_logout_cycle() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/register/")
        .set_json(json!({
            "email": "  Ann@Example.COM ",
            "username": "ann",
            "password": PASSWORD,
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["email"], "ann@example.com");
    assert_eq!(body["data"]["is_staff"], false);
    assert!(body["data"].get("password_hash").is_none());

    let login = || {
        test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "ANN@example.com", "password": PASSWORD }))
            .to_request()
    };
    let (status, body) = send(&app, login()).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    // a second login shares the same token key
    let (_, again) = send(&app, login()).await;
    let second = again["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(get(&app, "/profile", &second).await.0, StatusCode::OK);

    assert_eq!(get(&app, "/profile", &token).await.0, StatusCode::OK);
    let (status, body) = post_json(&app, "/logout", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["detail"], "Successfully logged out.");

    // both tokens carried the revoked key
    assert_eq!(get(&app, "/profile", &token).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(get(&app, "/profile", &second).await.0, StatusCode::UNAUTHORIZED);

    let (_, body) = send(&app, login()).await;
    let fresh = body["data"]["token"].as_str().unwrap();
    assert_eq!(get(&app, "/profile", fresh).await.0, StatusCode::OK);
}

#[actix_web::test]
async fn register_reports_field_errors() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    signup(&app, "ann").await;

    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "email": "ANN@example.com",
            "username": "ann",
            "password": "123",
        }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"]["email"][0], "user with this email already exists.");
    assert_eq!(
        body["errors"]["username"][0],
        "A user with that username already exists."
    );
    assert!(body["errors"]["password"].is_array());

    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({ "email": "not-an-email", "username": "bad name!" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["email"][0], "Enter a valid email address.");
    assert!(body["errors"]["username"].is_array());
    assert_eq!(body["errors"]["password"][0], "This field is required.");
}

#[actix_web::test]
async fn login_rejects_missing_and_wrong_credentials() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    signup(&app, "ann").await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "ann@example.com" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(non_field(&body), vec![r#"Must include "email" and "password"."#]);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "ann@example.com", "password": "nope-nope" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(non_field(&body), vec!["Unable to log in with provided credentials."]);
}

#[actix_web::test]
async fn anonymous_and_forged_requests_are_rejected() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;

    for uri in ["/profile", "/post", "/follow", "/following", "/comment", "/like"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["message"], "Authentication credentials were not provided.");
    }

    let (status, body) = get(&app, "/post", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/register")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}
