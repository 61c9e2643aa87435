mod common;

use actix_web::http::StatusCode;
use actix_web::test;

use common::*;

#[actix_web::test]
async fn api_document_is_served_without_a_token() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;

    let req = test::TestRequest::get().uri("/api/openapi.json").to_request();
    let (status, doc) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "Socialnet API");

    let post_params: Vec<&str> = doc["paths"]["/post"]["get"]["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(post_params, vec!["tags", "author", "content"]);
    assert!(doc["paths"]["/profile/{id}"]["delete"].is_object());
    assert!(doc["paths"]["/post/{id}/like"]["post"].is_object());
}
