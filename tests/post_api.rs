mod common;

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Utc;
use image::GenericImageView;
use serde_json::json;

use common::*;

#[actix_web::test]
async fn post_listing_and_filters() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    let (_, ann) = signup(&app, "ann").await;
    let (bob_id, bob) = signup(&app, "bob").await;

    let first = publish_post(&app, &ann, "Rust on the server", json!([{ "text": "#Rust" }, "web"])).await;
    publish_post(&app, &bob, "Cooking notes", json!(["food"])).await;
    let third = publish_post(&app, &bob, "More rust", json!(["RUST"])).await;

    let (status, body) = get(&app, "/post", &ann).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["id"], third);
    assert_eq!(rows[2]["hashtags"], json!(["rust", "web"]));
    assert_eq!(rows[2]["author"], "ann");
    assert_eq!(rows[2]["is_published"], true);

    let (_, body) = get(&app, "/post?tags=rust,food", &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    let (_, body) = get(&app, "/post?tags=web", &ann).await;
    assert_eq!(body["data"][0]["id"], first);

    // tag values that can never be stored just match nothing
    let (status, body) = get(&app, "/post?tags=%23", &ann).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    let (status, body) = get(&app, &format!("/post?tags={}", "x".repeat(150)), &ann).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = get(&app, "/post?author=BO", &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = get(&app, "/post?content=cooking", &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    post_json(&app, "/follow", &ann, json!({ "followee": bob_id })).await;
    let (_, body) = get(&app, "/post/my_following", &ann).await;
    let authors: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["author"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(authors, vec!["bob", "bob"]);

    let (status, body) = post_json(&app, "/post", &ann, json!({ "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["content"][0], "This field may not be blank.");
}

#[actix_web::test]
async fn post_update_and_delete_are_author_only() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    let (_, ann) = signup(&app, "ann").await;
    let (_, bob) = signup(&app, "bob").await;
    let id = publish_post(&app, &ann, "draft", json!(["one"])).await;
    let uri = format!("/post/{}", id);

    let (status, _) = patch_json(&app, &uri, &bob, json!({ "content": "mine now" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&ann))
        .set_json(json!({ "hashtags": ["two", "#Three"] }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "draft");
    assert_eq!(body["data"]["hashtags"], json!(["three", "two"]));

    assert_eq!(delete(&app, &uri, &bob).await.0, StatusCode::FORBIDDEN);
    assert_eq!(delete(&app, &uri, &ann).await.0, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri, &ann).await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/post/not-a-number", &ann).await.0, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn scheduled_post_goes_live_after_its_time() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    let (_, ann) = signup(&app, "ann").await;
    let (_, bob) = signup(&app, "bob").await;

    let (status, body) = post_json(
        &app,
        "/post",
        &ann,
        json!({ "content": "later", "is_published": false }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        non_field(&body),
        vec!["Choose a time to_publicate or set is_published = True if you want to publish now."]
    );

    let past = (Utc::now() - chrono::Duration::minutes(5)).to_rfc3339();
    let (status, body) = post_json(
        &app,
        "/post",
        &ann,
        json!({ "content": "later", "is_published": false, "time_to_publicate": past }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        non_field(&body),
        vec!["You must set a future time for `time_to_publicate`."]
    );

    let eta = (Utc::now() + chrono::Duration::milliseconds(300)).to_rfc3339();
    let (status, body) = post_json(
        &app,
        "/post",
        &ann,
        json!({ "content": "later", "is_published": false, "time_to_publicate": eta }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_published"], false);
    let id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/post/{}", id);

    let (_, body) = get(&app, "/post", &bob).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(get(&app, &uri, &bob).await.0, StatusCode::NOT_FOUND);
    // the author still sees it
    assert_eq!(get(&app, &uri, &ann).await.0, StatusCode::OK);
    let (_, body) = get(&app, "/post/my_posts", &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    actix_rt::time::sleep(Duration::from_millis(900)).await;

    let (_, body) = get(&app, "/post", &bob).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["is_published"], true);
}

#[actix_web::test]
async fn likes_and_comments_respect_authorship() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    let (ann_id, ann) = signup(&app, "ann").await;
    let (bob_id, bob) = signup(&app, "bob").await;
    let (_, cat) = signup(&app, "cat").await;
    let post_id = publish_post(&app, &ann, "hello", json!([])).await;
    let like_uri = format!("/post/{}/like", post_id);

    let (status, body) = post_json(&app, &like_uri, &ann, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(non_field(&body), vec!["You cannot like your post"]);

    // toggle: create, flip, then explicit value
    let (status, body) = post_json(&app, &like_uri, &bob, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_likes"], true);
    assert_eq!(body["data"]["reviewer"], bob_id);
    let like_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = get(&app, "/post/liked", &bob).await;
    assert_eq!(body["data"][0]["id"], post_id);

    let req = test::TestRequest::post()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_likes"], false);
    let (_, body) = get(&app, "/post/liked", &bob).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // a body that does not parse is rejected and leaves the like alone
    let (status, body) = post_json(&app, &like_uri, &bob, json!({ "is_likes": "yes" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    let req = test::TestRequest::post()
        .uri(&like_uri)
        .insert_header(bearer(&bob))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{oops")
        .to_request();
    assert_eq!(send(&app, req).await.0, StatusCode::BAD_REQUEST);
    let (_, body) = get(&app, &format!("/like/{}", like_id), &bob).await;
    assert_eq!(body["data"]["is_likes"], false);

    let (status, body) = post_json(&app, &like_uri, &bob, json!({ "is_likes": false })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], like_id);
    assert_eq!(body["data"]["is_likes"], false);

    // the plain like resource
    let (status, body) = post_json(&app, "/like", &bob, json!({ "post": post_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(non_field(&body), vec!["The fields post, reviewer must make a unique set."]);
    let (status, body) = post_json(&app, "/like", &cat, json!({ "post": post_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_likes"], false);
    let (status, _) = post_json(&app, "/like", &ann, json!({ "post": post_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/like/{}", like_id);
    assert_eq!(
        patch_json(&app, &uri, &cat, json!({ "is_likes": true })).await.0,
        StatusCode::FORBIDDEN
    );
    let (status, body) = patch_json(&app, &uri, &bob, json!({ "is_likes": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_likes"], true);

    let (_, body) = get(&app, &format!("/like?post={}", post_id), &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(get(&app, "/like?post=x", &ann).await.0, StatusCode::BAD_REQUEST);

    // comments
    let (status, body) = post_json(
        &app,
        "/comment",
        &ann,
        json!({ "post": post_id, "content": "nice me" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(non_field(&body), vec!["You cannot comment your post"]);

    let (status, body) = post_json(
        &app,
        "/comment",
        &bob,
        json!({ "post": post_id, "content": "nice post" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["reviewer"], bob_id);
    let comment_uri = format!("/comment/{}", body["data"]["id"]);

    let (status, body) = post_json(&app, "/comment", &bob, json!({ "post": 999, "content": "?" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["post"][0], r#"Invalid pk "999" - object does not exist."#);

    assert_eq!(
        patch_json(&app, &comment_uri, &ann, json!({ "content": "edited" })).await.0,
        StatusCode::FORBIDDEN
    );
    let (_, body) = patch_json(&app, &comment_uri, &bob, json!({ "content": "edited" })).await;
    assert_eq!(body["data"]["content"], "edited");

    let (_, body) = get(&app, "/comment?reviewer=BO", &ann).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = get(&app, &format!("/comment?reviewer_id={}", ann_id), &ann).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (status, body) = get(&app, "/comment?post=abc&reviewer_id=x", &ann).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["post"].is_array());
    assert!(body["errors"]["reviewer_id"].is_array());

    assert_eq!(delete(&app, &comment_uri, &ann).await.0, StatusCode::FORBIDDEN);
    assert_eq!(delete(&app, &comment_uri, &bob).await.0, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn oversized_post_image_is_downscaled() {
    let ts = test_state();
    let app = init_app(ts.state.clone()).await;
    let (_, ann) = signup(&app, "ann").await;
    let (_, bob) = signup(&app, "bob").await;
    let id = publish_post(&app, &ann, "pictures", json!([])).await;
    let uri = format!("/post/{}/upload_image", id);

    let (status, _) = post_json(&app, &uri, &bob, json!({ "picture": png_upload(8, 8) })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut garbage = png_upload(8, 8);
    garbage["image_data"] = json!("bm90IGFuIGltYWdl");
    let (status, body) = post_json(&app, &uri, &ann, json!({ "picture": garbage })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["picture"][0]
        .as_str()
        .unwrap()
        .starts_with("Upload a valid image."));

    let (status, body) = post_json(&app, &uri, &ann, json!({ "picture": png_upload(2400, 1200) })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["post"], id);
    let url = body["data"]["picture"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/"));
    assert!(url.contains("/post-"));

    let req = test::TestRequest::get().uri(&url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = test::read_body(resp).await;
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.dimensions(), (1080, 540));

    let (_, body) = get(&app, &format!("/post/{}", id), &bob).await;
    assert_eq!(body["data"]["images"][0]["picture"], url.as_str());

    // an image can also ride along with the post itself
    let (status, body) = post_json(
        &app,
        "/post",
        &ann,
        json!({ "content": "with image", "image": png_upload(10, 10) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/media/../Cargo.toml").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());
}
