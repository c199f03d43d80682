#![cfg(feature = "inmem-store")]

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header;
use actix_web::{test, web, App};
use comic_reader::auth::{create_jwt, Role};
use comic_reader::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use comic_reader::repo::inmem::InMemRepo;
use comic_reader::storage::FsMediaStore;
use comic_reader::{config, AppState};
use serde_json::{json, Value};
use serial_test::serial;

const BOUNDARY: &str = "----comicreaderboundary";
const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R'];

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
}

fn bearer(sub: &str, role: Role) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", create_jwt(sub, vec![role]).unwrap()))
}

async fn app_state(dir: &tempfile::TempDir) -> AppState {
    let media = FsMediaStore::new(dir.path()).await.unwrap();
    AppState::new(Arc::new(InMemRepo::new()), Arc::new(media))
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.bin\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, auth: (&'static str, String), parts: &[Part]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(auth)
        .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(multipart(parts))
}

fn register(sub: &str, name: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/profiles")
        .insert_header(bearer(sub, Role::Reader))
        .set_json(&json!({ "name": name, "bio": null, "bio_writing_mode": null }))
}

#[actix_web::test]
#[serial]
async fn post_with_media_replies_and_likes() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(web::Data::new(app_state(&dir).await)).configure(config)).await;

    let mai: Value = test::call_and_read_body_json(&app, register("mai", "Mai").to_request()).await;
    let _: Value = test::call_and_read_body_json(&app, register("lan", "Lan").to_request()).await;

    let req = multipart_request(
        "/api/v1/posts",
        bearer("mai", Role::Reader),
        &[
            Part::Text("text_content", "first impressions"),
            Part::Text("writing_mode", "vertical-rl"),
            Part::File("media", PNG),
            Part::Text("alt_text", "a sketch"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let root: Value = test::read_body_json(resp).await;
    let root_id = root["post"]["id"].as_i64().unwrap();
    assert_eq!(root["post"]["profile_id"], mai["id"]);
    assert_eq!(root["post"]["writing_mode"], "vertical-rl");
    assert_eq!(root["media"][0]["alt_text"], "a sketch");
    assert_eq!(root["media"][0]["mime"], "image/png");

    // the attachment is served from the content-addressed store
    let hash = root["media"][0]["hash"].as_str().unwrap().to_string();
    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/media/{hash}")).to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(&test::read_body(resp).await[..], PNG);

    let reply_to = root_id.to_string();
    let req = multipart_request(
        "/api/v1/posts",
        bearer("lan", Role::Reader),
        &[Part::Text("text_content", "agreed"), Part::Text("reply_to", &reply_to)],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let detail: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&format!("/api/v1/posts/{root_id}")).to_request())
            .await;
    assert_eq!(detail["replies"].as_array().unwrap().len(), 1);
    assert_eq!(detail["replies"][0]["post"]["text_content"], "agreed");

    let feed: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/feed").to_request()).await;
    assert_eq!(feed.as_array().unwrap().len(), 2);

    let like = |method: test::TestRequest| method.uri(&format!("/api/v1/posts/{root_id}/like")).insert_header(bearer("lan", Role::Reader));
    let liked: Value = test::call_and_read_body_json(&app, like(test::TestRequest::post()).to_request()).await;
    assert_eq!(liked["like_count"], 1);
    let liked: Value = test::call_and_read_body_json(&app, like(test::TestRequest::post()).to_request()).await;
    assert_eq!(liked["like_count"], 1);
    let unliked: Value = test::call_and_read_body_json(&app, like(test::TestRequest::delete()).to_request()).await;
    assert_eq!(unliked["like_count"], 0);

    // only the author or an admin may delete
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{root_id}"))
        .insert_header(bearer("lan", Role::Reader))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{root_id}"))
        .insert_header(bearer("mai", Role::Reader))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let feed: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/feed").to_request()).await;
    assert!(feed.as_array().unwrap().is_empty());

    let profile: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/v1/profiles/{}", mai["id"])).to_request(),
    )
    .await;
    assert_eq!(profile["profile"]["name"], "Mai");
    assert!(profile["posts"].as_array().unwrap().is_empty());
}

#[actix_web::test]
#[serial]
async fn posting_requires_profile_and_valid_attachments() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(web::Data::new(app_state(&dir).await)).configure(config)).await;

    let req = multipart_request("/api/v1/posts", bearer("ghost", Role::Reader), &[Part::Text("text_content", "hi")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    assert_eq!(test::call_service(&app, register("mai", "Mai").to_request()).await.status(), 201);
    assert_eq!(test::call_service(&app, register("mai", "Mai").to_request()).await.status(), 409);

    let req = multipart_request(
        "/api/v1/posts",
        bearer("mai", Role::Reader),
        &[Part::Text("text_content", "look"), Part::File("media", b"plain text is not an image")],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 415);

    let req = multipart_request(
        "/api/v1/posts",
        bearer("mai", Role::Reader),
        &[Part::Text("text_content", "hi"), Part::Text("alt_text", "orphan")],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = multipart_request(
        "/api/v1/posts",
        bearer("mai", Role::Reader),
        &[Part::Text("text_content", "hi"), Part::Text("reply_to", "9999")],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
#[serial]
async fn posting_is_rate_limited() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let limits = RateLimitConfig { post_limit: 1, post_window: Duration::from_secs(60), ..RateLimitConfig::default() };
    let state = app_state(&dir)
        .await
        .with_rate_limiter(RateLimiterFacade::new(InMemoryRateLimiter::new(true), limits));
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;
    assert_eq!(test::call_service(&app, register("mai", "Mai").to_request()).await.status(), 201);

    let post = || multipart_request("/api/v1/posts", bearer("mai", Role::Reader), &[Part::Text("text_content", "hi")]);
    assert_eq!(test::call_service(&app, post().to_request()).await.status(), 201);
    let resp = test::call_service(&app, post().to_request()).await;
    assert_eq!(resp.status(), 429);
}

#[actix_web::test]
#[serial]
async fn media_upload_is_publisher_only_and_deduplicated() {
    setup_env();
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().app_data(web::Data::new(app_state(&dir).await)).configure(config)).await;

    let req = multipart_request("/api/v1/media", bearer("r", Role::Reader), &[Part::File("file", PNG)]).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = multipart_request("/api/v1/media", bearer("p", Role::Publisher), &[Part::File("file", PNG)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let first: Value = test::read_body_json(resp).await;
    assert_eq!(first["duplicate"], false);
    assert_eq!(first["size"], PNG.len());
    assert_eq!(first["url"], format!("/media/{}", first["hash"].as_str().unwrap()));

    let req = multipart_request("/api/v1/media", bearer("p", Role::Publisher), &[Part::File("file", PNG)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(second["duplicate"], true);
    assert_eq!(second["hash"], first["hash"]);

    let req = multipart_request("/api/v1/media", bearer("p", Role::Publisher), &[Part::Text("other", "x")]).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/media/{}", "0".repeat(64))).to_request()).await;
    assert_eq!(resp.status(), 404);
}
