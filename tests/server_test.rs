//! Tests for the playlist HTTP server

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{playlist, record, write_file};
use playcheck::server::{playlist_router, PLAYLIST_CONTENT_TYPE};
use tempfile::TempDir;
use tower::util::ServiceExt;

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "pk_working.m3u",
        &playlist(&[record("Geo.pk", "Geo", "Pakistani News", "http://pk/geo")]),
    );
    write_file(dir.path(), "notes.txt", "not a playlist");
    dir
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Test a playlist is served with the M3U content type and CORS headers
#[tokio::test]
async fn test_serves_playlist() {
    let dir = fixture();
    let app = playlist_router(dir.path());

    let request = Request::builder()
        .uri("/pk_working.m3u")
        .header(header::ORIGIN, "http://tv.local")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        PLAYLIST_CONTENT_TYPE
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );

    let text = body_text(response).await;
    assert!(text.starts_with("#EXTM3U"));
    assert!(text.contains("http://pk/geo"));
}

/// Test preflight requests from browser players are answered
#[tokio::test]
async fn test_cors_preflight() {
    let dir = fixture();
    let app = playlist_router(dir.path());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/pk_working.m3u")
        .header(header::ORIGIN, "http://tv.local")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

/// Test the index lists only playlists
#[tokio::test]
async fn test_index_lists_playlists() {
    let dir = fixture();
    write_file(dir.path(), "all.m3u8", "#EXTM3U\n");
    let app = playlist_router(dir.path());

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        json["playlists"],
        serde_json::json!(["all.m3u8", "pk_working.m3u"])
    );
}

/// Test non-playlist and missing files are not served
#[tokio::test]
async fn test_other_files_not_served() {
    let dir = fixture();

    for uri in ["/notes.txt", "/missing.m3u", "/..%2Fpk_working.m3u"] {
        let app = playlist_router(dir.path());
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
