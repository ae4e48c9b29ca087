//! Adapters against a wiremock server standing in for SoundCloud and Dropbox.
//!
//! `ureq` is blocking, so every adapter call runs on the blocking pool.

use likemirror_core::config::SoundCloudConfig;
use likemirror_core::{HttpFetch, ObjectStore, SourceError, TrackId, TrackSource, UploadOutcome};
use likemirror_remote::{DropboxStore, SoundCloudLikes, UreqFetcher};
use serde_json::json;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Exact header comparison on the raw value. Both the browser agent and the
/// upload argument contain commas, which the list-aware `header` matcher
/// would split.
fn raw_header(
    name: &'static str,
    expected: &'static str,
) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| {
        request
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

fn soundcloud_config(max_pages: u32, api_base: String) -> SoundCloudConfig {
    SoundCloudConfig {
        client_id: "cid".to_string(),
        user_id: "1339565397".to_string(),
        page_size: 2,
        max_pages,
        api_base,
    }
}

fn liked(id: u64, title: &str) -> serde_json::Value {
    json!({
        "track": {
            "id": id,
            "title": title,
            "media": {"transcodings": [
                {"url": format!("https://api/t/{id}/prog"), "format": {"protocol": "progressive", "mime_type": "audio/mpeg"}}
            ]}
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn fetcher_returns_error_statuses_as_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.mp3"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let base = server.uri();
    let (ok, missing) = tokio::task::spawn_blocking(move || {
        let fetcher = UreqFetcher::new();
        (
            fetcher.get(&format!("{base}/audio.mp3")),
            fetcher.get(&format!("{base}/gone.mp3")),
        )
    })
    .await
    .expect("join");

    let ok = ok.expect("response");
    assert_eq!(ok.status, 200);
    assert_eq!(ok.body, b"ID3".to_vec());

    let missing = missing.expect("404 is still a response");
    assert_eq!(missing.status, 404);
    assert!(!missing.is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn likes_listing_sends_credentials_and_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1339565397/likes"))
        .and(query_param("client_id", "cid"))
        .and(query_param("limit", "2"))
        .and(raw_header("user-agent", likemirror_remote::http::USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [liked(1, "One"), {"playlist": {"id": 5}}, liked(2, "Two")],
            "next_href": format!("{}/users/1339565397/likes-page-2?offset=2", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/1339565397/likes-page-2"))
        .and(query_param("offset", "2"))
        .and(query_param("client_id", "cid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [liked(3, "Three")],
            "next_href": null,
        })))
        .mount(&server)
        .await;

    let base = server.uri();
    let tracks = tokio::task::spawn_blocking(move || {
        SoundCloudLikes::new(UreqFetcher::new(), soundcloud_config(5, base))
            .liked_tracks()
    })
    .await
    .expect("join")
    .expect("tracks");

    let ids: Vec<TrackId> = tracks.into_iter().map(|t| t.id).collect();
    assert_eq!(
        ids,
        vec![TrackId::from("1"), TrackId::from("2"), TrackId::from("3")]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn likes_listing_stops_at_max_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1339565397/likes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [liked(1, "One")],
            "next_href": format!("{}/users/1339565397/likes-page-2", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/1339565397/likes-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"collection": []})))
        .expect(0)
        .mount(&server)
        .await;

    let base = server.uri();
    let tracks = tokio::task::spawn_blocking(move || {
        SoundCloudLikes::new(UreqFetcher::new(), soundcloud_config(1, base))
            .liked_tracks()
    })
    .await
    .expect("join")
    .expect("tracks");

    assert_eq!(tracks.len(), 1);
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn likes_listing_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1339565397/likes"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad client_id"))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        SoundCloudLikes::new(UreqFetcher::new(), soundcloud_config(1, base))
            .liked_tracks()
    })
    .await
    .expect("join")
    .unwrap_err();

    match err {
        SourceError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad client_id");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn dropbox_upload_created_and_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(header("authorization", "Bearer tok"))
        .and(raw_header(
            "dropbox-api-arg",
            r#"{"path":"/SoundCloudDownloads/new.mp3","mode":"add","autorename":false,"mute":true}"#,
        ))
        .and(body_bytes(b"audio".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "id:1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(raw_header(
            "dropbox-api-arg",
            r#"{"path":"/SoundCloudDownloads/old.mp3","mode":"add","autorename":false,"mute":true}"#,
        ))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/conflict/file/..",
            "error": {".tag": "path"}
        })))
        .mount(&server)
        .await;

    let base = server.uri();
    let (created, conflict) = tokio::task::spawn_blocking(move || {
        let store = DropboxStore::with_content_base("tok", base);
        (
            store.upload(b"audio", "/SoundCloudDownloads/new.mp3"),
            store.upload(b"audio", "/SoundCloudDownloads/old.mp3"),
        )
    })
    .await
    .expect("join");

    assert_eq!(created.expect("created"), UploadOutcome::Created);
    assert_eq!(conflict.expect("conflict"), UploadOutcome::AlreadyExists);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropbox_other_errors_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(507).set_body_json(json!({
            "error_summary": "path/insufficient_space/.."
        })))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        DropboxStore::with_content_base("tok", base).upload(b"audio", "/x/a.mp3")
    })
    .await
    .expect("join")
    .unwrap_err();

    assert_eq!(err.destination, "/x/a.mp3");
    assert!(err.reason.contains("insufficient_space"), "{}", err.reason);
}
