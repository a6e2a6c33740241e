mod common;

use axum::http::StatusCode;
use common::{app, get};
use futures::StreamExt;
use http_helpers::json_request;
use std::time::Duration;
use tower::ServiceExt;

/// Read body frames until one carries a `guests` event, and return its data.
async fn next_guest_event<S>(frames: &mut S) -> serde_json::Value
where
    S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
            .await
            .expect("event in time")
            .expect("stream open")
            .expect("frame");
        let text = String::from_utf8(frame.to_vec()).expect("utf8");
        if !text.contains("event: guests") {
            continue;
        }
        let data = text
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .expect("data line");
        return serde_json::from_str(data).expect("json");
    }
}

#[tokio::test]
async fn watch_streams_initial_list_and_updates() {
    let app = app();
    let response = app
        .clone()
        .oneshot(get("/v1/guests/watch"))
        .await
        .expect("watch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("text/event-stream")
    );
    let mut frames = Box::pin(response.into_body().into_data_stream());

    let initial = next_guest_event(&mut frames).await;
    assert_eq!(initial["items"].as_array().map(Vec::len), Some(0));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/guests",
            serde_json::json!({ "name": "John Smith", "plus_one": true }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let updated = next_guest_event(&mut frames).await;
    let items = updated["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], "john-smith");
    assert_eq!(items[0]["invitation_url"], "https://wedding.example/john-smith");
}
