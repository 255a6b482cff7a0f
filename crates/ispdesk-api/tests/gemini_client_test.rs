#![allow(clippy::unwrap_used)]
// Integration tests for `GeminiClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ispdesk_api::{Error, GeminiClient};

// ── Helpers ─────────────────────────────────────────────────────────

const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

async fn setup() -> (MockServer, GeminiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = GeminiClient::with_client(reqwest::Client::new(), base_url, "gemini-2.5-flash");
    (server, client)
}

// ── Generation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "summarise" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "**Revenue** " }, { "text": "is up." }] }
            }]
        })))
        .mount(&server)
        .await;

    let text = client.generate("summarise").await.unwrap();
    assert_eq!(text, "**Revenue** is up.");
}

#[tokio::test]
async fn test_generate_surfaces_api_error_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let result = client.generate("summarise").await;
    match result {
        Err(Error::Gemini { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected Gemini error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_rejects_empty_candidates() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let result = client.generate("summarise").await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}
