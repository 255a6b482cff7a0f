// Gemini `generateContent` client.
//
// Single-shot text generation used for dashboard insights. The API key
// travels in the `x-goog-api-key` header, never in the URL.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Public endpoint of the generative language API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Client ──────────────────────────────────────────────────────────

/// Text generation client for one model.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    model: String,
}

impl GeminiClient {
    /// Build a client with the API key installed as a default header.
    pub fn new(
        api_key: &SecretString,
        model: impl Into<String>,
        endpoint: Option<&str>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret()).map_err(|_| {
            Error::Authentication {
                message: "Gemini API key contains invalid header characters".into(),
            }
        })?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let http = transport.build_client_with_headers(headers)?;

        let base_url = Url::parse(endpoint.unwrap_or(DEFAULT_ENDPOINT))?;
        Ok(Self::with_client(http, base_url, model))
    }

    /// Wrap an existing `reqwest::Client` (tests point this at a mock server).
    pub fn with_client(http: reqwest::Client, base_url: Url, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text for a single prompt. Multiple returned parts are concatenated.
    pub async fn generate(&self, prompt: &str) -> Result<String, Error> {
        let url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))?;
        debug!(model = %self.model, "requesting Gemini completion");

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| text.clone());
            return Err(Error::Gemini {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;

        let generated: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if generated.trim().is_empty() {
            return Err(Error::Deserialization {
                message: "response contained no text candidates".into(),
                body: text,
            });
        }
        Ok(generated)
    }
}
