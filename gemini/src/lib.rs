//! Minimal Google Gemini image generation client.
//!
//! This crate provides a focused client for the `generateContent` endpoint
//! as used for image generation ("Nano Banana"):
//! - Text prompt in, optional inline image bytes out
//! - Base64 decoding of inline image payloads
//! - No streaming, no chat state

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a Gemini client from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model identifier this client sends requests to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a text prompt and return whatever the model produced.
    ///
    /// A response without an inline image part is not an error; callers
    /// inspect [`GenerateResponse::image`] to decide what to do.
    pub async fn generate_image(&self, prompt: &str) -> Result<GenerateResponse, Error> {
        let api_request = ApiRequest {
            contents: vec![ApiContent {
                parts: vec![ApiRequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!(
                "{API_BASE}/models/{}:generateContent",
                self.model
            ))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

fn parse_response(api_response: ApiResponse) -> Result<GenerateResponse, Error> {
    let candidate_count = api_response.candidates.len();
    let mut part_count = 0;
    let mut image = None;
    let mut text_parts = Vec::new();

    if let Some(candidate) = api_response.candidates.into_iter().next() {
        if let Some(content) = candidate.content {
            part_count = content.parts.len();
            for part in content.parts {
                if let Some(inline) = part.inline_data {
                    if image.is_none() {
                        let bytes = base64::engine::general_purpose::STANDARD
                            .decode(inline.data.as_bytes())
                            .map_err(|e| Error::Parse(format!("Invalid image data: {e}")))?;
                        image = Some(ImageData {
                            mime_type: inline.mime_type,
                            bytes,
                        });
                    }
                }
                if let Some(text) = part.text {
                    text_parts.push(text);
                }
            }
        }
    }

    Ok(GenerateResponse {
        model: api_response.model_version,
        candidate_count,
        part_count,
        image,
        text: if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join(""))
        },
    })
}

// ============================================================================
// Public types
// ============================================================================

/// The result of a generation request.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Model version the API reported, if any.
    pub model: Option<String>,

    /// Number of candidates in the raw response.
    pub candidate_count: usize,

    /// Number of content parts in the first candidate.
    pub part_count: usize,

    /// The first inline image, if the model produced one.
    pub image: Option<ImageData>,

    /// Concatenated text parts, if any.
    pub text: Option<String>,
}

impl GenerateResponse {
    /// True when the response carried inline image bytes.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Decoded inline image data.
#[derive(Clone)]
pub struct ImageData {
    /// MIME type reported by the API (typically image/png).
    pub mime_type: String,

    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("bytes", &format!("{} bytes", self.bytes.len()))
            .finish()
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    contents: Vec<ApiContent>,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    parts: Vec<ApiRequestPart>,
}

#[derive(Debug, Serialize)]
struct ApiRequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: Option<ApiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseContent {
    #[serde(default)]
    parts: Vec<ApiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ApiResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<ApiInlineData>,
}

#[derive(Debug, Deserialize)]
struct ApiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_client_with_model() {
        let client = Gemini::new("test-key").with_model("gemini-2.5-flash");
        assert_eq!(client.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_parse_response_with_image() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"not-a-real-png");
        let raw = format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"text":"Here you go"}},{{"inlineData":{{"mimeType":"image/png","data":"{encoded}"}}}}]}}}}],"modelVersion":"gemini-2.5-flash-image-preview"}}"#
        );
        let api: ApiResponse = serde_json::from_str(&raw).unwrap();
        let response = parse_response(api).unwrap();

        assert!(response.has_image());
        assert_eq!(response.candidate_count, 1);
        assert_eq!(response.part_count, 2);
        assert_eq!(response.image.as_ref().unwrap().bytes, b"not-a-real-png");
        assert_eq!(response.text.as_deref(), Some("Here you go"));
    }

    #[test]
    fn test_parse_response_without_image() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"I cannot draw that"}]}}]}"#;
        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        let response = parse_response(api).unwrap();

        assert!(!response.has_image());
        assert_eq!(response.part_count, 1);
        assert_eq!(response.text.as_deref(), Some("I cannot draw that"));
    }

    #[test]
    fn test_parse_response_empty() {
        let api: ApiResponse = serde_json::from_str("{}").unwrap();
        let response = parse_response(api).unwrap();

        assert!(!response.has_image());
        assert_eq!(response.candidate_count, 0);
        assert!(response.text.is_none());
    }

    #[test]
    fn test_parse_response_bad_base64() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"%%%"}}]}}]}"#;
        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(parse_response(api), Err(Error::Parse(_))));
    }
}
