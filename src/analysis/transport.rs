use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::error::AnalysisError;
use super::prompt::{Segment, SYSTEM_INSTRUCTION};
use crate::config::ModelConfig;

/// Seam to the remote multimodal endpoint. One request attempt per call, no
/// retry; the caller decides whether to resubmit on failure.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, segments: &[Segment]) -> Result<String, AnalysisError>;
}

// --- wire types (generateContent) ---

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// HTTP client for the Gemini-style generateContent endpoint.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(cfg: &ModelConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request(segments: &[Segment]) -> GenerateRequest {
        let parts = segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => Part::Text { text: t.clone() },
                Segment::InlineImage { mime_type, data } => Part::InlineData {
                    inline_data: Blob {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
            })
            .collect();
        GenerateRequest {
            contents: vec![Content { parts }],
            system_instruction: Content {
                parts: vec![Part::Text {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
        }
    }
}

/// Maps one HTTP exchange to the transport taxonomy: non-2xx carries the
/// status and server body, 2xx goes through envelope extraction.
fn handle_response(status: StatusCode, body: String) -> Result<String, AnalysisError> {
    if !status.is_success() {
        return Err(AnalysisError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    extract_text(&body)
}

/// Pulls the reply text out of the envelope via the fixed path: first
/// candidate, first content part. Anything else is a malformed envelope.
fn extract_text(body: &str) -> Result<String, AnalysisError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|_| AnalysisError::MalformedEnvelope)?;
    parsed
        .candidates
        .and_then(|mut c| (!c.is_empty()).then(|| c.remove(0)))
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .and_then(|mut p| (!p.is_empty()).then(|| p.remove(0)))
        .and_then(|p| p.text)
        .ok_or(AnalysisError::MalformedEnvelope)
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, segments: &[Segment]) -> Result<String, AnalysisError> {
        let request = Self::build_request(segments);
        debug!(model = %self.model, segments = segments.len(), "sending generate request");

        let response = self
            .http
            .post(self.build_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            error!(status = %status, "model endpoint rejected request");
        }
        handle_response(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;

    #[test]
    fn extract_text_happy_path() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"dish_name\":\"Soup\"}"}]}}
            ]
        }"#;
        assert_eq!(extract_text(body).unwrap(), r#"{"dish_name":"Soup"}"#);
    }

    #[test]
    fn extract_text_takes_first_candidate_first_part() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "first"}, {"text": "second"}]}},
                {"content": {"parts": [{"text": "other candidate"}]}}
            ]
        }"#;
        assert_eq!(extract_text(body).unwrap(), "first");
    }

    #[test]
    fn missing_candidates_is_malformed_envelope() {
        // Shape a safety filter produces: 200 with no candidates.
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(matches!(
            extract_text(body),
            Err(AnalysisError::MalformedEnvelope)
        ));
    }

    #[test]
    fn empty_parts_is_malformed_envelope() {
        let body = r#"{"candidates": [{"content": {"parts": []}}]}"#;
        assert!(matches!(
            extract_text(body),
            Err(AnalysisError::MalformedEnvelope)
        ));
    }

    #[test]
    fn non_json_body_is_malformed_envelope() {
        assert!(matches!(
            extract_text("<html>oops</html>"),
            Err(AnalysisError::MalformedEnvelope)
        ));
    }

    #[test]
    fn http_429_maps_to_rejected_with_status() {
        let err = handle_response(
            StatusCode::TOO_MANY_REQUESTS,
            "quota exceeded".to_string(),
        )
        .unwrap_err();
        match err {
            AnalysisError::Rejected { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err_reason(429), "rejected");
    }

    fn err_reason(status: u16) -> &'static str {
        AnalysisError::Rejected {
            status,
            body: String::new(),
        }
        .reason()
    }

    #[test]
    fn request_serializes_text_and_inline_data() {
        let segments = vec![
            Segment::Text("hello".into()),
            Segment::InlineImage {
                mime_type: "image/png".into(),
                data: "aWRr".into(),
            },
        ];
        let request = GeminiClient::build_request(&segments);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        assert!(json["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("JSON"));
    }

    #[test]
    fn url_embeds_model_and_key() {
        let client = GeminiClient::new(&crate::config::ModelConfig {
            api_key: "k123".into(),
            model: "gemini-2.0-flash".into(),
            base_url: "https://example.test/v1beta/".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            client.build_url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent?key=k123"
        );
    }
}
