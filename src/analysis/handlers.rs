use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::prompt::ImageInput;
use super::{run, AnalysisError, AnalyzeInput, NutritionRecord};
use crate::auth::jwt::MaybeAuthUser;
use crate::state::AppState;
use crate::{meals, profiles};

pub fn routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub note: Option<String>,
    pub image_b64: Option<String>,
    pub image_mime: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub saved: bool,
    pub record: NutritionRecord,
}

/// Error body carrying a machine-readable reason plus diagnostic detail.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            reason: "bad_request",
            detail: Some(detail.into()),
        }),
    )
}

fn internal<E: std::fmt::Display>(e: E) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            reason: "internal",
            detail: Some(e.to_string()),
        }),
    )
}

fn pipeline_error(e: &AnalysisError) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorBody {
            reason: e.reason(),
            detail: Some(e.to_string()),
        }),
    )
}

/// POST /analyze { note?, image_b64?, image_mime? }
/// With a bearer token the stored profile feeds the prompt and the record is
/// persisted; without one the record is returned and discarded.
#[instrument(skip(state, body))]
pub async fn analyze(
    State(state): State<AppState>,
    MaybeAuthUser(owner_id): MaybeAuthUser,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let note = body.note.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let image = match body.image_b64.as_deref() {
        Some(b64) => {
            let bytes = BASE64
                .decode(b64)
                .map_err(|_| bad_request("image_b64 is not valid base64"))?;
            Some(ImageInput {
                body: Bytes::from(bytes),
                mime_type: body
                    .image_mime
                    .clone()
                    .unwrap_or_else(|| "image/jpeg".into()),
            })
        }
        None => None,
    };

    if note.is_none() && image.is_none() {
        return Err(bad_request("at least one of note or image_b64 is required"));
    }

    let profile = match owner_id {
        Some(user_id) => profiles::repo::find_by_user(&state.db, user_id)
            .await
            .map_err(internal)?,
        None => None,
    };

    let record = run(
        state.model.as_ref(),
        AnalyzeInput {
            note,
            image,
            profile: profile.as_ref(),
            owner_id,
        },
    )
    .await
    .map_err(|e| {
        warn!(reason = e.reason(), "analysis failed");
        pipeline_error(&e)
    })?;

    let saved = match owner_id {
        Some(_) => {
            meals::repo::append(&state.db, &record)
                .await
                .map_err(internal)?;
            true
        }
        None => false,
    };

    info!(record_id = %record.id, saved, "meal analyzed");
    Ok(Json(AnalyzeResponse { saved, record }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_omits_absent_detail() {
        let body = ErrorBody {
            reason: "malformed_envelope",
            detail: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"reason":"malformed_envelope"}"#);
    }

    #[test]
    fn pipeline_errors_map_to_bad_gateway_with_reason() {
        let (status, Json(body)) = pipeline_error(&AnalysisError::Rejected {
            status: 429,
            body: "quota exceeded".into(),
        });
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.reason, "rejected");
        assert!(body.detail.unwrap().contains("429"));
    }

    #[test]
    fn analyze_request_deserializes_partial_bodies() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"note": "pasta"}"#).unwrap();
        assert_eq!(req.note.as_deref(), Some("pasta"));
        assert!(req.image_b64.is_none());
        assert!(req.image_mime.is_none());
    }
}
