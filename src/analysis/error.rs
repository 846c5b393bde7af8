use thiserror::Error;

/// Failure taxonomy for one analysis invocation. Every variant is recoverable
/// by resubmitting; none of them abort the process.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Connection or timeout talking to the model endpoint.
    #[error("model endpoint unreachable: {0}")]
    Unreachable(String),
    /// Non-2xx status from the model endpoint.
    #[error("model endpoint rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// 2xx response but the expected text payload is absent from the envelope,
    /// e.g. safety filtering produced no candidate.
    #[error("model response envelope carried no text payload")]
    MalformedEnvelope,
    /// The reply contains no `{` at all.
    #[error("no JSON object found in model reply")]
    NoJsonFound,
    /// The sliced reply is not parseable JSON.
    #[error("model reply is not valid JSON: {0}")]
    InvalidJson(String),
}

impl AnalysisError {
    /// Stable machine-readable reason, exposed to API clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::Rejected { .. } => "rejected",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::NoJsonFound => "no_json_found",
            Self::InvalidJson(_) => "invalid_json",
        }
    }
}
