//! Wire types for the two backend endpoints.

use std::collections::HashMap;

use serde::Deserialize;

/// Response to a document ingest call.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestResponse {
    /// Opaque identifier for the ingested document.
    pub handle: String,
    /// Optional human-readable status message.
    #[serde(default)]
    pub message: Option<String>,
    /// Backend contract version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Response to an ask call.
#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    /// The answers, in one of the two shapes the backend produces.
    pub answer: AnswerPayload,
    /// Echo of the submitted questions.
    #[serde(default)]
    pub questions: Vec<String>,
    /// Backend contract version.
    #[serde(default)]
    pub version: Option<String>,
}

/// The two shapes the backend returns answers in.
///
/// Newer backend versions key answers by question text; older ones reply
/// with one composite numbered string. The structured arm comes first so
/// a JSON object never falls through to the string arm.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnswerPayload {
    /// Answers keyed by question text.
    Structured(HashMap<String, String>),
    /// One free-text string containing numbered answers ("1. … 2. …").
    Composite(String),
}
