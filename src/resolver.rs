//! Answer resolution: one ask round trip plus payload normalization.
//!
//! The backend sometimes returns answers keyed by question text and
//! sometimes one composite numbered string. Both shapes normalize into an
//! ordered [`AnswerMap`] here, so callers never see the difference.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::backend::{AnswerPayload, BackendClient};
use crate::error::SessionError;
use crate::models::{AnswerMap, DocumentHandle, Question};

/// Marks the start of one numbered answer: start of input or a newline,
/// one or more digits, a period, one or more spaces.
static NUMBERED_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\A|\n)[0-9]+\. +").expect("pattern is valid"));

/// Fetches answers for an ingested document and reconstructs discrete
/// question/answer pairs.
pub struct AnswerResolver {
    client: Arc<dyn BackendClient>,
}

impl AnswerResolver {
    /// Creates a resolver over the given backend client.
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    /// Submits the questions and normalizes the response.
    pub async fn resolve(
        &self,
        handle: &DocumentHandle,
        questions: &[Question],
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<AnswerMap, SessionError> {
        let texts: Vec<String> = questions.iter().map(|q| q.text().to_string()).collect();

        let response = self
            .client
            .ask(handle.as_str(), &texts, credential, trial_flag)
            .await
            .map_err(SessionError::Answer)?;

        if let Some(version) = &response.version {
            debug!(version, "ask backend version");
        }

        Ok(match response.answer {
            AnswerPayload::Structured(map) => from_structured(&texts, map),
            AnswerPayload::Composite(raw) => from_composite(&texts, &raw),
        })
    }
}

/// Re-orders a backend-keyed map into submitted question order. Questions
/// the backend skipped get an empty answer; extra keys are dropped.
fn from_structured(questions: &[String], mut map: HashMap<String, String>) -> AnswerMap {
    let mut answers = AnswerMap::new();
    for question in questions {
        let answer = map.remove(question).unwrap_or_default();
        answers.insert(question.clone(), answer);
    }
    if !map.is_empty() {
        debug!(extra = map.len(), "backend returned answers for unknown questions");
    }
    answers
}

/// Splits a composite string and pairs fragments positionally with the
/// submitted question order.
///
/// Best effort: the numbering is not machine-validated on the backend
/// side, so fewer fragments than questions degrades to empty answers
/// instead of failing the call. A payload with no numbering at all
/// becomes one giant first answer with the rest empty.
fn from_composite(questions: &[String], raw: &str) -> AnswerMap {
    let fragments = split_composite(raw);
    if fragments.len() < questions.len() {
        warn!(
            fragments = fragments.len(),
            questions = questions.len(),
            "composite answer has fewer fragments than questions"
        );
    }

    let mut answers = AnswerMap::new();
    for (index, question) in questions.iter().enumerate() {
        let answer = fragments.get(index).cloned().unwrap_or_default();
        answers.insert(question.clone(), answer);
    }
    answers
}

/// The composite-format assumption lives here and nowhere else; swap the
/// pattern without touching callers.
fn split_composite(raw: &str) -> Vec<String> {
    NUMBERED_ANSWER
        .split(raw)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(String::from)
        .collect()
}
