//! Crate-wide error taxonomy.
//!
//! Validation problems are reported inline and never produce a backend
//! round trip; everything else is scoped to a single `ask()` invocation
//! and leaves the session in a retryable state.

use thiserror::Error;

use crate::backend::BackendError;
use crate::trial::StoreError;

/// Input rejected before any network work starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A question exceeded the per-question length cap.
    #[error("question is {len} characters, the maximum is {max}")]
    QuestionTooLong { len: usize, max: usize },

    /// No document has been selected yet.
    #[error("no document selected")]
    NoDocument,

    /// Every question slot is blank.
    #[error("no questions to submit")]
    NoQuestions,

    /// The document URL is not a valid absolute http(s) URL.
    #[error("malformed document URL: {url}")]
    MalformedUrl { url: String },

    /// The document URL does not end in a supported extension.
    #[error("URL must point to a PDF, TXT, or DOC file: {url}")]
    UnsupportedExtension { url: String },

    /// The uploaded file's MIME type is not accepted.
    #[error("unsupported document type: {mime}")]
    UnsupportedMime { mime: String },

    /// The uploaded file exceeds the size cap.
    #[error("document is {size} bytes, the maximum is {max}")]
    OversizedDocument { size: u64, max: u64 },
}

/// Failure of a single `ask()` cycle.
///
/// The `Ingest`/`Answer` split tells the caller which stage failed: an
/// ingest failure left the session without a handle, while an answer
/// failure kept the handle so a retry skips re-ingestion.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input rejected before any backend call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The document ingest round trip failed; no handle was obtained.
    #[error("document ingest failed: {0}")]
    Ingest(#[source] BackendError),

    /// The ask round trip failed; any previously obtained handle is kept.
    #[error("answer retrieval failed: {0}")]
    Answer(#[source] BackendError),

    /// The durable trial store could not be read or written.
    #[error("trial store error: {0}")]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// True when the error is the caller's input rather than an
    /// infrastructure failure. The CLI maps this to exit code 1.
    pub fn is_user_error(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }
}
