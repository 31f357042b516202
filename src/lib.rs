//! Document query session engine.
//!
//! `glance` lets a caller submit a document (upload or URL) together with
//! up to five questions and re-ask without re-submitting the document.
//! The crate owns orchestration only: trial gating for anonymous callers,
//! ingest-once/ask-many handle reuse, question batching, and
//! normalization of the backend's two answer shapes. Rendering, routing,
//! credential issuance, and the answering itself belong to external
//! collaborators.

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod models;
pub mod resolver;
pub mod session;
pub mod trial;

pub use backend::{
    AnswerPayload, AskResponse, BackendClient, BackendError, HttpBackendClient,
    HttpBackendClientBuilder, IngestResponse,
};
pub use config::Config;
pub use error::{SessionError, ValidationError};
pub use identity::{BearerToken, IdentitySupplier, SharedIdentity, StaticIdentity};
pub use ingest::DocumentIngestor;
pub use models::{AnswerMap, DocumentHandle, DocumentRef, Question, QuestionSet};
pub use resolver::AnswerResolver;
pub use session::{AskOutcome, QuerySession, QuerySessionBuilder, SessionState};
pub use trial::{Decision, MemoryTrialStore, SqliteTrialStore, TrialGate, TrialStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_store_accessible_from_crate_root() {
        let store = SqliteTrialStore::in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let set = QuestionSet::new();
        assert_eq!(set.len(), 1);

        let handle = DocumentHandle::new("doc-1");
        assert_eq!(handle.as_str(), "doc-1");

        let map = AnswerMap::new();
        assert!(map.is_empty());

        let doc = DocumentRef::from_url("https://example.com/terms.txt");
        assert!(doc.is_ok());
    }
}
