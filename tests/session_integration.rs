//! Integration tests driving the full session against a mock backend.
//!
//! Covers the end-to-end flows: the anonymous free trial, handle reuse
//! across question edits, re-ingestion after a new document, failure
//! rollback, and the overlap/cancellation behavior.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use glance::{
    AnswerPayload, AskOutcome, AskResponse, BackendClient, BackendError, BearerToken, DocumentRef,
    IngestResponse, MemoryTrialStore, QuerySession, SessionError, SessionState, StaticIdentity,
    TrialGate,
};

/// Scriptable backend double with call counters and failure switches.
struct MockBackend {
    ingest_calls: AtomicUsize,
    ask_calls: AtomicUsize,
    fail_ingest: AtomicBool,
    fail_ask: AtomicBool,
    payload: AnswerPayload,
}

impl MockBackend {
    fn new(payload: AnswerPayload) -> Self {
        Self {
            ingest_calls: AtomicUsize::new(0),
            ask_calls: AtomicUsize::new(0),
            fail_ingest: AtomicBool::new(false),
            fail_ask: AtomicBool::new(false),
            payload,
        }
    }

    fn composite(raw: &str) -> Self {
        Self::new(AnswerPayload::Composite(raw.to_string()))
    }

    fn ingest_calls(&self) -> usize {
        self.ingest_calls.load(Ordering::SeqCst)
    }

    fn ask_calls(&self) -> usize {
        self.ask_calls.load(Ordering::SeqCst)
    }

    fn ingest_response(&self) -> Result<IngestResponse, BackendError> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ingest.load(Ordering::SeqCst) {
            return Err(BackendError::Http { status: 502 });
        }
        Ok(IngestResponse {
            handle: format!("doc-{}", self.ingest_calls()),
            message: Some("ok".to_string()),
            version: Some("1".to_string()),
        })
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn ingest_upload(
        &self,
        _name: &str,
        _mime: &str,
        _bytes: Vec<u8>,
        _credential: Option<&str>,
        _trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError> {
        self.ingest_response()
    }

    async fn ingest_url(
        &self,
        _url: &str,
        _credential: Option<&str>,
        _trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError> {
        self.ingest_response()
    }

    async fn ask(
        &self,
        _handle: &str,
        questions: &[String],
        _credential: Option<&str>,
        _trial_flag: Option<&str>,
    ) -> Result<AskResponse, BackendError> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ask.load(Ordering::SeqCst) {
            return Err(BackendError::Http { status: 500 });
        }
        Ok(AskResponse {
            answer: self.payload.clone(),
            questions: questions.to_vec(),
            version: Some("2".to_string()),
        })
    }
}

fn pdf_upload(size: usize) -> DocumentRef {
    DocumentRef::upload("policy.pdf", "application/pdf", vec![0u8; size]).unwrap()
}

fn anonymous_session(backend: Arc<MockBackend>, store: Arc<MemoryTrialStore>) -> QuerySession {
    QuerySession::builder()
        .client(backend)
        .trial_store(store)
        .build()
}

fn authenticated_session(backend: Arc<MockBackend>, store: Arc<MemoryTrialStore>) -> QuerySession {
    QuerySession::builder()
        .client(backend)
        .trial_store(store)
        .identity(Arc::new(StaticIdentity::with_token(BearerToken::new(
            "tok-1",
        ))))
        .build()
}

#[tokio::test]
async fn anonymous_trial_end_to_end() {
    let backend = Arc::new(MockBackend::composite("1. Yes, flood damage is covered."));
    let store = Arc::new(MemoryTrialStore::new());
    let session = anonymous_session(Arc::clone(&backend), Arc::clone(&store));

    // Fresh install: the flag is unset and the first ask goes through.
    session.select_document(pdf_upload(2 * 1024 * 1024));
    session
        .update_question(0, "Is flood damage covered?")
        .unwrap();

    let outcome = session.ask().await.unwrap();
    let AskOutcome::Answered(answers) = outcome else {
        panic!("expected answers, got {outcome:?}");
    };
    assert_eq!(
        answers.get("Is flood damage covered?"),
        Some("Yes, flood damage is covered.")
    );
    assert_eq!(backend.ingest_calls(), 1);
    assert!(TrialGate::new(store).consumed().unwrap());

    // Second anonymous ask with a new document: denied, no ingest call.
    session.select_document(pdf_upload(1024));
    let outcome = session.ask().await.unwrap();
    assert_eq!(outcome, AskOutcome::Denied);
    assert_eq!(backend.ingest_calls(), 1);
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn edited_questions_reuse_the_handle() {
    let backend = Arc::new(MockBackend::composite("1. First.\n2. Second."));
    let store = Arc::new(MemoryTrialStore::new());
    let session = authenticated_session(Arc::clone(&backend), store);

    session.select_document(pdf_upload(64));
    session.update_question(0, "first question?").unwrap();
    session.ask().await.unwrap();
    assert_eq!(backend.ingest_calls(), 1);
    assert_eq!(backend.ask_calls(), 1);

    // Editing the set and re-asking must skip ingestion entirely.
    session.add_question();
    session.update_question(1, "second question?").unwrap();
    let outcome = session.ask().await.unwrap();

    assert!(matches!(outcome, AskOutcome::Answered(_)));
    assert_eq!(backend.ingest_calls(), 1);
    assert_eq!(backend.ask_calls(), 2);
    assert_eq!(session.state(), SessionState::Answered);
}

#[tokio::test]
async fn selecting_a_new_document_forces_reingestion() {
    let backend = Arc::new(MockBackend::composite("1. Answer."));
    let store = Arc::new(MemoryTrialStore::new());
    let session = authenticated_session(Arc::clone(&backend), store);

    session.select_document(pdf_upload(64));
    session.update_question(0, "anything?").unwrap();
    session.ask().await.unwrap();
    assert!(session.handle().is_some());
    assert!(session.answers().is_some());

    // A new document invalidates both the handle and the answers.
    session.select_document(
        DocumentRef::from_url("https://example.com/other.pdf").unwrap(),
    );
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.handle().is_none());
    assert!(session.answers().is_none());

    session.ask().await.unwrap();
    assert_eq!(backend.ingest_calls(), 2);
}

#[tokio::test]
async fn authenticated_caller_is_not_gated_by_a_consumed_trial() {
    let backend = Arc::new(MockBackend::composite("1. Fine."));
    let store = Arc::new(MemoryTrialStore::new());
    let gate = TrialGate::new(Arc::clone(&store) as Arc<dyn glance::TrialStore>);
    gate.mark_consumed().unwrap();

    let session = authenticated_session(backend, store);
    session.select_document(pdf_upload(64));
    session.update_question(0, "still allowed?").unwrap();

    let outcome = session.ask().await.unwrap();
    assert!(matches!(outcome, AskOutcome::Answered(_)));
}

#[tokio::test]
async fn ingest_failure_reverts_to_ready_without_a_handle() {
    let backend = Arc::new(MockBackend::composite("1. Answer."));
    backend.fail_ingest.store(true, Ordering::SeqCst);
    let store = Arc::new(MemoryTrialStore::new());
    let session = anonymous_session(Arc::clone(&backend), Arc::clone(&store));

    session.select_document(pdf_upload(64));
    session.update_question(0, "anything?").unwrap();

    let err = session.ask().await.unwrap_err();
    assert!(matches!(err, SessionError::Ingest(_)));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.handle().is_none());
    // A failed cycle must not consume the trial.
    assert!(!TrialGate::new(store).consumed().unwrap());

    // Manual retry succeeds once the backend recovers.
    backend.fail_ingest.store(false, Ordering::SeqCst);
    let outcome = session.ask().await.unwrap();
    assert!(matches!(outcome, AskOutcome::Answered(_)));
}

#[tokio::test]
async fn answer_failure_keeps_the_handle_for_retry() {
    let backend = Arc::new(MockBackend::composite("1. Answer."));
    backend.fail_ask.store(true, Ordering::SeqCst);
    let store = Arc::new(MemoryTrialStore::new());
    let session = anonymous_session(Arc::clone(&backend), Arc::clone(&store));

    session.select_document(pdf_upload(64));
    session.update_question(0, "anything?").unwrap();

    let err = session.ask().await.unwrap_err();
    assert!(matches!(err, SessionError::Answer(_)));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.handle().is_some());
    assert!(!TrialGate::new(Arc::clone(&store) as Arc<dyn glance::TrialStore>)
        .consumed()
        .unwrap());

    // The retry is still within the unconsumed trial and skips ingestion.
    backend.fail_ask.store(false, Ordering::SeqCst);
    let outcome = session.ask().await.unwrap();
    assert!(matches!(outcome, AskOutcome::Answered(_)));
    assert_eq!(backend.ingest_calls(), 1);
    assert_eq!(backend.ask_calls(), 2);
    assert!(TrialGate::new(store).consumed().unwrap());
}

#[tokio::test]
async fn structured_payload_round_trips_through_the_session() {
    let mut map = HashMap::new();
    map.insert("covered?".to_string(), "Yes.".to_string());
    let backend = Arc::new(MockBackend::new(AnswerPayload::Structured(map)));
    let session = authenticated_session(backend, Arc::new(MemoryTrialStore::new()));

    session.select_document(pdf_upload(64));
    session.update_question(0, "covered?").unwrap();

    let AskOutcome::Answered(answers) = session.ask().await.unwrap() else {
        panic!("expected answers");
    };
    assert_eq!(answers.get("covered?"), Some("Yes."));
}

/// Backend that parks inside ingest until the test releases it, so tests
/// can observe the session mid-flight.
struct GatedBackend {
    entered: Semaphore,
    release: Semaphore,
}

impl GatedBackend {
    fn new() -> Self {
        Self {
            entered: Semaphore::new(0),
            release: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl BackendClient for GatedBackend {
    async fn ingest_upload(
        &self,
        _name: &str,
        _mime: &str,
        _bytes: Vec<u8>,
        _credential: Option<&str>,
        _trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError> {
        self.entered.add_permits(1);
        self.release
            .acquire()
            .await
            .expect("release semaphore closed")
            .forget();
        Ok(IngestResponse {
            handle: "doc-slow".to_string(),
            message: None,
            version: None,
        })
    }

    async fn ingest_url(
        &self,
        _url: &str,
        _credential: Option<&str>,
        _trial_flag: Option<&str>,
    ) -> Result<IngestResponse, BackendError> {
        unimplemented!("tests only upload")
    }

    async fn ask(
        &self,
        _handle: &str,
        questions: &[String],
        _credential: Option<&str>,
        _trial_flag: Option<&str>,
    ) -> Result<AskResponse, BackendError> {
        Ok(AskResponse {
            answer: AnswerPayload::Composite("1. done".to_string()),
            questions: questions.to_vec(),
            version: None,
        })
    }
}

#[tokio::test]
async fn overlapping_ask_is_ignored_while_one_is_in_flight() {
    let backend = Arc::new(GatedBackend::new());
    let session = Arc::new(
        QuerySession::builder()
            .client(Arc::clone(&backend) as Arc<dyn BackendClient>)
            .trial_store(Arc::new(MemoryTrialStore::new()))
            .build(),
    );

    session.select_document(pdf_upload(64));
    session.update_question(0, "anything?").unwrap();

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.ask().await }
    });
    // Wait until the first ask is parked inside the ingest call.
    backend.entered.acquire().await.unwrap().forget();
    assert_eq!(session.state(), SessionState::Ingesting);

    let second = session.ask().await.unwrap();
    assert_eq!(second, AskOutcome::Busy);

    backend.release.add_permits(1);
    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, AskOutcome::Answered(_)));
    assert_eq!(session.state(), SessionState::Answered);
}

#[tokio::test]
async fn selecting_a_document_mid_flight_discards_the_stale_result() {
    let backend = Arc::new(GatedBackend::new());
    let session = Arc::new(
        QuerySession::builder()
            .client(Arc::clone(&backend) as Arc<dyn BackendClient>)
            .trial_store(Arc::new(MemoryTrialStore::new()))
            .build(),
    );

    session.select_document(pdf_upload(64));
    session.update_question(0, "anything?").unwrap();

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.ask().await }
    });
    backend.entered.acquire().await.unwrap().forget();

    // The user picks a different document while the old ingest is parked.
    session.select_document(
        DocumentRef::from_url("https://example.com/newer.pdf").unwrap(),
    );

    backend.release.add_permits(1);
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, AskOutcome::Superseded);

    // The stale handle was never applied to the new document's session.
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.handle().is_none());
    assert!(session.answers().is_none());
}
