//! The query session: document lifecycle, trial gating, and ask
//! orchestration in one explicit state machine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::error::{SessionError, ValidationError};
use crate::identity::{IdentitySupplier, StaticIdentity};
use crate::ingest::DocumentIngestor;
use crate::models::{AnswerMap, DocumentHandle, DocumentRef, QuestionSet};
use crate::resolver::AnswerResolver;
use crate::trial::{Decision, TrialGate, TrialStore};

/// Marker sent to the backend when an anonymous caller spends the trial.
const TRIAL_FLAG: &str = "true";

/// Where the session is in the document/answer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document selected.
    Empty,
    /// Document selected; nothing in flight. A failed cycle also lands
    /// here so the caller can retry.
    Ready,
    /// Ingest round trip in flight.
    Ingesting,
    /// Ask round trip in flight.
    Answering,
    /// Handle and answers present; re-asking skips ingestion.
    Answered,
}

/// What an `ask()` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Answers in question order, also cached on the session.
    Answered(AnswerMap),
    /// The trial gate refused an anonymous caller; the caller is expected
    /// to redirect the user to an authentication flow.
    Denied,
    /// A previous `ask()` is still in flight; this call was ignored.
    Busy,
    /// The document changed while this call was in flight; its result was
    /// discarded rather than applied to the newer session state.
    Superseded,
}

struct SessionInner {
    state: SessionState,
    document: Option<DocumentRef>,
    questions: QuestionSet,
    handle: Option<DocumentHandle>,
    answers: Option<AnswerMap>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: SessionState::Empty,
            document: None,
            questions: QuestionSet::new(),
            handle: None,
            answers: None,
        }
    }
}

/// Builder for constructing `QuerySession` instances.
#[derive(Default)]
pub struct QuerySessionBuilder {
    client: Option<Arc<dyn BackendClient>>,
    store: Option<Arc<dyn TrialStore>>,
    identity: Option<Arc<dyn IdentitySupplier>>,
}

impl QuerySessionBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend client to use.
    pub fn client(mut self, client: Arc<dyn BackendClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the durable trial store to use.
    pub fn trial_store(mut self, store: Arc<dyn TrialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the identity supplier. Defaults to an anonymous caller.
    pub fn identity(mut self, identity: Arc<dyn IdentitySupplier>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Builds the `QuerySession`.
    ///
    /// # Panics
    ///
    /// Panics if `client()` or `trial_store()` was not called.
    #[must_use]
    pub fn build(self) -> QuerySession {
        let client = self.client.expect("client must be set via client() method");
        let store = self
            .store
            .expect("trial store must be set via trial_store() method");
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(StaticIdentity::anonymous()));

        QuerySession {
            inner: Mutex::new(SessionInner::new()),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            gate: TrialGate::new(store),
            ingestor: DocumentIngestor::new(Arc::clone(&client)),
            resolver: AnswerResolver::new(client),
            identity,
        }
    }
}

/// Orchestrates one user's document/question interaction.
///
/// The session owns the document handle, the question set, and the
/// trial/auth decision. Callers invoke [`QuerySession::ask`] on file
/// selection, question edits, and re-submission; the session decides
/// whether the document must be (re)ingested or an existing handle can be
/// reused.
///
/// State machine: `Empty → Ready → Ingesting → Answering → Answered`,
/// with `Answered → Answering` on re-ask and any state → `Empty` on
/// [`QuerySession::reset`]. There are no terminal states; the session is
/// reusable indefinitely.
///
/// Overlap policy: a second `ask()` while one is outstanding is ignored
/// and returns [`AskOutcome::Busy`]. Selecting a new document or
/// resetting while a call is in flight discards that call's eventual
/// result instead of applying it to the now-stale session.
pub struct QuerySession {
    inner: Mutex<SessionInner>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    gate: TrialGate,
    ingestor: DocumentIngestor,
    resolver: AnswerResolver,
    identity: Arc<dyn IdentitySupplier>,
}

/// Releases the in-flight flag on every exit path, including errors.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl QuerySession {
    /// Returns a builder for the session.
    pub fn builder() -> QuerySessionBuilder {
        QuerySessionBuilder::new()
    }

    /// Current state of the session lifecycle.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// The cached answers from the last successful ask, if any.
    pub fn answers(&self) -> Option<AnswerMap> {
        self.lock().answers.clone()
    }

    /// The backend handle for the current document, if ingested.
    pub fn handle(&self) -> Option<DocumentHandle> {
        self.lock().handle.clone()
    }

    /// Snapshot of the current question set.
    pub fn questions(&self) -> QuestionSet {
        self.lock().questions.clone()
    }

    /// Selects a new document and moves the session to `Ready`.
    ///
    /// Any prior handle and answers are cleared unconditionally, since a
    /// new document invalidates previous answers. A result still in
    /// flight for the old document will be discarded when it lands.
    pub fn select_document(&self, document: DocumentRef) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        info!(name = document.display_name(), "document selected");
        inner.document = Some(document);
        inner.handle = None;
        inner.answers = None;
        inner.state = SessionState::Ready;
    }

    /// Returns the session to `Empty`, dropping all accumulated state.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        *inner = SessionInner::new();
        debug!("session reset");
    }

    /// Appends a blank question slot (no-op at the five-slot cap).
    pub fn add_question(&self) {
        self.lock().questions.add();
    }

    /// Removes a question slot (no-op when it would empty the set).
    pub fn remove_question(&self, index: usize) {
        self.lock().questions.remove(index);
    }

    /// Replaces the text of a question slot.
    pub fn update_question(&self, index: usize, text: &str) -> Result<(), ValidationError> {
        self.lock().questions.update(index, text)
    }

    /// Runs one ask cycle: authorize, ingest if needed, resolve answers.
    ///
    /// On success the answers are cached and the trial spend is recorded.
    /// An ingest failure reverts to `Ready` with no handle; an answer
    /// failure reverts to `Ready` but keeps the handle so a retry skips
    /// re-ingestion. Denial leaves the state untouched.
    pub async fn ask(&self) -> Result<AskOutcome, SessionError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("ask ignored, another ask is in flight");
            return Ok(AskOutcome::Busy);
        }
        let _guard = InFlightGuard {
            flag: &self.in_flight,
        };
        let generation = self.generation.load(Ordering::SeqCst);

        // Snapshot the inputs; the lock is never held across an await.
        let (document, existing_handle, submitted) = {
            let inner = self.lock();
            let document = inner
                .document
                .clone()
                .ok_or(ValidationError::NoDocument)?;
            let submitted = inner.questions.non_empty();
            if submitted.is_empty() {
                return Err(ValidationError::NoQuestions.into());
            }
            (document, inner.handle.clone(), submitted)
        };

        let token = self.identity.credential();
        let is_authenticated = token.is_some();
        if self.gate.authorize(is_authenticated)? == Decision::Denied {
            info!("anonymous trial already consumed, ask denied");
            return Ok(AskOutcome::Denied);
        }
        let credential = token.as_ref().map(|t| t.as_str());
        let trial_flag = (!is_authenticated).then_some(TRIAL_FLAG);

        // Ingest once per document; reuse the handle afterwards.
        let handle = match existing_handle {
            Some(handle) => {
                debug!(%handle, "reusing existing document handle");
                handle
            }
            None => {
                if !self.apply_if_current(generation, |inner| {
                    inner.state = SessionState::Ingesting;
                }) {
                    return Ok(AskOutcome::Superseded);
                }
                match self.ingestor.ingest(&document, credential, trial_flag).await {
                    Ok(handle) => {
                        let applied = self.apply_if_current(generation, |inner| {
                            inner.handle = Some(handle.clone());
                        });
                        if !applied {
                            debug!("discarding ingest result for a superseded document");
                            return Ok(AskOutcome::Superseded);
                        }
                        handle
                    }
                    Err(err) => {
                        // No partial handle is kept; retry starts from Ready.
                        self.apply_if_current(generation, |inner| {
                            inner.state = SessionState::Ready;
                        });
                        return Err(err);
                    }
                }
            }
        };

        if !self.apply_if_current(generation, |inner| {
            inner.state = SessionState::Answering;
        }) {
            return Ok(AskOutcome::Superseded);
        }
        match self
            .resolver
            .resolve(&handle, &submitted, credential, trial_flag)
            .await
        {
            Ok(answers) => {
                let applied = self.apply_if_current(generation, |inner| {
                    inner.answers = Some(answers.clone());
                    inner.state = SessionState::Answered;
                });
                if !applied {
                    debug!("discarding answers for a superseded document");
                    return Ok(AskOutcome::Superseded);
                }
                // The cycle completed; record the trial spend regardless
                // of authentication state. Answers are already in hand, so
                // a bookkeeping failure is not surfaced as an ask failure.
                if let Err(err) = self.gate.mark_consumed() {
                    warn!(error = %err, "failed to record trial consumption");
                }
                info!(count = answers.len(), "ask cycle complete");
                Ok(AskOutcome::Answered(answers))
            }
            Err(err) => {
                // The handle stays so a retry skips re-ingestion.
                self.apply_if_current(generation, |inner| {
                    inner.state = SessionState::Ready;
                });
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session lock poisoned")
    }

    /// Applies a state mutation only when the work that produced it has
    /// not been superseded by `select_document()`/`reset()`. Returns
    /// whether the mutation was applied.
    fn apply_if_current<F: FnOnce(&mut SessionInner)>(&self, generation: u64, f: F) -> bool {
        let mut inner = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        f(&mut inner);
        true
    }
}
