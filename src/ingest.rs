//! Document ingestion: one backend round trip per document selection.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{BackendClient, BackendError};
use crate::error::{SessionError, ValidationError};
use crate::models::{ALLOWED_MIME_TYPES, DocumentHandle, DocumentRef, MAX_DOCUMENT_BYTES};

/// Sends a document to the backend and returns its opaque handle.
///
/// Called once per document selection; the session reuses the handle
/// across question rounds. There are no automatic retries: a failure
/// surfaces immediately, the session stays in its pre-ingest state, and
/// retrying is the caller's decision.
pub struct DocumentIngestor {
    client: Arc<dyn BackendClient>,
}

impl DocumentIngestor {
    /// Creates an ingestor over the given backend client.
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }

    /// Ingests the document and returns the backend-issued handle.
    pub async fn ingest(
        &self,
        document: &DocumentRef,
        credential: Option<&str>,
        trial_flag: Option<&str>,
    ) -> Result<DocumentHandle, SessionError> {
        check_invariants(document)?;

        let response = match document {
            DocumentRef::Upload { name, mime, bytes } => {
                info!(name, size = bytes.len(), "uploading document");
                self.client
                    .ingest_upload(name, mime, bytes.clone(), credential, trial_flag)
                    .await
            }
            DocumentRef::Url(url) => {
                info!(url, "ingesting document by URL");
                self.client.ingest_url(url, credential, trial_flag).await
            }
        }
        .map_err(SessionError::Ingest)?;

        if response.handle.is_empty() {
            return Err(SessionError::Ingest(BackendError::Api {
                message: "backend returned an empty document handle".to_string(),
            }));
        }
        if let Some(version) = &response.version {
            debug!(version, "ingest backend version");
        }

        Ok(DocumentHandle::new(response.handle))
    }
}

/// `DocumentRef` construction already validates; this guards a ref
/// assembled by hand (the enum variants are public) from reaching the
/// wire.
fn check_invariants(document: &DocumentRef) -> Result<(), ValidationError> {
    match document {
        DocumentRef::Upload { mime, bytes, .. } => {
            if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
                return Err(ValidationError::UnsupportedMime { mime: mime.clone() });
            }
            let size = bytes.len() as u64;
            if size > MAX_DOCUMENT_BYTES {
                return Err(ValidationError::OversizedDocument {
                    size,
                    max: MAX_DOCUMENT_BYTES,
                });
            }
        }
        DocumentRef::Url(url) => {
            // Re-running the full constructor keeps the rules in one place.
            DocumentRef::from_url(url.clone())?;
        }
    }
    Ok(())
}
