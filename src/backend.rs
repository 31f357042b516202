/// Backend HTTP client module.
///
/// This module provides the async client for the document ingest and ask
/// endpoints, the wire types they exchange, and the `BackendClient` trait
/// the engine is mocked through in tests.
mod client;
mod types;

pub use client::{BackendClient, BackendError, HttpBackendClient, HttpBackendClientBuilder};
pub use types::{AnswerPayload, AskResponse, IngestResponse};
