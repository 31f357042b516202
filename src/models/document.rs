use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum accepted document payload: 10 MiB, checked client-side so an
/// oversized file never costs a round trip.
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types the backend accepts for uploads.
pub const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
];

/// File extensions accepted for ingest-by-URL.
pub const ALLOWED_URL_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".doc", ".docx"];

/// A document the caller wants answers about.
///
/// Exactly one variant is active per session: either an owned binary
/// upload or a validated remote URL. Use [`DocumentRef::upload`] and
/// [`DocumentRef::from_url`] so the type, size, and URL rules are checked
/// at construction.
///
/// # Examples
///
/// ```
/// use glance::DocumentRef;
///
/// let doc = DocumentRef::from_url("https://example.com/policy.pdf").unwrap();
/// assert!(matches!(doc, DocumentRef::Url(_)));
///
/// assert!(DocumentRef::from_url("https://example.com/policy.exe").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRef {
    /// An owned binary payload selected by the caller.
    Upload {
        name: String,
        mime: String,
        bytes: Vec<u8>,
    },
    /// An absolute http(s) URL pointing at a supported document type.
    Url(String),
}

impl DocumentRef {
    /// Creates an upload ref, validating MIME type and size.
    pub fn upload(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        let mime = mime.into();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(ValidationError::UnsupportedMime { mime });
        }
        let size = bytes.len() as u64;
        if size > MAX_DOCUMENT_BYTES {
            return Err(ValidationError::OversizedDocument {
                size,
                max: MAX_DOCUMENT_BYTES,
            });
        }
        Ok(Self::Upload {
            name: name.into(),
            mime,
            bytes,
        })
    }

    /// Creates a URL ref, validating extension and URL syntax.
    pub fn from_url(url: impl Into<String>) -> Result<Self, ValidationError> {
        let url = url.into().trim().to_string();
        let lower = url.to_lowercase();
        if !ALLOWED_URL_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Err(ValidationError::UnsupportedExtension { url });
        }
        let parsed = reqwest::Url::parse(&url)
            .map_err(|_| ValidationError::MalformedUrl { url: url.clone() })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::MalformedUrl { url });
        }
        Ok(Self::Url(url))
    }

    /// A short human-readable label: the file name or the URL.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Upload { name, .. } => name,
            Self::Url(url) => url,
        }
    }

    /// Payload size in bytes; zero for URL refs, whose size is only known
    /// to the backend.
    pub fn size(&self) -> u64 {
        match self {
            Self::Upload { bytes, .. } => bytes.len() as u64,
            Self::Url(_) => 0,
        }
    }
}

/// Opaque backend-issued identifier for an ingested document.
///
/// Valid for the lifetime of the current document selection and reused
/// across question rounds; cleared whenever the caller picks a new
/// [`DocumentRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    /// Wraps a backend-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
