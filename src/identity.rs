//! Read-only view of the caller's authentication state.
//!
//! The engine only reads credentials; issuance, refresh, and sign-out
//! belong to the external identity provider. Suppliers with changing
//! state notify listeners, but the session re-evaluates the trial gate
//! lazily on the next `ask()` rather than reacting eagerly.

use std::fmt;
use std::sync::Mutex;

/// A bearer credential for the current caller.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a token issued by the identity provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for the Authorization header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of debug output.
impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Callback invoked when the authentication state changes.
pub type IdentityListener = Box<dyn Fn(Option<BearerToken>) + Send + Sync>;

/// Supplies the caller's optional credential.
pub trait IdentitySupplier: Send + Sync {
    /// Returns the current credential, if any.
    fn credential(&self) -> Option<BearerToken>;

    /// Registers a callback fired when the credential changes. Suppliers
    /// with a fixed credential may ignore the registration.
    fn on_change(&self, listener: IdentityListener) {
        let _ = listener;
    }
}

/// Supplier with a fixed, never-changing credential.
pub struct StaticIdentity {
    token: Option<BearerToken>,
}

impl StaticIdentity {
    /// A caller with no credential.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// A caller with the given credential.
    pub fn with_token(token: BearerToken) -> Self {
        Self { token: Some(token) }
    }
}

impl IdentitySupplier for StaticIdentity {
    fn credential(&self) -> Option<BearerToken> {
        self.token.clone()
    }
}

/// Supplier whose credential can be swapped at runtime.
///
/// `set_credential` notifies every registered listener with the new
/// value, so a UI layer can subscribe to sign-in and sign-out events.
#[derive(Default)]
pub struct SharedIdentity {
    token: Mutex<Option<BearerToken>>,
    listeners: Mutex<Vec<IdentityListener>>,
}

impl SharedIdentity {
    /// Creates a supplier with no credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the credential and notifies listeners.
    ///
    /// The token lock is released before callbacks run, so a listener may
    /// call `credential()` without deadlocking.
    pub fn set_credential(&self, token: Option<BearerToken>) {
        {
            let mut current = self.token.lock().expect("identity lock poisoned");
            *current = token.clone();
        }
        let listeners = self.listeners.lock().expect("identity lock poisoned");
        for listener in listeners.iter() {
            listener(token.clone());
        }
    }
}

impl IdentitySupplier for SharedIdentity {
    fn credential(&self) -> Option<BearerToken> {
        self.token.lock().expect("identity lock poisoned").clone()
    }

    fn on_change(&self, listener: IdentityListener) {
        self.listeners
            .lock()
            .expect("identity lock poisoned")
            .push(listener);
    }
}
