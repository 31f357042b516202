use std::sync::Arc;

use tracing::debug;

use super::store::{StoreError, TRIAL_CONSUMED_KEY, TrialStore};

/// Outcome of a gate check.
///
/// `Denied` is a policy decision, not a failure: the caller is expected
/// to redirect the user to an authentication flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

/// One-free-trial policy for anonymous callers.
///
/// The flag is global to the installation, not scoped to a document: once
/// any ask completes a full cycle the flag is recorded, and anonymous
/// callers are denied until they authenticate. Authenticated callers are
/// never gated; the flag stays recorded for them but no longer matters.
pub struct TrialGate {
    store: Arc<dyn TrialStore>,
}

impl TrialGate {
    /// Creates a gate over the given durable store.
    pub fn new(store: Arc<dyn TrialStore>) -> Self {
        Self { store }
    }

    /// Decides whether the current caller may proceed.
    pub fn authorize(&self, is_authenticated: bool) -> Result<Decision, StoreError> {
        if is_authenticated {
            return Ok(Decision::Allowed);
        }
        let decision = if self.consumed()? {
            Decision::Denied
        } else {
            Decision::Allowed
        };
        debug!(?decision, "anonymous caller gate check");
        Ok(decision)
    }

    /// True when the free trial has been used on this installation.
    pub fn consumed(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(TRIAL_CONSUMED_KEY)?.as_deref() == Some("true"))
    }

    /// Records the trial as used. Idempotent: setting an already-set flag
    /// changes nothing. The flag is never cleared by this crate.
    pub fn mark_consumed(&self) -> Result<(), StoreError> {
        self.store.set(TRIAL_CONSUMED_KEY, "true")
    }
}
