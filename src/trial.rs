//! Trial gating: one free anonymous use per installation.
//!
//! The durable flag lives behind the `TrialStore` trait so the policy can
//! be tested against an in-memory fake while production uses SQLite.

mod gate;
mod store;

pub use gate::{Decision, TrialGate};
pub use store::{MemoryTrialStore, SqliteTrialStore, StoreError, TrialStore};
