//! Bidirectional reconciliation between the local mirror and the device
//!
//! The decision core lives in [`candidate`]; [`engine`] executes decisions
//! over a transport, with backups and confirmation gating.

pub mod candidate;
pub mod engine;

pub use candidate::{Decision, SyncCandidate, decide};
pub use engine::{Confirmer, ReconciliationEngine, SyncReport};
