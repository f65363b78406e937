// Skill reconciliation: the service, its administrative operations, the
// candidate-record rewrite and the HTTP handlers that expose them.

pub mod admin;
pub mod candidate;
pub mod handlers;
pub mod service;

pub use service::{ReconcileError, Reconciliation, ReconciliationService};
