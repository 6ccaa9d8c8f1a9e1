//! Device list model and the list reconciler shared by the daemon and its consumers.

pub mod edit;
pub mod filter;
pub mod protocol;
pub mod reconcile;
pub mod types;
