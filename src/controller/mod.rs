//! # Controller
//!
//! Reconciliation engine and its collaborators: the cluster store, the event
//! sink, error backoff and the probe/metrics server.

pub mod backoff;
pub mod events;
pub mod reconciler;
pub mod server;
pub mod store;
