//! File update agent core.
//!
//! Reconciles the files of one managed directory against a desired state
//! received from a controller. A reconciliation is an operation that is
//! identified (desired state diffed against the persisted inventory) and
//! then driven phase by phase (download, update, activate, cleanup) by
//! commands from the controller, with the directory rolled back from a
//! backup whenever a phase fails.
//!
//! Entry point is [`manager::ReconciliationManager`]; [`service::serve`]
//! speaks the JSON-lines control protocol on top of it.

pub mod convergence;
pub mod data;
pub mod error;
pub mod execution;
pub mod infrastructure;
pub mod manager;
pub mod service;
pub mod snapshot;
pub mod types;

pub use error::ReconcileError;
pub use manager::ReconciliationManager;
