//! Execution: drives an operation through its phases.
//!
//! `phases` holds the per-phase filesystem work, `dispatch` the table that
//! decides which command may run when, and `operation` the state machine
//! tying them together and turning phase outcomes into feedback.

pub mod dispatch;
pub mod operation;
pub mod phases;

pub use operation::{Dispatch, Operation, Resources};
