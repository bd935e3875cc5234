//! Convergence engine: validates desired state and diffs it against the
//! current inventory to produce per-file actions.
//!
//! The `normalize` module turns an inbound declaration into the desired
//! file list for this reconciler's scope. The `planner` module computes the
//! action for every file. Neither touches the filesystem.

pub mod normalize;
pub mod planner;

pub use normalize::normalize;
pub use planner::identify;
