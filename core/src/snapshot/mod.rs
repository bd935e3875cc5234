//! Backups of the managed directory and their restoration.
//!
//! `Workspace` owns an operation's temporary tree (download staging and
//! backup), `Manifest` fingerprints directory contents, and `recovery`
//! restores the managed directory from the backup.

pub mod manifest;
pub mod recovery;
pub mod workspace;

pub use manifest::Manifest;
pub use recovery::{restore, RestoreOutcome};
pub use workspace::Workspace;
