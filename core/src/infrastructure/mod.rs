//! Infrastructure seams toward the reconciler's external collaborators.
//!
//! Provides the `Fetcher` trait (content transport) with the production
//! `LocatorFetcher`, and the `FeedbackSink` trait (the upstream control
//! channel). `mock` holds test doubles for both.

pub mod http;
pub mod mock;

use std::path::Path;

use crate::error::ReconcileError;
use crate::types::feedback::FeedbackEvent;
use crate::types::inventory::InventoryGraph;

pub use http::LocatorFetcher;

/// Retrieves the content behind a source locator.
pub trait Fetcher {
    /// Write the content behind `locator` to the file at `dest`, returning
    /// the number of bytes written. Blocks until the transfer completes or
    /// fails.
    fn fetch(&self, locator: &str, dest: &Path) -> Result<u64, ReconcileError>;
}

/// Receives everything the reconciler reports upstream. Implementations
/// deal with their own delivery failures.
pub trait FeedbackSink {
    fn publish_feedback(&mut self, event: &FeedbackEvent);

    fn publish_inventory(&mut self, graph: &InventoryGraph);
}
