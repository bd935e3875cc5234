//! Test doubles for the infrastructure seams.
//!
//! `MockFetcher` serves canned bodies or failures per locator and records
//! every request. `RecordingSink` keeps every published event behind a
//! shared handle, so a clone kept by the test sees what the reconciler
//! published.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{FeedbackSink, Fetcher};
use crate::error::ReconcileError;
use crate::types::feedback::{FeedbackEvent, Status};
use crate::types::inventory::InventoryGraph;

/// A fetcher that serves pre-configured responses.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: HashMap<String, Result<Vec<u8>, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        MockFetcher::default()
    }

    /// Serve `body` for `locator`.
    pub fn with(mut self, locator: &str, body: &[u8]) -> Self {
        self.responses.insert(locator.to_string(), Ok(body.to_vec()));
        self
    }

    /// Fail every fetch of `locator` with `reason`.
    pub fn failing(mut self, locator: &str, reason: &str) -> Self {
        self.responses.insert(locator.to_string(), Err(reason.to_string()));
        self
    }

    /// Locators requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, locator: &str, dest: &Path) -> Result<u64, ReconcileError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(locator.to_string());
        match self.responses.get(locator) {
            Some(Ok(body)) => {
                std::fs::write(dest, body).map_err(|e| ReconcileError::filesystem("create", dest, e))?;
                Ok(body.len() as u64)
            }
            Some(Err(reason)) => Err(ReconcileError::Transport {
                locator: locator.to_string(),
                reason: reason.clone(),
            }),
            None => Err(ReconcileError::Transport {
                locator: locator.to_string(),
                reason: "404 Not Found".to_string(),
            }),
        }
    }
}

/// A sink that records everything it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<FeedbackEvent>>>,
    inventories: Arc<Mutex<Vec<InventoryGraph>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Aggregate statuses of all recorded events, in order.
    pub fn statuses(&self) -> Vec<Status> {
        self.events().iter().map(|e| e.status).collect()
    }

    pub fn last(&self) -> Option<FeedbackEvent> {
        self.events().last().cloned()
    }

    pub fn inventories(&self) -> Vec<InventoryGraph> {
        self.inventories.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.inventories.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl FeedbackSink for RecordingSink {
    fn publish_feedback(&mut self, event: &FeedbackEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }

    fn publish_inventory(&mut self, graph: &InventoryGraph) {
        self.inventories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(graph.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mock_fetcher_serves_and_records() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with("http://x/f1", b"one");
        let dest = dir.path().join("f1");
        assert_eq!(fetcher.fetch("http://x/f1", &dest).unwrap(), 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"one");
        assert_eq!(fetcher.calls(), vec!["http://x/f1".to_string()]);
    }

    #[test]
    fn mock_fetcher_failures() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().failing("http://x/bad", "connection reset");
        let err = fetcher.fetch("http://x/bad", &dir.path().join("bad")).unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        let err = fetcher.fetch("http://x/other", &dir.path().join("other")).unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn recording_sink_shares_state_across_clones() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.publish_feedback(&FeedbackEvent {
            scope: "files".into(),
            activity_id: "a1".into(),
            baseline: String::new(),
            status: Status::Identifying,
            message: String::new(),
            actions: vec![],
        });
        assert_eq!(sink.statuses(), vec![Status::Identifying]);
        sink.clear();
        assert!(sink.events().is_empty());
    }
}
