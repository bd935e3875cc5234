//! Production fetcher: `http(s)://` locators through a blocking reqwest
//! client, `file://` locators through a local copy.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::Fetcher;
use crate::error::ReconcileError;
use crate::types::config::FetchSettings;

pub struct LocatorFetcher {
    client: reqwest::blocking::Client,
}

impl LocatorFetcher {
    pub fn new(settings: &FetchSettings) -> Result<LocatorFetcher, ReconcileError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(settings.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| ReconcileError::Settings(format!("cannot build http client: {}", e)))?;
        Ok(LocatorFetcher { client })
    }

    fn fetch_http(&self, locator: &str, dest: &Path) -> Result<u64, ReconcileError> {
        let mut response = self
            .client
            .get(locator)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| transport(locator, e.to_string()))?;
        let mut out = File::create(dest).map_err(|e| ReconcileError::filesystem("create", dest, e))?;
        response
            .copy_to(&mut out)
            .map_err(|e| transport(locator, e.to_string()))
    }

    fn fetch_file(&self, locator: &str, path: &str, dest: &Path) -> Result<u64, ReconcileError> {
        std::fs::copy(path, dest).map_err(|e| transport(locator, e.to_string()))
    }
}

impl Fetcher for LocatorFetcher {
    fn fetch(&self, locator: &str, dest: &Path) -> Result<u64, ReconcileError> {
        let result = if let Some(path) = locator.strip_prefix("file://") {
            self.fetch_file(locator, path, dest)
        } else if locator.starts_with("http://") || locator.starts_with("https://") {
            self.fetch_http(locator, dest)
        } else {
            Err(transport(locator, "unsupported locator scheme".to_string()))
        };

        match &result {
            Ok(bytes) => debug!(locator, bytes, "fetched"),
            Err(_) => {
                // Never leave a partial download staged.
                let _ = std::fs::remove_file(dest);
            }
        }
        result
    }
}

fn transport(locator: &str, reason: String) -> ReconcileError {
    ReconcileError::Transport {
        locator: locator.to_string(),
        reason,
    }
}
