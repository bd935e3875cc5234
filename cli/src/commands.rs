//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context, Result};
use fileagent_core::execution::Dispatch;
use fileagent_core::infrastructure::LocatorFetcher;
use fileagent_core::service::{self, JsonLinesSink};
use fileagent_core::types::config::AgentSettings;
use fileagent_core::types::desired::DesiredState;
use fileagent_core::types::feedback::Status;
use fileagent_core::types::protocol::{CommandKind, PhaseCommand};
use fileagent_core::ReconciliationManager;
use tracing::{info, warn};

/// Phases driven by `run`, with the status each must end in.
const WORKFLOW: [(CommandKind, Status); 3] = [
    (CommandKind::Download, Status::DownloadSuccess),
    (CommandKind::Update, Status::UpdateSuccess),
    (CommandKind::Activate, Status::ActivationSuccess),
];

fn build_manager<W>(settings: AgentSettings, out: W) -> Result<ReconciliationManager>
where
    W: std::io::Write + Send + 'static,
{
    let fetcher = LocatorFetcher::new(&settings.fetch)?;
    let manager =
        ReconciliationManager::new(settings, Box::new(fetcher), Box::new(JsonLinesSink::new(out)))?;
    Ok(manager)
}

pub fn serve(settings: AgentSettings) -> Result<()> {
    let manager = build_manager(settings, std::io::stdout())?;
    manager.publish_inventory()?;

    let stdin = std::io::stdin();
    let summary = service::serve(stdin.lock(), &manager).context("reading control channel")?;
    manager.shutdown();
    info!(handled = summary.handled, skipped = summary.skipped, "control channel closed");
    Ok(())
}

/// Run apply, then every phase while the previous one succeeded, then
/// cleanup. Returns whether the whole workflow succeeded.
pub fn run(settings: AgentSettings, desired_path: &Path, activity: &str) -> Result<bool> {
    run_with_output(settings, desired_path, activity, std::io::stdout())
}

fn run_with_output<W>(settings: AgentSettings, desired_path: &Path, activity: &str, out: W) -> Result<bool>
where
    W: std::io::Write + Send + 'static,
{
    let content = std::fs::read_to_string(desired_path)
        .with_context(|| format!("reading {}", desired_path.display()))?;
    let desired: DesiredState = serde_json::from_str(&content)
        .with_context(|| format!("parsing desired state {}", desired_path.display()))?;

    let baseline = settings.domain.clone();
    let manager = build_manager(settings, out)?;
    match manager.apply(activity, &desired) {
        Status::Identified => {}
        Status::Completed => return Ok(true),
        _ => return Ok(false),
    }

    let mut succeeded = true;
    for (kind, expected) in WORKFLOW {
        let outcome = manager.command(activity, &PhaseCommand::new(kind, &baseline));
        if outcome != Dispatch::Executed(expected) {
            warn!(command = %kind, ?outcome, "phase did not succeed, stopping");
            succeeded = false;
            break;
        }
    }

    let cleanup = manager.command(activity, &PhaseCommand::new(CommandKind::Cleanup, &baseline));
    if cleanup != Dispatch::Executed(Status::CleanupSuccess) {
        warn!(?cleanup, "cleanup did not succeed");
        succeeded = false;
    }
    Ok(succeeded)
}

pub fn inventory(settings: AgentSettings) -> Result<()> {
    let manager = build_manager(settings, std::io::sink())?;
    let graph = manager.query_inventory()?;
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn desired_file(dir: &Path, locator: &str) -> std::path::PathBuf {
        let doc = serde_json::json!({
            "domains": [{
                "id": "files",
                "components": [{
                    "id": "f1",
                    "version": "1.0",
                    "config": [
                        {"key": "file_name", "value": "f1"},
                        {"key": "download_url", "value": locator}
                    ]
                }]
            }]
        });
        let path = dir.join("desired.json");
        std::fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn run_reconciles_from_file_locator() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        std::fs::write(&source, "content").unwrap();
        let managed = dir.path().join("managed");
        let desired = desired_file(dir.path(), &format!("file://{}", source.display()));

        let settings = AgentSettings::new("files", &managed);
        let ok = run_with_output(settings, &desired, "a1", std::io::sink()).unwrap();
        assert!(ok);
        assert_eq!(std::fs::read_to_string(managed.join("f1")).unwrap(), "content");
    }

    #[test]
    fn run_reports_failed_download() {
        let dir = TempDir::new().unwrap();
        let managed = dir.path().join("managed");
        let desired = desired_file(dir.path(), &format!("file://{}", dir.path().join("absent").display()));

        let settings = AgentSettings::new("files", &managed);
        let ok = run_with_output(settings, &desired, "a1", std::io::sink()).unwrap();
        assert!(!ok);
        assert!(!managed.join("f1").exists());
    }

    #[test]
    fn run_rejects_unreadable_desired_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let settings = AgentSettings::new("files", dir.path().join("managed"));
        let err = run_with_output(settings, &path, "a1", std::io::sink()).unwrap_err();
        assert!(err.to_string().contains("parsing desired state"));
    }
}
