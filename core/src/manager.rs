//! Reconciliation manager: the façade the control channel talks to.
//!
//! Holds at most one active operation. `apply` and `command` run under a
//! single lock for their whole duration, so phases never overlap and
//! feedback for an activity is published in the order the phases ran.
//! Inventory queries take the same lock to stay off the filesystem while a
//! phase is running, but never touch the active operation.
//!
//! Lock order is always operation state first, then the feedback sink.

use std::sync::{Mutex, MutexGuard};

use tracing::{error, info, warn};

use crate::convergence::normalize;
use crate::data::InventoryStore;
use crate::error::ReconcileError;
use crate::execution::operation::bare_feedback;
use crate::execution::{Dispatch, Operation, Resources};
use crate::infrastructure::{FeedbackSink, Fetcher};
use crate::types::config::AgentSettings;
use crate::types::desired::DesiredState;
use crate::types::feedback::Status;
use crate::types::inventory::InventoryGraph;
use crate::types::protocol::PhaseCommand;

pub struct ReconciliationManager {
    settings: AgentSettings,
    store: InventoryStore,
    fetcher: Box<dyn Fetcher + Send + Sync>,
    active: Mutex<Option<Operation>>,
    sink: Mutex<Box<dyn FeedbackSink + Send>>,
}

impl ReconciliationManager {
    /// Create a manager for `settings`, creating the managed directory (and
    /// the work directory, if configured) when missing.
    pub fn new(
        settings: AgentSettings,
        fetcher: Box<dyn Fetcher + Send + Sync>,
        sink: Box<dyn FeedbackSink + Send>,
    ) -> Result<ReconciliationManager, ReconcileError> {
        std::fs::create_dir_all(&settings.managed_dir)
            .map_err(|e| ReconcileError::filesystem("create", settings.managed_dir.clone(), e))?;
        if let Some(work_dir) = &settings.work_dir {
            std::fs::create_dir_all(work_dir)
                .map_err(|e| ReconcileError::filesystem("create", work_dir.clone(), e))?;
        }
        let store = InventoryStore::new(settings.managed_dir.clone());
        info!(
            domain = %settings.domain,
            managed_dir = %settings.managed_dir.display(),
            "reconciliation manager ready"
        );
        Ok(ReconciliationManager {
            settings,
            store,
            fetcher,
            active: Mutex::new(None),
            sink: Mutex::new(sink),
        })
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Start a reconciliation toward `desired`.
    ///
    /// An operation still active is abandoned first: rolled back if it left
    /// uncommitted changes, then cleaned up. Returns the status the
    /// request ended in: `Identified` when an operation is now waiting for
    /// phase commands, `Completed` when there was nothing to do, or
    /// `IdentificationFailed`.
    pub fn apply(&self, activity_id: &str, desired: &DesiredState) -> Status {
        let mut active = self.lock_active();
        let mut sink = self.lock_sink();
        let res = self.resources();
        let domain = self.settings.domain.as_str();

        if let Some(mut previous) = active.take() {
            info!(
                previous = %previous.activity_id(),
                activity_id,
                "superseding active operation"
            );
            previous.abandon(&res, &mut **sink);
        }

        sink.publish_feedback(&bare_feedback(domain, activity_id, Status::Identifying, ""));
        let identified = normalize(desired, domain)
            .and_then(|files| Operation::identify(activity_id, files, &res));

        let (operation, has_actions) = match identified {
            Ok(found) => found,
            Err(e) => {
                error!(activity_id, class = e.class(), error = %e, "identification failed");
                sink.publish_feedback(&bare_feedback(
                    domain,
                    activity_id,
                    Status::IdentificationFailed,
                    &e.to_string(),
                ));
                return Status::IdentificationFailed;
            }
        };

        sink.publish_feedback(&operation.feedback(Status::Identified, ""));
        if !has_actions {
            info!(activity_id, "nothing to reconcile");
            sink.publish_feedback(&operation.feedback(Status::Completed, ""));
            operation.discard();
            return Status::Completed;
        }

        info!(activity_id, actions = operation.actions().len(), "operation identified");
        *active = Some(operation);
        Status::Identified
    }

    /// Route a phase command to the active operation. Commands for any other
    /// activity are logged and dropped.
    pub fn command(&self, activity_id: &str, command: &PhaseCommand) -> Dispatch {
        let mut active = self.lock_active();
        let operation = match active.as_mut() {
            Some(op) if op.activity_id() == activity_id => op,
            Some(op) => {
                warn!(
                    activity_id,
                    active = %op.activity_id(),
                    command = %command.command,
                    "command for stale activity, ignoring"
                );
                return Dispatch::Ignored;
            }
            None => {
                warn!(activity_id, command = %command.command, "no active operation, ignoring command");
                return Dispatch::Ignored;
            }
        };

        let mut sink = self.lock_sink();
        let dispatched = operation.execute(command, &self.resources(), &mut **sink);
        if let Dispatch::Executed(status) = dispatched {
            if status.ends_operation() {
                info!(activity_id, %status, "operation released");
                *active = None;
            }
        }
        dispatched
    }

    /// Build the inventory graph from the persisted store, bootstrapping it
    /// on first use.
    pub fn query_inventory(&self) -> Result<InventoryGraph, ReconcileError> {
        let _serialized = self.lock_active();
        let inventory = self.store.load_or_bootstrap()?;
        Ok(InventoryGraph::build(&self.settings.domain, &inventory))
    }

    /// Query the inventory and push it through the feedback sink.
    pub fn publish_inventory(&self) -> Result<InventoryGraph, ReconcileError> {
        let graph = self.query_inventory()?;
        self.lock_sink().publish_inventory(&graph);
        Ok(graph)
    }

    pub fn active_activity(&self) -> Option<String> {
        self.lock_active().as_ref().map(|op| op.activity_id().to_string())
    }

    pub fn active_status(&self) -> Option<Status> {
        self.lock_active().as_ref().map(Operation::status)
    }

    /// Abandon the active operation, if any. Called before the process
    /// exits so neither uncommitted changes nor a workspace are left behind.
    pub fn shutdown(&self) {
        let mut active = self.lock_active();
        if let Some(mut operation) = active.take() {
            info!(activity_id = %operation.activity_id(), "abandoning active operation on shutdown");
            let mut sink = self.lock_sink();
            operation.abandon(&self.resources(), &mut **sink);
        }
    }

    fn resources(&self) -> Resources<'_> {
        Resources {
            managed_dir: &self.settings.managed_dir,
            work_dir: self.settings.work_dir.as_deref(),
            store: &self.store,
            fetcher: &*self.fetcher,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Operation>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_sink(&self) -> MutexGuard<'_, Box<dyn FeedbackSink + Send>> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }
}
