//! Registry of in-flight and recently completed workflows.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;
use vitalsync_model::{StatusChannel, StatusReceiver, WorkflowState};

/// Owns the live channels for in-flight workflows and a bounded history
/// of finished ones.
///
/// The registry is constructed with its engine and dropped with it; there
/// is no ambient global state. Completing a workflow moves its final state
/// into the history (most recent first, oldest evicted beyond the cap)
/// and drops its live channel, which closes all subscriptions.
pub struct WorkflowRegistry {
    active: RwLock<HashMap<Uuid, Arc<StatusChannel<WorkflowState>>>>,
    history: RwLock<VecDeque<WorkflowState>>,
    history_cap: usize,
}

impl WorkflowRegistry {
    /// Creates a registry retaining at most `history_cap` finished workflows.
    pub fn new(history_cap: usize) -> Self {
        Self {
            active: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            history_cap,
        }
    }

    /// Registers a new invocation and returns its live channel.
    pub(crate) fn register(&self, state: WorkflowState) -> Arc<StatusChannel<WorkflowState>> {
        let id = state.id;
        let channel = Arc::new(StatusChannel::new(state));
        self.active.write().insert(id, Arc::clone(&channel));
        channel
    }

    /// Moves a finished invocation into history and closes its channel.
    pub(crate) fn complete(&self, state: WorkflowState) {
        self.active.write().remove(&state.id);

        let mut history = self.history.write();
        history.push_front(state);
        history.truncate(self.history_cap);
    }

    /// Subscribes to a live workflow's state; `None` once it finished.
    pub fn subscribe(&self, id: Uuid) -> Option<StatusReceiver<WorkflowState>> {
        self.active.read().get(&id).map(|channel| channel.subscribe())
    }

    /// Latest state of every in-flight workflow.
    pub fn active(&self) -> Vec<WorkflowState> {
        self.active
            .read()
            .values()
            .map(|channel| channel.latest())
            .collect()
    }

    /// Finished workflows, most recent first.
    pub fn history(&self) -> Vec<WorkflowState> {
        self.history.read().iter().cloned().collect()
    }

    /// Looks up a workflow by id, live or finished.
    pub fn get(&self, id: Uuid) -> Option<WorkflowState> {
        if let Some(channel) = self.active.read().get(&id) {
            return Some(channel.latest());
        }
        self.history.read().iter().find(|s| s.id == id).cloned()
    }
}
