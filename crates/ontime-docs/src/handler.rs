//! Widget event handler for file selection.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ontime_chat::{ChatError, EventHandler, EventKind, EventOutcome, WidgetEvent};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::workflow::{DocumentWorkflow, UploadOutcome};

/// Starts one independent upload workflow per selected file.
///
/// Returns as soon as the workflows are spawned; results arrive in the
/// transcript. The task handles are kept so the caller can wait for
/// running uploads before shutting down.
pub struct FilesSelectedHandler {
    workflow: Arc<DocumentWorkflow>,
    running: Mutex<Vec<JoinHandle<UploadOutcome>>>,
}

impl FilesSelectedHandler {
    pub fn new(workflow: Arc<DocumentWorkflow>) -> Self {
        Self {
            workflow,
            running: Mutex::new(Vec::new()),
        }
    }

    /// Uploads whose task has not finished yet.
    pub fn running(&self) -> usize {
        self.running
            .lock()
            .map(|r| r.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait for every tracked upload and return the outcomes in start order.
    ///
    /// Uploads that had already finished when a later selection arrived are
    /// no longer tracked and are not returned.
    pub async fn wait_all(&self) -> Vec<UploadOutcome> {
        let handles = match self.running.lock() {
            Ok(mut running) => std::mem::take(&mut *running),
            Err(e) => {
                warn!(error = %e, "Upload handle list poisoned");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "Upload task did not finish"),
            }
        }
        outcomes
    }

    fn track(&self, handles: Vec<JoinHandle<UploadOutcome>>) {
        match self.running.lock() {
            Ok(mut running) => {
                running.retain(|h| !h.is_finished());
                running.extend(handles);
            }
            Err(e) => warn!(error = %e, "Upload handle list poisoned; uploads untracked"),
        }
    }
}

#[async_trait]
impl EventHandler for FilesSelectedHandler {
    fn kind(&self) -> EventKind {
        EventKind::FilesSelected
    }

    async fn handle(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError> {
        match event {
            WidgetEvent::FilesSelected(paths) => {
                let count = paths.len();
                self.track(self.workflow.handle_paths(paths));
                info!(count, "Started document uploads");
                Ok(EventOutcome::UploadsStarted(count))
            }
            other => Err(ChatError::UnexpectedEvent {
                handler: self.kind(),
                event: other.kind(),
            }),
        }
    }
}
