//! Upload, start analysis, and poll until a terminal state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ontime_chat::Transcript;
use ontime_core::types::{
    value_text, AnalysisReport, AnalysisStatus, ChatMessage, UploadRecord, UploadStatus,
};
use ontime_transport::AssistantApi;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DocumentError;
use crate::timer::{PollPolicy, PollTimer, TokioTimer};
use crate::tracker::UploadTracker;

/// A file picked by the user, already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after the last path component.
    pub async fn read(path: &Path) -> Result<Self, DocumentError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| DocumentError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(display_name(path), bytes))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Workflow stages, in order. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Selected,
    Uploading,
    Uploaded,
    AnalysisStarted,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

/// Terminal result of one workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Completed(AnalysisReport),
    Failed(String),
    TimedOut { attempts: u32 },
}

impl UploadOutcome {
    pub fn stage(&self) -> UploadStage {
        match self {
            UploadOutcome::Completed(_) => UploadStage::Completed,
            UploadOutcome::Failed(_) => UploadStage::Failed,
            UploadOutcome::TimedOut { .. } => UploadStage::TimedOut,
        }
    }
}

/// Runs upload/poll workflows and renders their results into the transcript.
pub struct DocumentWorkflow {
    api: Arc<dyn AssistantApi>,
    transcript: Arc<Transcript>,
    tracker: Arc<UploadTracker>,
    timer: Arc<dyn PollTimer>,
    policy: PollPolicy,
    private_files: bool,
}

impl DocumentWorkflow {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        transcript: Arc<Transcript>,
        tracker: Arc<UploadTracker>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            api,
            transcript,
            tracker,
            timer: Arc::new(TokioTimer),
            policy,
            private_files: true,
        }
    }

    /// Replace the timer used between polls.
    pub fn with_timer(mut self, timer: Arc<dyn PollTimer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_private_files(mut self, private_files: bool) -> Self {
        self.private_files = private_files;
        self
    }

    pub fn tracker(&self) -> &Arc<UploadTracker> {
        &self.tracker
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Run one file through upload, analysis start, and status polling.
    pub async fn process(&self, file: SelectedFile) -> UploadOutcome {
        let record = self.tracker.create(&file.name);
        self.transcript.view().show_upload(&record);
        self.stage(&record, UploadStage::Selected);

        self.set_status(record.id, UploadStatus::Uploading);
        self.stage(&record, UploadStage::Uploading);
        let file_url = match self
            .api
            .upload_file(&file.name, file.bytes, self.private_files)
            .await
        {
            Ok(url) => url,
            Err(e) => return self.fail(&record, DocumentError::Upload(e)),
        };
        self.stage(&record, UploadStage::Uploaded);

        let processor_id = match self
            .api
            .start_analysis(&file_url, &record.file_name, record.document_type)
            .await
        {
            Ok(id) => id,
            Err(e) => return self.fail(&record, DocumentError::AnalysisStart(e)),
        };
        self.tracker
            .update(record.id, |r| r.processor_id = Some(processor_id.clone()));
        self.stage(&record, UploadStage::AnalysisStarted);

        self.set_status(record.id, UploadStatus::Processing);
        self.stage(&record, UploadStage::Processing);
        self.poll(&record, &processor_id).await
    }

    /// Bounded status polling: poll, and wait one interval only if
    /// attempts remain.
    async fn poll(&self, record: &UploadRecord, processor_id: &str) -> UploadOutcome {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match self.api.analysis_status(processor_id).await {
                Ok(report) if !report.success => {
                    let reason = report
                        .error
                        .clone()
                        .unwrap_or_else(|| "the server rejected the status request".to_string());
                    return self.fail(record, DocumentError::AnalysisFailed(reason));
                }
                Ok(report) => match report.status {
                    AnalysisStatus::Completed => return self.complete(record, report),
                    AnalysisStatus::Failed => {
                        let reason = report
                            .error
                            .clone()
                            .unwrap_or_else(|| "unknown error".to_string());
                        return self.fail(record, DocumentError::AnalysisFailed(reason));
                    }
                    ref status => {
                        debug!(file = %record.file_name, attempt, ?status, "Analysis still running");
                    }
                },
                Err(e) => {
                    warn!(file = %record.file_name, attempt, error = %e, "Status check failed");
                }
            }

            if attempt < max_attempts {
                self.timer.sleep(self.policy.interval).await;
            }
        }

        self.time_out(record, max_attempts)
    }

    /// Start a workflow on its own task.
    pub fn spawn(self: &Arc<Self>, file: SelectedFile) -> JoinHandle<UploadOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.process(file).await })
    }

    /// Read and process each path on its own task.
    ///
    /// Unreadable files end in `Failed` without contacting the host.
    pub fn handle_paths(self: &Arc<Self>, paths: Vec<PathBuf>) -> Vec<JoinHandle<UploadOutcome>> {
        paths
            .into_iter()
            .map(|path| {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    match SelectedFile::read(&path).await {
                        Ok(file) => this.process(file).await,
                        Err(e) => {
                            let record = this.tracker.create(&display_name(&path));
                            this.fail(&record, e)
                        }
                    }
                })
            })
            .collect()
    }

    // -- Private helpers --

    fn stage(&self, record: &UploadRecord, stage: UploadStage) {
        debug!(file = %record.file_name, upload_id = %record.id, ?stage, "Upload stage");
    }

    fn set_status(&self, id: Uuid, status: UploadStatus) {
        if let Some(updated) = self.tracker.set_status(id, status) {
            self.transcript.view().show_upload(&updated);
        }
    }

    fn fail(&self, record: &UploadRecord, err: DocumentError) -> UploadOutcome {
        warn!(file = %record.file_name, error = %err, "Upload workflow failed");
        let updated = self.tracker.update(record.id, |r| {
            r.status = UploadStatus::Failed;
            r.error = Some(err.to_string());
        });
        if let Some(updated) = updated {
            self.transcript.view().show_upload(&updated);
        }
        self.stage(record, UploadStage::Failed);

        let message = failure_text(&record.file_name, &err);
        self.transcript.append(ChatMessage::ai(message.clone()));
        UploadOutcome::Failed(message)
    }

    fn complete(&self, record: &UploadRecord, report: AnalysisReport) -> UploadOutcome {
        self.set_status(record.id, UploadStatus::Completed);
        self.stage(record, UploadStage::Completed);
        info!(
            file = %record.file_name,
            confidence = ?report.confidence_score,
            "Document analysis completed"
        );

        let mut message = ChatMessage::ai(completion_text(&record.file_name, &report));
        if let Some(score) = report.confidence_score {
            message = message.with_confidence(score);
        }
        self.transcript.append(message);
        UploadOutcome::Completed(report)
    }

    fn time_out(&self, record: &UploadRecord, attempts: u32) -> UploadOutcome {
        let err = DocumentError::Timeout { attempts };
        warn!(file = %record.file_name, attempts, "Analysis polling timed out");
        let updated = self.tracker.update(record.id, |r| {
            r.status = UploadStatus::Failed;
            r.error = Some(err.to_string());
        });
        if let Some(updated) = updated {
            self.transcript.view().show_upload(&updated);
        }
        self.stage(record, UploadStage::TimedOut);
        self.transcript
            .append(ChatMessage::ai(failure_text(&record.file_name, &err)));
        UploadOutcome::TimedOut { attempts }
    }
}

/// Chat text for a workflow that ended in failure.
fn failure_text(file_name: &str, err: &DocumentError) -> String {
    match err {
        DocumentError::Read { path, source } => format!("Could not read {}: {}", path, source),
        DocumentError::Upload(e) => format!("Failed to upload {}: {}", file_name, e),
        DocumentError::AnalysisStart(e) => {
            format!("Could not start analysis of {}: {}", file_name, e)
        }
        DocumentError::AnalysisFailed(reason) => {
            format!("Analysis of {} failed: {}", file_name, reason)
        }
        DocumentError::Timeout { .. } => format!(
            "Analysis of {} is taking longer than expected. Please check back later.",
            file_name
        ),
    }
}

/// Chat text for a completed analysis: extracted data and created records.
fn completion_text(file_name: &str, report: &AnalysisReport) -> String {
    let mut text = format!("Analysis of {} completed.", file_name);

    if let Some(data) = report.extracted_data.as_ref().filter(|d| !d.is_null()) {
        let pretty = match data {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        text.push_str("\n\nExtracted data:\n");
        text.push_str(&pretty);
    }

    if !report.created_records.is_empty() {
        text.push_str("\n\nCreated records:");
        for record in &report.created_records {
            text.push_str("\n- ");
            text.push_str(&describe_record(record));
        }
    }

    text
}

fn describe_record(record: &Value) -> String {
    let doctype = record.get("doctype").and_then(Value::as_str);
    let name = record.get("name").and_then(Value::as_str);
    match (doctype, name) {
        (Some(doctype), Some(name)) => format!("{} {}", doctype, name),
        _ => value_text(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use ontime_chat::{RecordingView, ViewEvent};
    use ontime_core::types::{AssistantReply, DocumentType, QueryCategory};
    use ontime_storage::MemoryHistoryStore;
    use ontime_transport::TransportError;
    use serde_json::json;

    use crate::timer::InstantTimer;

    fn report(status: AnalysisStatus) -> AnalysisReport {
        AnalysisReport {
            status,
            ..AnalysisReport::processing()
        }
    }

    fn completed() -> AnalysisReport {
        AnalysisReport {
            success: true,
            status: AnalysisStatus::Completed,
            extracted_data: Some(json!({"supplier": "ACME", "total": 99.5})),
            created_records: vec![json!({"doctype": "Purchase Invoice", "name": "PINV-7"})],
            confidence_score: Some(0.88),
            error: None,
        }
    }

    /// Backend double with one scripted status sequence per processor id.
    #[derive(Default)]
    struct ScriptedBackend {
        upload_error: Option<TransportError>,
        start_error: Option<TransportError>,
        statuses: Mutex<HashMap<String, VecDeque<Result<AnalysisReport, TransportError>>>>,
        polls: Mutex<HashMap<String, u32>>,
        uploads: Mutex<Vec<(String, usize, bool)>>,
        started: Mutex<Vec<(String, String, DocumentType)>>,
    }

    impl ScriptedBackend {
        fn script(&self, processor_id: &str, seq: Vec<Result<AnalysisReport, TransportError>>) {
            self.statuses
                .lock()
                .unwrap()
                .insert(processor_id.to_string(), seq.into());
        }

        fn polls(&self, processor_id: &str) -> u32 {
            self.polls
                .lock()
                .unwrap()
                .get(processor_id)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl AssistantApi for ScriptedBackend {
        async fn chat_response(
            &self,
            _query: &str,
            _query_type: Option<QueryCategory>,
        ) -> Result<AssistantReply, TransportError> {
            unreachable!("document tests do not chat")
        }

        async fn quick_query(&self, _text: &str) -> Result<AssistantReply, TransportError> {
            unreachable!("document tests do not chat")
        }

        async fn generate_script(
            &self,
            _prompt: &str,
            _script_type: &str,
        ) -> Result<String, TransportError> {
            unreachable!("document tests do not generate scripts")
        }

        async fn upload_file(
            &self,
            file_name: &str,
            bytes: Vec<u8>,
            is_private: bool,
        ) -> Result<String, TransportError> {
            self.uploads
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.len(), is_private));
            match &self.upload_error {
                Some(e) => Err(e.clone()),
                None => Ok(format!("/private/files/{}", file_name)),
            }
        }

        async fn start_analysis(
            &self,
            file_url: &str,
            document_name: &str,
            document_type: DocumentType,
        ) -> Result<String, TransportError> {
            self.started.lock().unwrap().push((
                file_url.to_string(),
                document_name.to_string(),
                document_type,
            ));
            match &self.start_error {
                Some(e) => Err(e.clone()),
                None => Ok(format!("proc-{}", document_name)),
            }
        }

        async fn analysis_status(
            &self,
            processor_id: &str,
        ) -> Result<AnalysisReport, TransportError> {
            *self
                .polls
                .lock()
                .unwrap()
                .entry(processor_id.to_string())
                .or_insert(0) += 1;
            self.statuses
                .lock()
                .unwrap()
                .get_mut(processor_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(AnalysisReport::processing()))
        }
    }

    struct Harness {
        workflow: Arc<DocumentWorkflow>,
        backend: Arc<ScriptedBackend>,
        view: Arc<RecordingView>,
        timer: Arc<InstantTimer>,
        transcript: Arc<Transcript>,
    }

    fn harness(backend: ScriptedBackend) -> Harness {
        let backend = Arc::new(backend);
        let view = Arc::new(RecordingView::new());
        let transcript = Arc::new(Transcript::new(
            Arc::new(MemoryHistoryStore::new()),
            view.clone(),
        ));
        let timer = Arc::new(InstantTimer::new());
        let workflow = DocumentWorkflow::new(
            backend.clone(),
            transcript.clone(),
            Arc::new(UploadTracker::new()),
            PollPolicy::default(),
        )
        .with_timer(timer.clone());
        Harness {
            workflow: Arc::new(workflow),
            backend,
            view,
            timer,
            transcript,
        }
    }

    fn invoice() -> SelectedFile {
        SelectedFile::new("invoice.pdf", b"%PDF-1.4".to_vec())
    }

    // ---- Poll loop bounds ----

    #[tokio::test]
    async fn test_completes_on_last_attempt() {
        let backend = ScriptedBackend::default();
        let mut seq: Vec<_> = (0..19)
            .map(|_| Ok(report(AnalysisStatus::Processing)))
            .collect();
        seq.push(Ok(completed()));
        backend.script("proc-invoice.pdf", seq);
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert!(matches!(outcome, UploadOutcome::Completed(_)));
        assert_eq!(h.backend.polls("proc-invoice.pdf"), 20);
        assert_eq!(h.timer.waits().len(), 19);

        let last = h.transcript.messages().pop().unwrap();
        assert!(last.text.starts_with("Analysis of invoice.pdf completed."));
        assert!(last.text.contains("\"supplier\": \"ACME\""));
        assert!(last.text.contains("- Purchase Invoice PINV-7"));
        assert_eq!(last.confidence(), Some(0.88));

        let record = &h.workflow.tracker().list()[0];
        assert_eq!(record.status, UploadStatus::Completed);
        assert_eq!(record.processor_id.as_deref(), Some("proc-invoice.pdf"));
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let h = harness(ScriptedBackend::default());

        let outcome = h.workflow.process(invoice()).await;
        assert_eq!(outcome, UploadOutcome::TimedOut { attempts: 20 });
        assert_eq!(outcome.stage(), UploadStage::TimedOut);
        assert_eq!(h.backend.polls("proc-invoice.pdf"), 20);
        // No wait after the final attempt.
        assert_eq!(h.timer.waits().len(), 19);

        let last = h.transcript.messages().pop().unwrap();
        assert!(last.text.contains("taking longer than expected"));
        let record = &h.workflow.tracker().list()[0];
        assert_eq!(record.status, UploadStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("20 status checks"));
    }

    #[tokio::test]
    async fn test_interval_is_fixed() {
        let h = harness(ScriptedBackend::default());
        h.workflow.process(invoice()).await;
        assert!(h
            .timer
            .waits()
            .iter()
            .all(|w| *w == Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_custom_policy() {
        let backend = Arc::new(ScriptedBackend::default());
        let timer = Arc::new(InstantTimer::new());
        let transcript = Arc::new(Transcript::new(
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(RecordingView::new()),
        ));
        let policy = PollPolicy {
            interval: Duration::from_millis(250),
            max_attempts: 3,
        };
        let workflow = DocumentWorkflow::new(
            backend.clone(),
            transcript,
            Arc::new(UploadTracker::new()),
            policy,
        )
        .with_timer(timer.clone());

        let outcome = workflow.process(invoice()).await;
        assert_eq!(outcome, UploadOutcome::TimedOut { attempts: 3 });
        assert_eq!(backend.polls("proc-invoice.pdf"), 3);
        assert_eq!(
            timer.waits(),
            vec![Duration::from_millis(250), Duration::from_millis(250)]
        );
    }

    #[tokio::test]
    async fn test_completed_on_first_poll_never_waits() {
        let backend = ScriptedBackend::default();
        backend.script("proc-invoice.pdf", vec![Ok(completed())]);
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert!(matches!(outcome, UploadOutcome::Completed(_)));
        assert!(h.timer.waits().is_empty());
    }

    // ---- Terminal failures ----

    #[tokio::test]
    async fn test_failed_status_renders_server_error() {
        let backend = ScriptedBackend::default();
        backend.script(
            "proc-invoice.pdf",
            vec![
                Ok(report(AnalysisStatus::Processing)),
                Ok(AnalysisReport {
                    error: Some("Could not extract text".into()),
                    ..report(AnalysisStatus::Failed)
                }),
            ],
        );
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert_eq!(
            outcome,
            UploadOutcome::Failed("Analysis of invoice.pdf failed: Could not extract text".into())
        );
        assert_eq!(h.backend.polls("proc-invoice.pdf"), 2);
        assert_eq!(
            h.transcript.messages().pop().unwrap().text,
            "Analysis of invoice.pdf failed: Could not extract text"
        );
    }

    #[tokio::test]
    async fn test_unsuccessful_status_response_fails() {
        let backend = ScriptedBackend::default();
        backend.script(
            "proc-invoice.pdf",
            vec![Ok(AnalysisReport {
                success: false,
                error: Some("Unknown processor".into()),
                ..AnalysisReport::processing()
            })],
        );
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert!(matches!(outcome, UploadOutcome::Failed(ref m) if m.contains("Unknown processor")));
    }

    #[tokio::test]
    async fn test_upload_failure_ends_workflow() {
        let backend = ScriptedBackend {
            upload_error: Some(TransportError::Network("connection reset".into())),
            ..ScriptedBackend::default()
        };
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert_eq!(outcome.stage(), UploadStage::Failed);
        assert!(h.backend.started.lock().unwrap().is_empty());
        assert_eq!(h.backend.polls("proc-invoice.pdf"), 0);

        let record = &h.workflow.tracker().list()[0];
        assert_eq!(record.status, UploadStatus::Failed);
        let last = h.transcript.messages().pop().unwrap();
        assert!(last.text.starts_with("Failed to upload invoice.pdf"));
    }

    #[tokio::test]
    async fn test_analysis_start_failure_ends_workflow() {
        let backend = ScriptedBackend {
            start_error: Some(TransportError::Server("Unsupported document type".into())),
            ..ScriptedBackend::default()
        };
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert!(matches!(outcome, UploadOutcome::Failed(ref m) if m.contains("Unsupported document type")));
        assert_eq!(h.backend.polls("proc-invoice.pdf"), 0);
    }

    #[tokio::test]
    async fn test_poll_transport_error_counts_as_attempt() {
        let backend = ScriptedBackend::default();
        backend.script(
            "proc-invoice.pdf",
            vec![
                Err(TransportError::Network("timeout".into())),
                Ok(completed()),
            ],
        );
        let h = harness(backend);

        let outcome = h.workflow.process(invoice()).await;
        assert!(matches!(outcome, UploadOutcome::Completed(_)));
        assert_eq!(h.backend.polls("proc-invoice.pdf"), 2);
    }

    // ---- Request shape and rendering ----

    #[tokio::test]
    async fn test_analysis_request_uses_upload_url_and_type() {
        let backend = ScriptedBackend::default();
        backend.script("proc-ledger.xlsx", vec![Ok(completed())]);
        let h = harness(backend);

        h.workflow
            .process(SelectedFile::new("ledger.xlsx", vec![0u8; 16]))
            .await;

        let uploads = h.backend.uploads.lock().unwrap().clone();
        assert_eq!(uploads, vec![("ledger.xlsx".to_string(), 16, true)]);
        let started = h.backend.started.lock().unwrap().clone();
        assert_eq!(
            started,
            vec![(
                "/private/files/ledger.xlsx".to_string(),
                "ledger.xlsx".to_string(),
                DocumentType::ExcelSpreadsheet
            )]
        );
    }

    #[tokio::test]
    async fn test_public_upload_flag() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.script("proc-a.png", vec![Ok(completed())]);
        let transcript = Arc::new(Transcript::new(
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(RecordingView::new()),
        ));
        let workflow = DocumentWorkflow::new(
            backend.clone(),
            transcript,
            Arc::new(UploadTracker::new()),
            PollPolicy::default(),
        )
        .with_timer(Arc::new(InstantTimer::new()))
        .with_private_files(false);

        workflow.process(SelectedFile::new("a.png", vec![1])).await;
        assert!(!backend.uploads.lock().unwrap()[0].2);
    }

    #[tokio::test]
    async fn test_upload_status_progression_is_shown() {
        let backend = ScriptedBackend::default();
        backend.script("proc-invoice.pdf", vec![Ok(completed())]);
        let h = harness(backend);
        h.workflow.process(invoice()).await;

        let statuses: Vec<UploadStatus> = h
            .view
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Upload(r) => Some(r.status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                UploadStatus::Pending,
                UploadStatus::Uploading,
                UploadStatus::Processing,
                UploadStatus::Completed,
            ]
        );
    }

    #[test]
    fn test_completion_text_without_extras() {
        let text = completion_text("a.pdf", &report(AnalysisStatus::Completed));
        assert_eq!(text, "Analysis of a.pdf completed.");
    }

    #[test]
    fn test_completion_text_with_string_data() {
        let report = AnalysisReport {
            extracted_data: Some(json!("A two-page supply contract.")),
            ..report(AnalysisStatus::Completed)
        };
        let text = completion_text("c.docx", &report);
        assert!(text.ends_with("Extracted data:\nA two-page supply contract."));
    }

    #[test]
    fn test_describe_record_fallback() {
        assert_eq!(describe_record(&json!("PINV-9")), "PINV-9");
        assert_eq!(
            describe_record(&json!({"doctype": "Item", "name": "WIDGET"})),
            "Item WIDGET"
        );
    }

    // ---- Concurrency ----

    #[tokio::test]
    async fn test_concurrent_workflows_are_independent() {
        let backend = ScriptedBackend::default();
        backend.script(
            "proc-a.pdf",
            vec![
                Ok(report(AnalysisStatus::Processing)),
                Ok(report(AnalysisStatus::Processing)),
                Ok(completed()),
            ],
        );
        backend.script(
            "proc-b.pdf",
            vec![Ok(AnalysisReport {
                error: Some("corrupt file".into()),
                ..report(AnalysisStatus::Failed)
            })],
        );
        let h = harness(backend);

        let a = h.workflow.spawn(SelectedFile::new("a.pdf", vec![1]));
        let b = h.workflow.spawn(SelectedFile::new("b.pdf", vec![2]));
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert!(matches!(a, UploadOutcome::Completed(_)));
        assert!(matches!(b, UploadOutcome::Failed(_)));
        assert_eq!(h.backend.polls("proc-a.pdf"), 3);
        assert_eq!(h.backend.polls("proc-b.pdf"), 1);

        let records = h.workflow.tracker().list();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status.is_terminal()));
    }

    #[tokio::test]
    async fn test_spawned_workflow_can_be_aborted() {
        let backend = Arc::new(ScriptedBackend::default());
        let transcript = Arc::new(Transcript::new(
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(RecordingView::new()),
        ));
        let policy = PollPolicy {
            interval: Duration::from_secs(3600),
            max_attempts: 20,
        };
        let workflow = Arc::new(DocumentWorkflow::new(
            backend.clone(),
            transcript,
            Arc::new(UploadTracker::new()),
            policy,
        ));

        let handle = workflow.spawn(invoice());
        while backend.polls("proc-invoice.pdf") == 0 {
            tokio::task::yield_now().await;
        }
        handle.abort();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(backend.polls("proc-invoice.pdf"), 1);
        assert_eq!(workflow.tracker().in_flight(), 1);
    }

    #[tokio::test]
    async fn test_handle_paths_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.docx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let backend = ScriptedBackend::default();
        backend.script("proc-contract.docx", vec![Ok(completed())]);
        let h = harness(backend);

        let handles = h
            .workflow
            .handle_paths(vec![path, dir.path().join("missing.pdf")]);
        assert_eq!(handles.len(), 2);
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert!(matches!(outcomes[0], UploadOutcome::Completed(_)));
        assert!(matches!(outcomes[1], UploadOutcome::Failed(ref m) if m.contains("missing.pdf")));
        assert_eq!(h.backend.uploads.lock().unwrap().len(), 1);
        assert_eq!(h.workflow.tracker().list().len(), 2);
    }
}
