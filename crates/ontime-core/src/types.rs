use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// Chat messages
// =============================================================================

/// Who authored a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

/// Optional extras attached to a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Confidence reported by document analysis (0.0 to 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One entry of the chat transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Ai)
    }

    /// Attach a confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata
            .get_or_insert_with(MessageMetadata::default)
            .confidence = Some(confidence);
        self
    }

    pub fn confidence(&self) -> Option<f64> {
        self.metadata.as_ref().and_then(|m| m.confidence)
    }
}

// =============================================================================
// Query classification
// =============================================================================

/// Routing category assigned to a user query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryCategory {
    #[serde(rename = "quick")]
    Quick,
    #[serde(rename = "Record Creation")]
    RecordCreation,
    #[serde(rename = "Document Analysis")]
    DocumentAnalysis,
    #[serde(rename = "Insight Generation")]
    InsightGeneration,
    #[serde(rename = "Natural Language")]
    NaturalLanguage,
}

impl QueryCategory {
    /// Label the backend expects in `query_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::Quick => "quick",
            QueryCategory::RecordCreation => "Record Creation",
            QueryCategory::DocumentAnalysis => "Document Analysis",
            QueryCategory::InsightGeneration => "Insight Generation",
            QueryCategory::NaturalLanguage => "Natural Language",
        }
    }

    /// Quick queries go to the fast route; everything else is complex.
    pub fn is_quick(&self) -> bool {
        matches!(self, QueryCategory::Quick)
    }
}

impl std::fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Documents and uploads
// =============================================================================

/// Coarse document category derived from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "Word Document")]
    WordDocument,
    #[serde(rename = "Excel Spreadsheet")]
    ExcelSpreadsheet,
    #[serde(rename = "Image")]
    Image,
    #[serde(rename = "Other")]
    Other,
}

impl DocumentType {
    /// Detect the category of a file by its extension (case-insensitive).
    ///
    /// Used for display and for the `document_type` argument only; unknown
    /// extensions are never rejected.
    pub fn detect(file_name: &str) -> Self {
        let ext = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return DocumentType::Other,
        };
        match ext.as_str() {
            "pdf" => DocumentType::Pdf,
            "doc" | "docx" => DocumentType::WordDocument,
            "xls" | "xlsx" | "csv" => DocumentType::ExcelSpreadsheet,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" | "webp" => {
                DocumentType::Image
            }
            _ => DocumentType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "PDF",
            DocumentType::WordDocument => "Word Document",
            DocumentType::ExcelSpreadsheet => "Excel Spreadsheet",
            DocumentType::Image => "Image",
            DocumentType::Other => "Other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side state of an uploaded file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

/// One selected file and its progress through upload and analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: Uuid,
    pub file_name: String,
    pub status: UploadStatus,
    pub document_type: DocumentType,
    pub processor_id: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            id: Uuid::new_v4(),
            document_type: DocumentType::detect(&file_name),
            file_name,
            status: UploadStatus::Pending,
            processor_id: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Backend replies
// =============================================================================

/// Interpreted reply of a chat route.
#[derive(Clone, Debug, PartialEq)]
pub enum AssistantReply {
    /// Plain text to show in the transcript.
    Message(String),
    /// Client-side redirect to a server-supplied path.
    Navigate { path: String },
    /// Structured result, optionally with a human summary.
    Data {
        summary: Option<String>,
        data: Value,
    },
    /// Error reported inside a successful HTTP response.
    Error(String),
}

impl AssistantReply {
    /// Interpret a decoded response body.
    ///
    /// The Frappe `message` envelope is unwrapped first (see
    /// [`frappe_message`]). A top-level `exc` is a server-side exception.
    pub fn from_body(body: Value) -> Self {
        if let Some(exc) = body.get("exc").filter(|v| !v.is_null()) {
            return AssistantReply::Error(value_text(exc));
        }

        let payload = frappe_message(body);

        match payload {
            Value::Null => AssistantReply::Error("The assistant returned an empty response.".into()),
            Value::String(text) => AssistantReply::Message(text),
            Value::Object(map) => {
                let is_navigate = map
                    .get("status")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case("navigate"));
                if is_navigate {
                    if let Some(path) = map.get("path").and_then(Value::as_str) {
                        return AssistantReply::Navigate {
                            path: path.to_string(),
                        };
                    }
                }
                if let Some(err) = map.get("error").filter(|v| !v.is_null()) {
                    return AssistantReply::Error(value_text(err));
                }
                if let Some(data) = map.get("data").filter(|v| !v.is_null()) {
                    return AssistantReply::Data {
                        summary: map.get("summary").and_then(Value::as_str).map(String::from),
                        data: data.clone(),
                    };
                }
                if let Some(text) = map.get("message").and_then(Value::as_str) {
                    return AssistantReply::Message(text.to_string());
                }
                AssistantReply::Data {
                    summary: None,
                    data: Value::Object(map),
                }
            }
            other => AssistantReply::Data {
                summary: None,
                data: other,
            },
        }
    }
}

/// Server-side state of a document analysis job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl From<String> for AnalysisStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => AnalysisStatus::Pending,
            "processing" => AnalysisStatus::Processing,
            "completed" => AnalysisStatus::Completed,
            "failed" => AnalysisStatus::Failed,
            _ => AnalysisStatus::Other(s),
        }
    }
}

impl From<AnalysisStatus> for String {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Pending => "Pending".to_string(),
            AnalysisStatus::Processing => "Processing".to_string(),
            AnalysisStatus::Completed => "Completed".to_string(),
            AnalysisStatus::Failed => "Failed".to_string(),
            AnalysisStatus::Other(s) => s,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_status() -> AnalysisStatus {
    AnalysisStatus::Pending
}

/// Body of the analysis-status route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default = "default_status")]
    pub status: AnalysisStatus,
    #[serde(default)]
    pub extracted_data: Option<Value>,
    /// Absent or `null` on the wire decodes as empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_records: Vec<Value>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalysisReport {
    /// A report for a job that is still running.
    pub fn processing() -> Self {
        Self {
            success: true,
            status: AnalysisStatus::Processing,
            extracted_data: None,
            created_records: Vec::new(),
            confidence_score: None,
            error: None,
        }
    }

    /// Decode a report, unwrapping the Frappe `message` envelope.
    pub fn from_body(body: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(frappe_message(body))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Unwrap Frappe's `{"message": ...}` envelope.
///
/// Whitelisted methods return their value under `message`, whatever its
/// type. A `null`, empty-string or `false` message counts as no reply and
/// becomes `Null`. Bodies without the key pass through unchanged.
pub fn frappe_message(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("message") => {
            match map.remove("message").unwrap_or(Value::Null) {
                Value::String(s) if s.is_empty() => Value::Null,
                Value::Bool(false) => Value::Null,
                message => message,
            }
        }
        other => other,
    }
}

/// Render a JSON value as display text (strings without quotes).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
