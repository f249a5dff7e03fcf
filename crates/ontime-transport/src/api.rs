//! Typed operations over the assistant's remote routes.

use async_trait::async_trait;
use ontime_core::types::{
    frappe_message, value_text, AnalysisReport, AssistantReply, DocumentType, QueryCategory,
};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::info;

use crate::client::FrappeClient;
use crate::error::TransportError;

/// Remote operations the chat widget depends on.
///
/// Components take an `Arc<dyn AssistantApi>` so tests can substitute a
/// scripted backend.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Full natural-language query.
    async fn chat_response(
        &self,
        query: &str,
        query_type: Option<QueryCategory>,
    ) -> Result<AssistantReply, TransportError>;

    /// Fast path for simple counting and listing questions.
    async fn quick_query(&self, text: &str) -> Result<AssistantReply, TransportError>;

    /// Generate a script from a prompt; returns the script text.
    async fn generate_script(
        &self,
        prompt: &str,
        script_type: &str,
    ) -> Result<String, TransportError>;

    /// Upload raw file bytes; returns the stored file URL.
    async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        is_private: bool,
    ) -> Result<String, TransportError>;

    /// Start server-side analysis of an uploaded file; returns the processor id.
    async fn start_analysis(
        &self,
        file_url: &str,
        document_name: &str,
        document_type: DocumentType,
    ) -> Result<String, TransportError>;

    /// Current state of an analysis job.
    async fn analysis_status(&self, processor_id: &str) -> Result<AnalysisReport, TransportError>;
}

/// Strip the `{"message": ...}` envelope and surface `exc` as an error.
fn unwrap_envelope(body: Value) -> Result<Value, TransportError> {
    if let Some(exc) = body.get("exc").filter(|v| !v.is_null()) {
        return Err(TransportError::Server(value_text(exc)));
    }
    Ok(frappe_message(body))
}

#[async_trait]
impl AssistantApi for FrappeClient {
    async fn chat_response(
        &self,
        query: &str,
        query_type: Option<QueryCategory>,
    ) -> Result<AssistantReply, TransportError> {
        let mut payload = json!({ "user_query": query });
        if let Some(category) = query_type {
            payload["query_type"] = json!(category.as_str());
        }
        let body = self.post_json(&self.routes().chat_response, &payload).await?;
        Ok(AssistantReply::from_body(body))
    }

    async fn quick_query(&self, text: &str) -> Result<AssistantReply, TransportError> {
        let body = self
            .post_json(&self.routes().quick_query, &json!({ "query_text": text }))
            .await?;
        Ok(AssistantReply::from_body(body))
    }

    async fn generate_script(
        &self,
        prompt: &str,
        script_type: &str,
    ) -> Result<String, TransportError> {
        let body = self
            .post_json(
                &self.routes().generate_script,
                &json!({ "prompt": prompt, "script_type": script_type }),
            )
            .await?;
        match AssistantReply::from_body(body) {
            AssistantReply::Message(script) => Ok(script),
            AssistantReply::Error(err) => Err(TransportError::Server(err)),
            AssistantReply::Data { data, .. } => Ok(value_text(&data)),
            AssistantReply::Navigate { path } => Err(TransportError::Decode(format!(
                "unexpected navigation to {} from script generation",
                path
            ))),
        }
    }

    async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        is_private: bool,
    ) -> Result<String, TransportError> {
        let size = bytes.len();
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("is_private", if is_private { "1" } else { "0" });

        let body = self.post_multipart(&self.routes().upload_file, form).await?;
        let message = unwrap_envelope(body)?;
        let file_url = message
            .get("file_url")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Decode("upload response has no file_url".into()))?;

        info!(file_name, size, file_url, "File uploaded");
        Ok(file_url.to_string())
    }

    async fn start_analysis(
        &self,
        file_url: &str,
        document_name: &str,
        document_type: DocumentType,
    ) -> Result<String, TransportError> {
        let body = self
            .post_json(
                &self.routes().start_analysis,
                &json!({
                    "file_url": file_url,
                    "document_name": document_name,
                    "document_type": document_type.as_str(),
                }),
            )
            .await?;
        let message = unwrap_envelope(body)?;

        let success = message.get("success").and_then(Value::as_bool).unwrap_or(true);
        if !success {
            let reason = message
                .get("error")
                .map(value_text)
                .unwrap_or_else(|| "analysis could not be started".to_string());
            return Err(TransportError::Server(reason));
        }

        match message.get("processor_id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(TransportError::Decode(
                "analysis response has no processor_id".into(),
            )),
        }
    }

    async fn analysis_status(&self, processor_id: &str) -> Result<AnalysisReport, TransportError> {
        let body = self
            .post_json(
                &self.routes().analysis_status,
                &json!({ "processor_id": processor_id }),
            )
            .await?;
        if let Some(exc) = body.get("exc").filter(|v| !v.is_null()) {
            return Err(TransportError::Server(value_text(exc)));
        }
        AnalysisReport::from_body(body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
