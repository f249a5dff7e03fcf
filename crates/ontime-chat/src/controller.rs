//! Chat controller: submits queries and renders exactly one reply per query.
//!
//! Each submission runs independently. Replies render in arrival order, and
//! nothing queues or sequences concurrent submissions.

use std::sync::Arc;

use ontime_core::types::{AssistantReply, ChatMessage};
use ontime_transport::{AssistantApi, TransportError};
use tracing::{debug, warn};

use crate::classifier::QueryClassifier;
use crate::transcript::Transcript;

/// Rendered when the host cannot be reached or answers with garbage.
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Sorry, I'm having trouble connecting right now. Please try again.";

/// Lifecycle of a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Sent,
    AwaitingResponse,
    Rendered,
    Errored,
}

/// What kind of successful reply was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Message,
    Data,
}

/// Final result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Empty input; nothing sent, nothing recorded.
    Ignored,
    Rendered(ReplyKind),
    /// The client was redirected; no message was rendered.
    Navigated(String),
    /// An error message was rendered in place of a reply.
    Errored(String),
}

impl QueryOutcome {
    pub fn state(&self) -> QueryState {
        match self {
            QueryOutcome::Ignored => QueryState::Idle,
            QueryOutcome::Rendered(_) | QueryOutcome::Navigated(_) => QueryState::Rendered,
            QueryOutcome::Errored(_) => QueryState::Errored,
        }
    }
}

/// Orchestrates send, receive and render for chat queries.
pub struct ChatController {
    api: Arc<dyn AssistantApi>,
    classifier: QueryClassifier,
    transcript: Arc<Transcript>,
}

impl ChatController {
    pub fn new(api: Arc<dyn AssistantApi>, transcript: Arc<Transcript>) -> Self {
        Self {
            api,
            classifier: QueryClassifier::new(),
            transcript,
        }
    }

    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    /// Submit a user query.
    ///
    /// Whitespace-only input is ignored. Otherwise the query is recorded,
    /// the typing indicator is shown, the query is routed by its category,
    /// and one reply, redirect or error message is rendered.
    pub async fn submit(&self, text: &str) -> QueryOutcome {
        let query = text.trim();
        if query.is_empty() {
            return QueryOutcome::Ignored;
        }

        self.transcript.append(ChatMessage::user(query));
        let category = self.classifier.classify(query);
        debug!(state = ?QueryState::Sent, %category, "Query submitted");

        self.transcript.view().set_typing(true);
        debug!(state = ?QueryState::AwaitingResponse, "Waiting for reply");
        let result = if category.is_quick() {
            self.api.quick_query(query).await
        } else {
            self.api.chat_response(query, Some(category)).await
        };
        self.transcript.view().set_typing(false);

        let outcome = self.render_reply(result);
        debug!(state = ?outcome.state(), "Query settled");
        outcome
    }

    /// Submit a predefined quick-action query exactly as if it were typed.
    pub async fn quick_action(&self, query: &str) -> QueryOutcome {
        self.submit(query).await
    }

    /// Ask the host to generate a script and render it.
    pub async fn generate_script(&self, prompt: &str, script_type: &str) -> QueryOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return QueryOutcome::Ignored;
        }

        self.transcript
            .append(ChatMessage::user(format!("Generate {}: {}", script_type, prompt)));
        self.transcript.view().set_typing(true);
        let result = self.api.generate_script(prompt, script_type).await;
        self.transcript.view().set_typing(false);

        match result {
            Ok(script) => {
                self.transcript.append(ChatMessage::ai(script));
                QueryOutcome::Rendered(ReplyKind::Message)
            }
            Err(e) => self.render_failure(e),
        }
    }

    fn render_reply(&self, result: Result<AssistantReply, TransportError>) -> QueryOutcome {
        match result {
            Ok(AssistantReply::Message(text)) => {
                self.transcript.append(ChatMessage::ai(text));
                QueryOutcome::Rendered(ReplyKind::Message)
            }
            Ok(AssistantReply::Data { summary, data }) => {
                let pretty =
                    serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
                self.transcript.view().show_data(summary.as_deref(), &pretty);
                self.transcript
                    .record(ChatMessage::ai(summary.unwrap_or(pretty)));
                QueryOutcome::Rendered(ReplyKind::Data)
            }
            Ok(AssistantReply::Navigate { path }) => {
                self.transcript.view().navigate(&path);
                QueryOutcome::Navigated(path)
            }
            Ok(AssistantReply::Error(reason)) => self.render_error(reason),
            Err(e) => self.render_failure(e),
        }
    }

    /// Connection-level failures get the fixed apology; anything the host
    /// or client reported is shown as an error.
    fn render_failure(&self, err: TransportError) -> QueryOutcome {
        if err.is_connection_failure() {
            return self.render_connection_failure(err);
        }
        match err {
            TransportError::Server(reason) => self.render_error(reason),
            other => self.render_error(other.to_string()),
        }
    }

    fn render_error(&self, reason: String) -> QueryOutcome {
        warn!(reason = %reason, "Host reported an error");
        self.transcript
            .append(ChatMessage::ai(format!("Error: {}", reason)));
        QueryOutcome::Errored(reason)
    }

    fn render_connection_failure(&self, err: TransportError) -> QueryOutcome {
        warn!(error = %err, "Query failed");
        self.transcript
            .append(ChatMessage::ai(CONNECTION_ERROR_MESSAGE));
        QueryOutcome::Errored(err.to_string())
    }
}
