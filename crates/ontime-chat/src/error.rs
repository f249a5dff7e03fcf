//! Error types for the conversational interface.

use ontime_core::error::OntimeError;

use crate::events::EventKind;

/// Errors from the chat front end.
///
/// Query failures never surface here; they are rendered as chat messages.
/// These cover wiring mistakes at the event boundary.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("no handler registered for {0:?} events")]
    UnhandledEvent(EventKind),
    #[error("{handler:?} handler received a {event:?} event")]
    UnexpectedEvent { handler: EventKind, event: EventKind },
}

impl From<ChatError> for OntimeError {
    fn from(err: ChatError) -> Self {
        OntimeError::Chat(err.to_string())
    }
}
