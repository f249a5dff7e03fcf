//! Conversational front end of the Ontime assistant.
//!
//! Classifies queries, routes them to the quick or complex backend path,
//! renders replies through a [`ChatView`], and keeps the persisted
//! transcript in step.

pub mod classifier;
pub mod controller;
pub mod error;
pub mod events;
pub mod transcript;
pub mod view;

pub use classifier::{determine_query_type, QueryClassifier};
pub use controller::{ChatController, QueryOutcome, QueryState, ReplyKind, CONNECTION_ERROR_MESSAGE};
pub use error::ChatError;
pub use events::{
    EventHandler, EventKind, EventOutcome, EventRouter, QuickActionHandler, ScriptHandler,
    SubmitHandler, ToggleHandler, WidgetEvent, WidgetVisibility,
};
pub use transcript::Transcript;
pub use view::{ChatView, RecordingView, ViewEvent};
