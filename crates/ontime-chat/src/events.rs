//! Typed widget events and the handler registry that dispatches them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::controller::{ChatController, QueryOutcome};
use crate::error::ChatError;

/// Something the user did to the widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// Text typed into the input and sent.
    Submit(String),
    /// A predefined query button.
    QuickAction(String),
    /// Files picked or dropped onto the upload area.
    FilesSelected(Vec<PathBuf>),
    /// Script generation request.
    GenerateScript { prompt: String, script_type: String },
    /// Show or hide the chat widget.
    ToggleWidget,
}

/// Registry key for [`WidgetEvent`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Submit,
    QuickAction,
    FilesSelected,
    GenerateScript,
    ToggleWidget,
}

impl WidgetEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WidgetEvent::Submit(_) => EventKind::Submit,
            WidgetEvent::QuickAction(_) => EventKind::QuickAction,
            WidgetEvent::FilesSelected(_) => EventKind::FilesSelected,
            WidgetEvent::GenerateScript { .. } => EventKind::GenerateScript,
            WidgetEvent::ToggleWidget => EventKind::ToggleWidget,
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Query(QueryOutcome),
    /// Number of upload workflows started.
    UploadsStarted(usize),
    /// Widget visibility after a toggle.
    Visibility(bool),
}

/// Handler for one kind of widget event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The event kind this handler is registered under.
    fn kind(&self) -> EventKind;

    async fn handle(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError>;
}

/// Dispatches widget events to their registered handlers.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the chat handlers registered.
    pub fn with_chat_handlers(
        controller: Arc<ChatController>,
        visibility: Arc<WidgetVisibility>,
    ) -> Self {
        let mut router = Self::new();
        router.register(Arc::new(SubmitHandler::new(controller.clone())));
        router.register(Arc::new(QuickActionHandler::new(controller.clone())));
        router.register(Arc::new(ScriptHandler::new(controller)));
        router.register(Arc::new(ToggleHandler::new(visibility)));
        router
    }

    /// Register a handler under its kind, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind, handler).is_some() {
            info!(?kind, "Replaced event handler");
        }
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Dispatch an event to its handler.
    pub async fn dispatch(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError> {
        let kind = event.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or(ChatError::UnhandledEvent(kind))?;
        debug!(?kind, "Dispatching event");
        handler.handle(event).await
    }
}

// =============================================================================
// Chat handlers
// =============================================================================

fn unexpected(handler: EventKind, event: &WidgetEvent) -> ChatError {
    ChatError::UnexpectedEvent {
        handler,
        event: event.kind(),
    }
}

/// Sends typed input to the controller.
pub struct SubmitHandler {
    controller: Arc<ChatController>,
}

impl SubmitHandler {
    pub fn new(controller: Arc<ChatController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl EventHandler for SubmitHandler {
    fn kind(&self) -> EventKind {
        EventKind::Submit
    }

    async fn handle(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError> {
        match event {
            WidgetEvent::Submit(text) => Ok(EventOutcome::Query(self.controller.submit(&text).await)),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

/// Sends a quick-action query to the controller.
pub struct QuickActionHandler {
    controller: Arc<ChatController>,
}

impl QuickActionHandler {
    pub fn new(controller: Arc<ChatController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl EventHandler for QuickActionHandler {
    fn kind(&self) -> EventKind {
        EventKind::QuickAction
    }

    async fn handle(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError> {
        match event {
            WidgetEvent::QuickAction(query) => Ok(EventOutcome::Query(
                self.controller.quick_action(&query).await,
            )),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

/// Forwards script generation requests.
pub struct ScriptHandler {
    controller: Arc<ChatController>,
}

impl ScriptHandler {
    pub fn new(controller: Arc<ChatController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl EventHandler for ScriptHandler {
    fn kind(&self) -> EventKind {
        EventKind::GenerateScript
    }

    async fn handle(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError> {
        match event {
            WidgetEvent::GenerateScript {
                prompt,
                script_type,
            } => Ok(EventOutcome::Query(
                self.controller.generate_script(&prompt, &script_type).await,
            )),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}

/// Whether the chat widget is open.
#[derive(Debug, Default)]
pub struct WidgetVisibility {
    open: AtomicBool,
}

impl WidgetVisibility {
    pub fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Flip visibility and return the new state.
    pub fn toggle(&self) -> bool {
        !self.open.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Opens and closes the widget.
pub struct ToggleHandler {
    visibility: Arc<WidgetVisibility>,
}

impl ToggleHandler {
    pub fn new(visibility: Arc<WidgetVisibility>) -> Self {
        Self { visibility }
    }
}

#[async_trait]
impl EventHandler for ToggleHandler {
    fn kind(&self) -> EventKind {
        EventKind::ToggleWidget
    }

    async fn handle(&self, event: WidgetEvent) -> Result<EventOutcome, ChatError> {
        match event {
            WidgetEvent::ToggleWidget => Ok(EventOutcome::Visibility(self.visibility.toggle())),
            other => Err(unexpected(self.kind(), &other)),
        }
    }
}
