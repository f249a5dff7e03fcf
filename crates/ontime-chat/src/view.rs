//! Rendering seam between the controller and whatever displays the chat.

use std::sync::Mutex;

use ontime_core::types::{ChatMessage, UploadRecord};

/// Output surface for the chat widget.
pub trait ChatView: Send + Sync {
    /// Show one transcript entry.
    fn show_message(&self, message: &ChatMessage);

    /// Show a structured-data block.
    fn show_data(&self, summary: Option<&str>, pretty: &str);

    /// Show or hide the "assistant is typing" indicator.
    fn set_typing(&self, visible: bool);

    /// Redirect the client to a site path.
    fn navigate(&self, path: &str);

    /// Show the current state of an upload.
    fn show_upload(&self, record: &UploadRecord);
}

/// Everything a [`RecordingView`] was asked to show.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Message(ChatMessage),
    Data {
        summary: Option<String>,
        pretty: String,
    },
    Typing(bool),
    Navigate(String),
    Upload(UploadRecord),
}

/// View that records calls instead of drawing anything.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ViewEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Texts of the rendered messages, in order.
    pub fn message_texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Message(m) => Some(m.text),
                _ => None,
            })
            .collect()
    }

    /// Last typing state shown, if any.
    pub fn typing(&self) -> Option<bool> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Typing(v) => Some(v),
            _ => None,
        })
    }
}

impl ChatView for RecordingView {
    fn show_message(&self, message: &ChatMessage) {
        self.push(ViewEvent::Message(message.clone()));
    }

    fn show_data(&self, summary: Option<&str>, pretty: &str) {
        self.push(ViewEvent::Data {
            summary: summary.map(String::from),
            pretty: pretty.to_string(),
        });
    }

    fn set_typing(&self, visible: bool) {
        self.push(ViewEvent::Typing(visible));
    }

    fn navigate(&self, path: &str) {
        self.push(ViewEvent::Navigate(path.to_string()));
    }

    fn show_upload(&self, record: &UploadRecord) {
        self.push(ViewEvent::Upload(record.clone()));
    }
}
