//! Terminal rendering and interactive input parsing.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use ontime_chat::{ChatView, WidgetEvent};
use ontime_core::types::{ChatMessage, Sender, UploadRecord};
use ontime_transport::FrappeClient;

/// Prints the chat to stdout. Logs go to stderr.
pub struct TerminalView {
    client: Arc<FrappeClient>,
}

impl TerminalView {
    pub fn new(client: Arc<FrappeClient>) -> Self {
        Self { client }
    }

    fn print(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl ChatView for TerminalView {
    fn show_message(&self, message: &ChatMessage) {
        self.print(&format_message(message));
    }

    fn show_data(&self, summary: Option<&str>, pretty: &str) {
        match summary {
            Some(summary) => self.print(&format!("ai> {}\n{}", summary, pretty)),
            None => self.print(&format!("ai>\n{}", pretty)),
        }
    }

    fn set_typing(&self, visible: bool) {
        if visible {
            self.print("   ...");
        }
    }

    fn navigate(&self, path: &str) {
        self.print(&format!("-> {}", self.client.site_url(path)));
    }

    fn show_upload(&self, record: &UploadRecord) {
        self.print(&format!(
            "[upload] {} ({}): {:?}",
            record.file_name, record.document_type, record.status
        ));
    }
}

/// One transcript entry as a terminal line.
pub fn format_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Ai => "ai",
    };
    let mut line = format!(
        "[{}] {}> {}",
        message.timestamp.with_timezone(&chrono::Local).format("%H:%M"),
        who,
        message.text
    );
    if let Some(confidence) = message.confidence() {
        line.push_str(&format!(" (confidence {:.0}%)", confidence * 100.0));
    }
    line
}

/// A line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Event(WidgetEvent),
    Quit,
    Help,
    Empty,
    /// Slash command with bad arguments; carries a usage hint.
    Invalid(String),
}

pub const HELP: &str = "\
Type a question and press enter. Commands:
  /upload <path>...           upload documents for analysis
  /script <type> <prompt>     generate a script, e.g. /script \"Client Script\" hide a field
  /toggle                     show or hide the chat widget
  /quit                       exit";

/// Parse one line of interactive input.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Event(WidgetEvent::Submit(line.to_string()));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    match name {
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        "toggle" => Input::Event(WidgetEvent::ToggleWidget),
        "upload" => {
            let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                Input::Invalid("usage: /upload <path>...".into())
            } else {
                Input::Event(WidgetEvent::FilesSelected(paths))
            }
        }
        "script" => match split_script_args(rest) {
            Some((script_type, prompt)) => Input::Event(WidgetEvent::GenerateScript {
                prompt,
                script_type,
            }),
            None => Input::Invalid("usage: /script <type> <prompt>".into()),
        },
        other => Input::Invalid(format!("unknown command /{}; try /help", other)),
    }
}

/// Split `/script` arguments into type and prompt. A quoted type may
/// contain spaces.
fn split_script_args(rest: &str) -> Option<(String, String)> {
    let (script_type, prompt) = if let Some(quoted) = rest.strip_prefix('"') {
        let (script_type, prompt) = quoted.split_once('"')?;
        (script_type, prompt)
    } else {
        rest.split_once(char::is_whitespace)?
    };
    let (script_type, prompt) = (script_type.trim(), prompt.trim());
    if script_type.is_empty() || prompt.is_empty() {
        return None;
    }
    Some((script_type.to_string(), prompt.to_string()))
}
