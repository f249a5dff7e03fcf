//! CLI argument definitions for the Ontime client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use ontime_core::config::RouteConfig;
use std::path::PathBuf;

/// Ontime: terminal client for the Frappe AI assistant.
#[derive(Parser, Debug)]
#[command(name = "ontime", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Frappe site root, e.g. https://erp.example.com.
    #[arg(short = 'u', long = "base-url")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Use the chat module's document analysis routes instead of the
    /// document_analysis module's.
    #[arg(long = "chat-analysis")]
    pub chat_analysis: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive chat session (default).
    Chat,
    /// Send one query and print the reply.
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Upload documents for analysis and wait for the results.
    Upload {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },
    /// Print the category a query would be routed under.
    Classify {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Print the persisted chat history.
    History,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ONTIME_CONFIG env var > ~/.ontime/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ONTIME_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the site root.
    ///
    /// Priority: --base-url flag > ONTIME_BASE_URL env var > config file value.
    pub fn resolve_base_url(&self, config_url: &str) -> String {
        if let Some(ref url) = self.base_url {
            return url.clone();
        }
        if let Ok(url) = std::env::var("ONTIME_BASE_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        config_url.to_string()
    }

    /// Resolve the remote routes.
    ///
    /// --chat-analysis switches both analysis routes to the chat module.
    pub fn resolve_routes(&self, routes: RouteConfig) -> RouteConfig {
        if self.chat_analysis {
            routes.with_chat_analysis()
        } else {
            routes
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ontime").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ontime").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}
