use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{OntimeError, Result};

/// Top-level configuration for the Ontime assistant client.
///
/// Loaded from `~/.ontime/config.toml` by default. Each section corresponds
/// to one component of the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OntimeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OntimeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: OntimeConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| OntimeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply environment overrides for secrets that should not live in the
    /// config file.
    ///
    /// `ONTIME_CSRF_TOKEN` and `ONTIME_SID` replace the configured values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("ONTIME_CSRF_TOKEN") {
            self.server.csrf_token = token;
        }
        if let Ok(sid) = std::env::var("ONTIME_SID") {
            self.server.session_id = Some(sid);
        }
    }
}

/// Connection settings for the Frappe host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Site root, e.g. `https://erp.example.com`.
    pub base_url: String,
    /// Anti-forgery token sent as `X-Frappe-CSRF-Token` on every request.
    pub csrf_token: String,
    /// Optional session cookie (`sid`).
    pub session_id: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            csrf_token: String::new(),
            session_id: None,
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Whitelisted method paths on the host.
///
/// Revisions of the backend disagree on which pair of methods performs
/// document analysis, so both analysis routes are plain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub chat_response: String,
    pub quick_query: String,
    pub generate_script: String,
    pub upload_file: String,
    pub start_analysis: String,
    pub analysis_status: String,
}

const API_PREFIX: &str = "ai_assistant.ontime_ai_assistant.api";

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            chat_response: format!("{API_PREFIX}.chat.get_chat_response"),
            quick_query: format!("{API_PREFIX}.chat.quick_query"),
            generate_script: format!("{API_PREFIX}.chat.generate_script_from_prompt"),
            upload_file: "upload_file".to_string(),
            start_analysis: format!("{API_PREFIX}.document_analysis.upload_document"),
            analysis_status: format!("{API_PREFIX}.document_analysis.get_processing_status"),
        }
    }
}

impl RouteConfig {
    /// Route set for backends that expose document analysis on the chat module.
    pub fn with_chat_analysis(self) -> Self {
        Self {
            start_analysis: format!("{API_PREFIX}.chat.upload_and_analyze_document"),
            analysis_status: format!("{API_PREFIX}.chat.get_document_analysis_status"),
            ..self
        }
    }
}

/// Document upload and analysis polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Seconds between two analysis-status polls.
    pub poll_interval_secs: u64,
    /// Polls before the workflow gives up.
    pub max_poll_attempts: u32,
    /// Upload files as private attachments.
    pub private_files: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            max_poll_attempts: 20,
            private_files: true,
        }
    }
}

/// Local chat history persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// SQLite file holding the key-value store.
    pub db_path: String,
    /// Key the serialized history is stored under.
    pub storage_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: "~/.ontime/history.db".to_string(),
            storage_key: "ai_assistant_chat_history".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
