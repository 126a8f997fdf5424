use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::JiraError;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub jira: JiraConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

/// Connection and behaviour settings for the Jira subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub default_project: String,
    pub default_issue_type: String,
    pub debug: bool,
    pub timeout_secs: u64,
    pub fallback_board_ids: Vec<u64>,
    pub sprint_exclude_statuses: Vec<String>,
    pub sprint_show_done_tickets: bool,
    /// Named aliases such as `epic-link` mapped to custom field keys.
    pub field_mappings: HashMap<String, String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            api_token: String::new(),
            default_project: String::new(),
            default_issue_type: "Task".into(),
            debug: false,
            timeout_secs: 30,
            fallback_board_ids: Vec::new(),
            sprint_exclude_statuses: vec!["Done".into()],
            sprint_show_done_tickets: false,
            field_mappings: HashMap::new(),
        }
    }
}

impl JiraConfig {
    /// Fails with a config error naming every blank connection field.
    pub fn require_connection(&self) -> crate::error::Result<()> {
        let missing: Vec<&str> = [
            ("base_url", &self.base_url),
            ("username", &self.username),
            ("api_token", &self.api_token),
            ("default_project", &self.default_project),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(JiraError::Config(format!(
                "missing jira settings: {} (set them in {})",
                missing.join(", "),
                config_path().display()
            )))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub command: String,
    pub debug: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            command: "claude".into(),
            debug: false,
        }
    }
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sre")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str::<AppConfig>(&contents).with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        AppConfig::default()
    };

    if config.jira.api_token.trim().is_empty() {
        if let Ok(token) = std::env::var("JIRA_API_TOKEN") {
            config.jira.api_token = token;
        }
    }

    Ok(config)
}
