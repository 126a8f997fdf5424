use serde_json::Value;

pub type Result<T> = std::result::Result<T, JiraError>;

/// Exit codes handed back to the shell.
pub mod exit_code {
    pub const GENERAL: u8 = 1;
    pub const MISUSE: u8 = 2;
    pub const AUTH: u8 = 3;
    pub const NETWORK: u8 = 4;
    pub const NOT_FOUND: u8 = 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    Timeout,
    NotFound,
    ExternalApi,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("{message}")]
    Validation {
        message: String,
        context: Option<Value>,
    },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Jira API error: {message}")]
    ExternalApi {
        status: Option<u16>,
        message: String,
        context: Option<Value>,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl JiraError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ExternalApi { .. } => ErrorKind::ExternalApi,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Response body or other structured detail captured with the failure.
    pub fn context(&self) -> Option<&Value> {
        match self {
            Self::Validation { context, .. } | Self::ExternalApi { context, .. } => {
                context.as_ref()
            }
            _ => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Validation => exit_code::MISUSE,
            ErrorKind::Auth => exit_code::AUTH,
            ErrorKind::Network | ErrorKind::Timeout => exit_code::NETWORK,
            ErrorKind::NotFound => exit_code::NOT_FOUND,
            ErrorKind::ExternalApi | ErrorKind::Config => exit_code::GENERAL,
        }
    }
}

impl From<reqwest::Error> for JiraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
