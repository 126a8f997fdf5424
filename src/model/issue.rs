use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything needed to create one issue.
#[derive(Debug, Clone, Default)]
pub struct IssueData {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: Option<String>,
    /// Caller-supplied custom fields, keyed by id, bare digits or alias.
    pub custom_fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub key: String,
    pub id: String,
}

impl CreatedIssue {
    pub fn browse_url(&self, base_url: &str) -> String {
        format!("{}/browse/{}", base_url.trim_end_matches('/'), self.key)
    }
}

/// One row of a search result.
#[derive(Debug, Clone, Serialize)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
