//! Ticket creation pipeline.
//!
//! validate → [AI enhance] → sprint detect → build payload → create → sprint attach
//!
//! Validation, configuration and creation failures stop the pipeline and are
//! returned as-is. Enhancement and sprint problems never do: they are recorded
//! on the successful [`TicketOutcome`] instead. Creation and sprint attach are
//! separate remote calls, so a ticket can end up created but outside the
//! sprint.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::JiraConfig;
use crate::enhance::Enhancer;
use crate::error::{JiraError, Result};
use crate::jira::sprint::{add_issue_to_sprint, resolve_active_sprints};
use crate::jira::ticket::create_issue;
use crate::jira::JiraClient;
use crate::model::issue::{CreatedIssue, IssueData};
use crate::model::sprint::Sprint;

#[derive(Debug, Clone, Default)]
pub struct TicketRequest {
    pub summary: String,
    pub description: Option<String>,
    /// Falls back to `default_project` when unset.
    pub project: Option<String>,
    /// Falls back to `default_issue_type` when unset.
    pub issue_type: Option<String>,
    pub custom_fields: Map<String, Value>,
    pub enhance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhancementOutcome {
    NotRequested,
    Applied,
    /// The original text was used.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintAttachment {
    pub sprint: Sprint,
    pub attached: bool,
}

#[derive(Debug, Clone)]
pub struct TicketOutcome {
    pub issue: CreatedIssue,
    pub url: String,
    pub summary: String,
    /// `None` when no active sprint was found.
    pub sprint: Option<SprintAttachment>,
    pub enhancement: EnhancementOutcome,
}

impl TicketOutcome {
    pub fn sprint_attach_failed(&self) -> bool {
        matches!(&self.sprint, Some(attachment) if !attachment.attached)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub async fn create_ticket(
    config: &JiraConfig,
    request: TicketRequest,
    enhancer: Option<&dyn Enhancer>,
) -> Result<TicketOutcome> {
    if request.summary.trim().is_empty() {
        return Err(JiraError::validation("ticket summary is required"));
    }
    config.require_connection()?;
    let client = JiraClient::new(config)?;

    let project = non_blank(request.project.as_deref())
        .unwrap_or(&config.default_project)
        .to_string();
    let issue_type = non_blank(request.issue_type.as_deref())
        .unwrap_or(&config.default_issue_type)
        .to_string();

    let mut summary = request.summary.trim().to_string();
    let mut description = request.description.clone();
    let enhancement = match (request.enhance, enhancer) {
        (false, _) => EnhancementOutcome::NotRequested,
        (true, None) => EnhancementOutcome::Failed("no AI enhancer configured".into()),
        (true, Some(enhancer)) => {
            let result = enhancer.enhance(&summary, description.as_deref()).await;
            match result {
                Ok(enhanced) if enhanced.title.trim().is_empty() => {
                    warn!(enhancer = enhancer.name(), "AI enhancement returned a blank title, using original text");
                    EnhancementOutcome::Failed("enhancer returned a blank title".into())
                }
                Ok(enhanced) => {
                    info!(enhancer = enhancer.name(), "Applied AI enhancement");
                    summary = enhanced.title.trim().to_string();
                    if !enhanced.description.trim().is_empty() {
                        description = Some(enhanced.description);
                    }
                    EnhancementOutcome::Applied
                }
                Err(e) => {
                    warn!(enhancer = enhancer.name(), error = %e, "AI enhancement failed, using original text");
                    EnhancementOutcome::Failed(format!("{e:#}"))
                }
            }
        }
    };

    let sprint = match resolve_active_sprints(&client, &project, &config.fallback_board_ids).await {
        Ok(lookup) => lookup.selected().cloned(),
        Err(e) => {
            warn!(project = %project, error = %e, "Sprint detection failed, creating without sprint");
            None
        }
    };

    let data = IssueData {
        project,
        issue_type,
        summary: summary.clone(),
        description,
        custom_fields: request.custom_fields,
    };
    let issue = create_issue(&client, &data, &config.field_mappings).await?;

    let sprint = match sprint {
        Some(sprint) => {
            let attached = add_issue_to_sprint(&client, sprint.id, &issue.key).await;
            Some(SprintAttachment { sprint, attached })
        }
        None => None,
    };

    Ok(TicketOutcome {
        url: issue.browse_url(client.base_url()),
        issue,
        summary,
        sprint,
        enhancement,
    })
}
