//! Active sprint discovery.
//!
//! Boards for the project are discovered first and each is asked for its
//! active sprints. Only when that finds nothing are the configured fallback
//! boards tried. Every call is awaited in turn; boards are never queried
//! concurrently. Sprints reachable from several boards are reported once, in
//! first-seen order.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::client::{Api, ApiResponse, JiraClient, RequestOptions};
use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::model::issue::IssueSummary;
use crate::model::sprint::{Board, Sprint};

const BOARD_PAGE_SIZE: u32 = 50;
const MY_TICKETS_LIMIT: u32 = 50;
/// Upper bound for each board and sprint query.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprintStrategy {
    ProjectBoards,
    FallbackBoards,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintResolution {
    /// Deduplicated by id, in first-seen order.
    pub sprints: Vec<Sprint>,
    pub board_count: usize,
    pub strategy: SprintStrategy,
}

impl SprintResolution {
    /// First sprint in discovery order.
    pub fn selected(&self) -> Option<&Sprint> {
        self.sprints.first()
    }
}

/// Outcome of a resolution pass. Finding no sprint is a valid answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SprintLookup {
    Active(SprintResolution),
    NoActiveSprint,
}

impl SprintLookup {
    pub fn selected(&self) -> Option<&Sprint> {
        match self {
            SprintLookup::Active(resolution) => resolution.selected(),
            SprintLookup::NoActiveSprint => None,
        }
    }
}

fn lookup_options(client: &JiraClient) -> RequestOptions {
    RequestOptions::default().timeout(client.timeout().min(LOOKUP_TIMEOUT))
}

/// Decodes the `values` of an agile page entry by entry. Entries of the wrong
/// shape are skipped with a warning; a body that is not a page at all is an
/// API error.
fn page_values<T: DeserializeOwned>(response: ApiResponse, what: &str) -> Result<Vec<T>> {
    let status = response.status.as_u16();
    let entries = match response.body {
        None => Vec::new(),
        Some(Value::Object(mut page)) => match page.remove("values") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                page.insert("values".into(), other);
                return Err(unexpected_page(status, what, Value::Object(page)));
            }
        },
        Some(other) => return Err(unexpected_page(status, what, other)),
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match T::deserialize(&entry) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(what, error = %e, entry = %entry, "Skipping malformed entry");
                None
            }
        })
        .collect())
}

fn unexpected_page(status: u16, what: &str, body: Value) -> JiraError {
    JiraError::ExternalApi {
        status: Some(status),
        message: format!("unexpected {what} payload"),
        context: Some(body),
    }
}

pub async fn list_boards(client: &JiraClient, project_key: &str) -> Result<Vec<Board>> {
    let options = lookup_options(client)
        .query("projectKeyOrId", project_key)
        .query("maxResults", BOARD_PAGE_SIZE);
    let response = client.get(Api::Agile, "/board", options).await?;

    if response.is_success() {
        return page_values(response, "board");
    }
    match response.status {
        StatusCode::UNAUTHORIZED => Err(JiraError::Auth("check your Jira credentials".into())),
        status => {
            warn!(
                project = %project_key,
                status = status.as_u16(),
                request_id = response.request_id().unwrap_or("-"),
                "Board lookup failed"
            );
            Ok(Vec::new())
        }
    }
}

/// Active sprints on one board. Boards without sprint support answer with an
/// error status and are treated as having none.
async fn active_sprints(client: &JiraClient, board_id: u64) -> Result<Vec<Sprint>> {
    let path = format!("/board/{board_id}/sprint");
    let options = lookup_options(client).query("state", "active");
    let response = client.get(Api::Agile, &path, options).await?;

    if response.is_success() {
        return page_values(response, "sprint");
    }
    match response.status {
        StatusCode::UNAUTHORIZED => Err(JiraError::Auth("check your Jira credentials".into())),
        status => {
            debug!(board_id, status = status.as_u16(), "Skipping board without active sprints");
            Ok(Vec::new())
        }
    }
}

pub fn dedupe_sprints(sprints: Vec<Sprint>) -> Vec<Sprint> {
    let mut seen = HashSet::new();
    sprints.into_iter().filter(|s| seen.insert(s.id)).collect()
}

async fn collect_active_sprints(client: &JiraClient, board_ids: &[u64]) -> Result<Vec<Sprint>> {
    let mut all = Vec::new();
    for &board_id in board_ids {
        all.extend(active_sprints(client, board_id).await?);
    }
    Ok(dedupe_sprints(all))
}

pub async fn resolve_active_sprints(
    client: &JiraClient,
    project_key: &str,
    fallback_board_ids: &[u64],
) -> Result<SprintLookup> {
    let boards = list_boards(client, project_key).await?;
    let board_ids: Vec<u64> = boards.iter().map(|b| b.id).collect();
    let board_names: Vec<&str> = boards.iter().map(|b| b.name.as_str()).collect();
    debug!(project = %project_key, boards = ?board_names, "Discovered boards");

    let sprints = collect_active_sprints(client, &board_ids).await?;
    if !sprints.is_empty() {
        info!(project = %project_key, sprints = sprints.len(), "Found active sprints");
        return Ok(SprintLookup::Active(SprintResolution {
            sprints,
            board_count: board_ids.len(),
            strategy: SprintStrategy::ProjectBoards,
        }));
    }

    if fallback_board_ids.is_empty() {
        return Ok(SprintLookup::NoActiveSprint);
    }

    debug!(boards = ?fallback_board_ids, "No sprint on project boards, trying fallback boards");
    let sprints = collect_active_sprints(client, fallback_board_ids).await?;
    if sprints.is_empty() {
        return Ok(SprintLookup::NoActiveSprint);
    }

    info!(sprints = sprints.len(), "Found active sprints on fallback boards");
    Ok(SprintLookup::Active(SprintResolution {
        sprints,
        board_count: fallback_board_ids.len(),
        strategy: SprintStrategy::FallbackBoards,
    }))
}

fn quote_jql(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// JQL for the current user's tickets in a sprint, highest priority first.
pub fn build_my_sprint_jql(sprint_id: u64, show_done: bool, excluded_statuses: &[String]) -> String {
    let mut jql = format!("assignee = currentUser() AND sprint = {sprint_id}");
    if !show_done && !excluded_statuses.is_empty() {
        let statuses: Vec<String> = excluded_statuses.iter().map(|s| quote_jql(s)).collect();
        jql.push_str(&format!(" AND status NOT IN ({})", statuses.join(", ")));
    }
    jql.push_str(" ORDER BY priority DESC");
    jql
}

/// Moves an issue into a sprint. Only `204 No Content` counts as success.
pub async fn add_issue_to_sprint(client: &JiraClient, sprint_id: u64, issue_key: &str) -> bool {
    let path = format!("/sprint/{sprint_id}/issue");
    let body = json!({ "issues": [issue_key] });

    match client.post(Api::Agile, &path, body).await {
        Ok(response) if response.status == StatusCode::NO_CONTENT => {
            info!(sprint_id, issue = %issue_key, "Added issue to sprint");
            true
        }
        Ok(response) => {
            warn!(
                sprint_id,
                issue = %issue_key,
                status = response.status.as_u16(),
                request_id = response.request_id().unwrap_or("-"),
                "Sprint attach rejected"
            );
            false
        }
        Err(e) => {
            warn!(sprint_id, issue = %issue_key, error = %e, "Sprint attach failed");
            false
        }
    }
}

#[derive(Debug, Clone)]
pub struct SprintTickets {
    pub sprint: Sprint,
    pub jql: String,
    pub issues: Vec<IssueSummary>,
}

/// The user's own tickets in the current sprint, or `None` without one.
pub async fn my_sprint_tickets(client: &JiraClient, config: &JiraConfig) -> Result<Option<SprintTickets>> {
    let lookup =
        resolve_active_sprints(client, &config.default_project, &config.fallback_board_ids).await?;
    let Some(sprint) = lookup.selected().cloned() else {
        return Ok(None);
    };

    let jql = build_my_sprint_jql(
        sprint.id,
        config.sprint_show_done_tickets,
        &config.sprint_exclude_statuses,
    );
    let issues = client.search(&jql, MY_TICKETS_LIMIT).await?;

    Ok(Some(SprintTickets { sprint, jql, issues }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn ok(body: Option<Value>) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
        }
    }

    fn sprint(id: u64, name: &str) -> Sprint {
        Sprint {
            id,
            name: name.into(),
            end_date: None,
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let sprints = vec![
            sprint(55, "Sprint 7"),
            sprint(60, "Platform 3"),
            sprint(55, "Sprint 7 (board B)"),
        ];
        let deduped = dedupe_sprints(sprints);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "Sprint 7");
        assert_eq!(deduped[1].id, 60);
    }

    #[test]
    fn jql_excludes_configured_statuses() {
        let jql = build_my_sprint_jql(55, false, &["Done".to_string()]);
        assert!(jql.contains("AND sprint = 55"));
        assert!(jql.contains(r#"AND status NOT IN ("Done")"#));
        assert!(jql.starts_with("assignee = currentUser()"));
        assert!(jql.ends_with("ORDER BY priority DESC"));
    }

    #[test]
    fn jql_shows_done_tickets_when_asked() {
        let jql = build_my_sprint_jql(55, true, &["Done".to_string()]);
        assert!(jql.contains("AND sprint = 55"));
        assert!(!jql.contains("status NOT IN"));
    }

    #[test]
    fn jql_lists_every_excluded_status() {
        let excluded = vec!["Done".to_string(), "Won't \"Fix\"".to_string()];
        let jql = build_my_sprint_jql(7, false, &excluded);
        assert!(jql.contains(r#"status NOT IN ("Done", "Won't \"Fix\"")"#));
    }

    #[test]
    fn jql_omits_clause_for_empty_exclusions() {
        let jql = build_my_sprint_jql(7, false, &[]);
        assert_eq!(jql, "assignee = currentUser() AND sprint = 7 ORDER BY priority DESC");
    }

    #[test]
    fn lookup_selects_first_sprint() {
        let lookup = SprintLookup::Active(SprintResolution {
            sprints: vec![sprint(3, "a"), sprint(1, "b")],
            board_count: 1,
            strategy: SprintStrategy::ProjectBoards,
        });
        assert_eq!(lookup.selected().map(|s| s.id), Some(3));
        assert_eq!(SprintLookup::NoActiveSprint.selected(), None);
    }

    #[test]
    fn malformed_entries_are_skipped_individually() {
        let body = json!({ "values": [{ "id": 55, "name": "Sprint 7" }, { "id": 56 }] });
        let sprints: Vec<Sprint> = page_values(ok(Some(body)), "sprint").unwrap();
        assert_eq!(sprints, vec![sprint(55, "Sprint 7")]);
    }

    #[test]
    fn missing_values_is_an_empty_page() {
        let boards: Vec<Board> = page_values(ok(Some(json!({ "total": 0 }))), "board").unwrap();
        assert!(boards.is_empty());
        let boards: Vec<Board> = page_values(ok(None), "board").unwrap();
        assert!(boards.is_empty());
    }

    #[test]
    fn non_page_body_is_an_api_error() {
        let err = page_values::<Sprint>(ok(Some(json!("maintenance"))), "sprint").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ExternalApi);
        assert!(err.to_string().contains("unexpected sprint payload"));
        assert_eq!(err.context(), Some(&json!("maintenance")));

        let err = page_values::<Board>(ok(Some(json!({ "values": 3 }))), "board").unwrap_err();
        assert_eq!(err.context(), Some(&json!({ "values": 3 })));
    }
}
