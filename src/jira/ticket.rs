use std::collections::HashMap;

use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::info;

use super::client::{api_error_message, reason, Api, ApiResponse, JiraClient};
use super::fields::prepare_fields;
use crate::error::{JiraError, Result};
use crate::model::issue::{CreatedIssue, IssueData};
use crate::util::adf::text_to_adf;

/// Builds the `POST /issue` body. Custom fields are normalised and formatted;
/// the standard fields are written as given.
pub fn build_payload(data: &IssueData, field_mappings: &HashMap<String, String>) -> Value {
    let mut fields: Map<String, Value> = prepare_fields(&data.custom_fields, field_mappings);

    fields.insert("project".into(), json!({ "key": data.project }));
    fields.insert("issuetype".into(), json!({ "name": data.issue_type }));
    fields.insert("summary".into(), json!(data.summary));
    if let Some(description) = data.description.as_deref().filter(|d| !d.trim().is_empty()) {
        fields.insert("description".into(), text_to_adf(description));
    }

    json!({ "fields": fields })
}

pub fn classify_create_response(response: ApiResponse) -> Result<CreatedIssue> {
    match response.status {
        StatusCode::CREATED => {
            let body = response.body.unwrap_or(Value::Null);
            let field = |name: &str| body.get(name).and_then(Value::as_str).map(String::from);
            match (field("key"), field("id")) {
                (Some(key), Some(id)) => Ok(CreatedIssue { key, id }),
                _ => Err(JiraError::ExternalApi {
                    status: Some(StatusCode::CREATED.as_u16()),
                    message: "created issue response is missing key or id".into(),
                    context: Some(body),
                }),
            }
        }
        StatusCode::BAD_REQUEST => Err(JiraError::Validation {
            message: api_error_message(response.body.as_ref())
                .unwrap_or_else(|| "Jira rejected the issue".into()),
            context: response.body,
        }),
        StatusCode::UNAUTHORIZED => Err(JiraError::Auth("check your Jira credentials".into())),
        status => Err(JiraError::ExternalApi {
            status: Some(status.as_u16()),
            message: api_error_message(response.body.as_ref()).unwrap_or_else(|| reason(status)),
            context: response.body,
        }),
    }
}

pub async fn create_issue(
    client: &JiraClient,
    data: &IssueData,
    field_mappings: &HashMap<String, String>,
) -> Result<CreatedIssue> {
    let payload = build_payload(data, field_mappings);
    let response = client.post(Api::Core, "/issue", payload).await?;
    let created = classify_create_response(response)?;
    info!(key = %created.key, id = %created.id, project = %data.project, "Created Jira issue");
    Ok(created)
}
