use std::time::Duration;

use base64::Engine;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::ticket_id::TicketId;
use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::model::issue::IssueSummary;
use crate::util::adf::extract_text_from_adf;

const CORE_API: &str = "/rest/api/3";
const AGILE_API: &str = "/rest/agile/1.0";
/// Response bodies longer than this are cut in debug traces.
const TRACE_BODY_LIMIT: usize = 2000;

/// Atlassian's per-request correlation id, quoted when reporting failures.
const REQUEST_ID_HEADER: &str = "x-arequestid";

const SUMMARY_FIELDS: &[&str] = &["summary", "status", "priority", "description"];

/// Which REST family a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Core,
    Agile,
}

impl Api {
    fn prefix(self) -> &'static str {
        match self {
            Api::Core => CORE_API,
            Api::Agile => AGILE_API,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Overrides the client-wide timeout for this request only.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw outcome of a request. Non-2xx statuses are data here, not errors.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub account_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Deserialize, Default)]
struct IssueFields {
    summary: Option<String>,
    description: Option<Value>,
    status: Option<NamedField>,
    priority: Option<NamedField>,
}

#[derive(Deserialize)]
struct NamedField {
    name: String,
}

impl From<JiraIssue> for IssueSummary {
    fn from(issue: JiraIssue) -> Self {
        IssueSummary {
            key: issue.key,
            summary: issue.fields.summary.unwrap_or_default(),
            status: issue.fields.status.map(|s| s.name),
            priority: issue.fields.priority.map(|p| p.name),
            description: issue
                .fields
                .description
                .as_ref()
                .and_then(extract_text_from_adf),
        }
    }
}

/// Builds the `Basic` authorization header value from `username:token`.
pub fn basic_auth_header(username: &str, token: &str) -> Result<String> {
    if username.trim().is_empty() {
        return Err(JiraError::Config("jira username is blank".into()));
    }
    if token.trim().is_empty() {
        return Err(JiraError::Config("jira api token is blank".into()));
    }
    let creds = format!("{username}:{token}");
    let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
    Ok(format!("Basic {encoded}"))
}

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
    timeout: Duration,
    debug: bool,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(JiraError::Config("jira base_url is blank".into()));
        }
        let auth_header = basic_auth_header(&config.username, &config.api_token)?;
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JiraError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            auth_header,
            client,
            timeout,
            debug: config.debug,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client-wide timeout from `timeout_secs`.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, api: Api, path: &str) -> String {
        format!("{}{}{}", self.base_url, api.prefix(), path)
    }

    /// Sends one request and decodes the body as JSON when there is one.
    ///
    /// Only transport failures become errors; status classification is left
    /// to the caller.
    pub async fn request(
        &self,
        method: Method,
        api: Api,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.url(api, path);

        if self.debug {
            debug!(
                method = %method,
                url = %url,
                query = ?options.query,
                body = %options.body.as_ref().map(|b| b.to_string()).unwrap_or_default(),
                "jira request"
            );
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, "application/json");
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if self.debug {
            debug!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                body = %truncate_for_trace(&text),
                "jira response"
            );
        }

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, api: Api, path: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.request(Method::GET, api, path, options).await
    }

    pub async fn post(&self, api: Api, path: &str, body: Value) -> Result<ApiResponse> {
        self.request(Method::POST, api, path, RequestOptions::default().json(body))
            .await
    }

    /// `GET /myself`, which doubles as a credentials check.
    pub async fn myself(&self) -> Result<CurrentUser> {
        let response = self.get(Api::Core, "/myself", RequestOptions::default()).await?;
        let body = expect_success(response, "current user")?;
        decode(body, "current user")
    }

    pub async fn get_issue(&self, key: &str) -> Result<IssueSummary> {
        let ticket = TicketId::parse(key)
            .ok_or_else(|| JiraError::validation(format!("'{key}' is not a ticket key like ABC-123")))?;
        debug!(project = %ticket.project, number = %ticket.number, "Fetching issue");
        let path = format!("/issue/{}", urlencoding::encode(&ticket.full));
        let options = RequestOptions::default().query("fields", SUMMARY_FIELDS.join(","));
        let response = self.get(Api::Core, &path, options).await?;
        let body = expect_success(response, &format!("issue {}", ticket.full))?;
        let issue: JiraIssue = decode(body, "issue")?;
        Ok(issue.into())
    }

    /// `POST /search/jql`.
    pub async fn search(&self, jql: &str, max_results: u32) -> Result<Vec<IssueSummary>> {
        let body = json!({
            "jql": jql,
            "fields": SUMMARY_FIELDS,
            "maxResults": max_results,
        });
        let response = self.post(Api::Core, "/search/jql", body).await?;
        let body = expect_success(response, "search")?;
        let search: SearchResponse = decode(body, "search response")?;
        Ok(search.issues.into_iter().map(IssueSummary::from).collect())
    }
}

/// Maps the common failure statuses of read endpoints onto error kinds.
fn expect_success(response: ApiResponse, what: &str) -> Result<Value> {
    match response.status {
        _ if response.is_success() => Ok(response.body.unwrap_or(Value::Null)),
        StatusCode::UNAUTHORIZED => Err(JiraError::Auth("check your Jira credentials".into())),
        StatusCode::NOT_FOUND => Err(JiraError::NotFound(what.to_string())),
        status => Err(JiraError::ExternalApi {
            status: Some(status.as_u16()),
            message: api_error_message(response.body.as_ref())
                .unwrap_or_else(|| reason(status)),
            context: response.body,
        }),
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value, what: &str) -> Result<T> {
    serde_json::from_value(body).map_err(|e| JiraError::ExternalApi {
        status: None,
        message: format!("unexpected {what} payload: {e}"),
        context: None,
    })
}

/// Joins Jira's `errorMessages` list and `errors` map into one line.
pub(crate) fn api_error_message(body: Option<&Value>) -> Option<String> {
    let body = body?;
    let mut parts: Vec<String> = body
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|msgs| msgs.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    if let Some(errors) = body.get("errors").and_then(Value::as_object) {
        for (field, msg) in errors {
            let msg = msg.as_str().map(String::from).unwrap_or_else(|| msg.to_string());
            parts.push(format!("{field}: {msg}"));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

pub(crate) fn reason(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn truncate_for_trace(text: &str) -> String {
    let total = text.chars().count();
    if total <= TRACE_BODY_LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(TRACE_BODY_LIMIT).collect();
    format!("{head}... ({} more chars)", total - TRACE_BODY_LIMIT)
}
