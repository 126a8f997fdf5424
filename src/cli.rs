use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::AppConfig;
use crate::enhance::claude::ClaudeEnhancer;
use crate::enhance::Enhancer;
use crate::error::JiraError;
use crate::jira::sprint::{my_sprint_tickets, resolve_active_sprints, SprintLookup, SprintStrategy};
use crate::jira::JiraClient;
use crate::pipeline::{create_ticket, EnhancementOutcome, TicketRequest};

fn usage(message: impl Into<String>) -> anyhow::Error {
    JiraError::validation(message).into()
}

/// Dispatches `sre jira <command> ...`.
pub async fn run(args: &[String], config: &AppConfig) -> Result<()> {
    match args {
        [] => {
            print_help();
            Ok(())
        }
        [group, rest @ ..] if group == "jira" => match rest {
            [cmd, rest @ ..] if cmd == "create" => handle_create(rest, config).await,
            [cmd] if cmd == "sprint" => handle_sprint(config).await,
            [cmd] if cmd == "mine" => handle_mine(config).await,
            [cmd, key] if cmd == "show" => handle_show(key, config).await,
            [cmd] if cmd == "whoami" => handle_whoami(config).await,
            [] => {
                print_help();
                Ok(())
            }
            [cmd] if is_help(cmd) => {
                print_help();
                Ok(())
            }
            _ => {
                print_help();
                Err(usage("unknown jira command"))
            }
        },
        [cmd] if is_help(cmd) => {
            print_help();
            Ok(())
        }
        _ => {
            print_help();
            Err(usage(format!("unknown command '{}'", args.join(" "))))
        }
    }
}

fn is_help(arg: &str) -> bool {
    matches!(arg, "help" | "-h" | "--help")
}

#[derive(Debug, Default, PartialEq)]
pub struct CreateArgs {
    pub summary: String,
    pub description: Option<String>,
    pub project: Option<String>,
    pub issue_type: Option<String>,
    pub fields: Map<String, Value>,
    pub ai: bool,
}

impl From<CreateArgs> for TicketRequest {
    fn from(args: CreateArgs) -> Self {
        TicketRequest {
            summary: args.summary,
            description: args.description,
            project: args.project,
            issue_type: args.issue_type,
            custom_fields: args.fields,
            enhance: args.ai,
        }
    }
}

/// Parse `sre jira create` arguments.
///
/// Supported forms:
///   sre jira create Disk full on db-1
///   sre jira create "Disk full" -d "db-1 at 98%" -t Bug -p OPS
///   sre jira create "Disk full" -f 10050='{"id":"7"}' -f epic-link=OPS-1 --ai
pub fn parse_create_args(args: &[String]) -> Result<CreateArgs> {
    let mut parsed = CreateArgs::default();
    let mut summary_parts: Vec<&str> = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--desc" | "--description" => {
                parsed.description = Some(flag_value(&mut iter, arg)?);
            }
            "-p" | "--project" => parsed.project = Some(flag_value(&mut iter, arg)?),
            "-t" | "--type" => parsed.issue_type = Some(flag_value(&mut iter, arg)?),
            "-f" | "--field" => {
                let (key, value) = parse_field(&flag_value(&mut iter, arg)?)?;
                parsed.fields.insert(key, value);
            }
            "--ai" => parsed.ai = true,
            _ => summary_parts.push(arg),
        }
    }

    parsed.summary = summary_parts.join(" ");
    if parsed.summary.trim().is_empty() {
        return Err(usage("Ticket summary cannot be empty"));
    }
    Ok(parsed)
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| usage(format!("Missing value for {flag}")))
}

/// `key=value`, where the value is taken as JSON when it parses and as a
/// plain string otherwise.
fn parse_field(arg: &str) -> Result<(String, Value)> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| usage(format!("Field '{arg}' must look like key=value")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(usage(format!("Field '{arg}' has an empty key")));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

async fn handle_create(args: &[String], config: &AppConfig) -> Result<()> {
    let parsed = parse_create_args(args)?;
    let enhancer = ClaudeEnhancer::new(config.ai.command.clone(), config.ai.debug);
    let enhancer: Option<&dyn Enhancer> = if parsed.ai { Some(&enhancer) } else { None };

    let outcome = create_ticket(&config.jira, parsed.into(), enhancer).await?;

    println!("Created {}: {}", outcome.issue.key, outcome.summary);
    println!("  {}", outcome.url);
    if let EnhancementOutcome::Failed(reason) = &outcome.enhancement {
        eprintln!("warning: AI enhancement skipped: {reason}");
    }
    match &outcome.sprint {
        Some(attachment) if outcome.sprint_attach_failed() => {
            eprintln!(
                "warning: {} was created but could not be added to sprint {}",
                outcome.issue.key, attachment.sprint.name
            );
        }
        Some(attachment) => println!("  Added to sprint {}", attachment.sprint.name),
        None => println!("  No active sprint found"),
    }
    Ok(())
}

fn connect(config: &AppConfig) -> Result<JiraClient> {
    config.jira.require_connection()?;
    Ok(JiraClient::new(&config.jira)?)
}

async fn handle_sprint(config: &AppConfig) -> Result<()> {
    let client = connect(config)?;
    let lookup = resolve_active_sprints(
        &client,
        &config.jira.default_project,
        &config.jira.fallback_board_ids,
    )
    .await?;

    match lookup {
        SprintLookup::NoActiveSprint => println!("No active sprint for {}", config.jira.default_project),
        SprintLookup::Active(resolution) => {
            let source = match resolution.strategy {
                SprintStrategy::ProjectBoards => "project boards",
                SprintStrategy::FallbackBoards => "fallback boards",
            };
            println!(
                "Active sprints ({} boards searched via {source}):",
                resolution.board_count
            );
            let now = chrono::Utc::now();
            for sprint in &resolution.sprints {
                match sprint.days_remaining(now) {
                    Some(days) => println!("  {} {} ({days} days left)", sprint.id, sprint.name),
                    None => println!("  {} {}", sprint.id, sprint.name),
                }
            }
        }
    }
    Ok(())
}

async fn handle_mine(config: &AppConfig) -> Result<()> {
    let client = connect(config)?;
    let Some(tickets) = my_sprint_tickets(&client, &config.jira).await? else {
        println!("No active sprint for {}", config.jira.default_project);
        return Ok(());
    };

    debug!(jql = %tickets.jql, "Searched sprint tickets");
    println!("{} ({} tickets)", tickets.sprint.name, tickets.issues.len());
    for issue in &tickets.issues {
        println!(
            "  {:<12} {:<14} {}",
            issue.key,
            issue.status.as_deref().unwrap_or("-"),
            issue.summary
        );
    }
    Ok(())
}

async fn handle_show(key: &str, config: &AppConfig) -> Result<()> {
    let client = connect(config)?;
    let issue = client
        .get_issue(key)
        .await
        .with_context(|| format!("Failed to fetch {key}"))?;

    println!("{}: {}", issue.key, issue.summary);
    println!("  Status:   {}", issue.status.as_deref().unwrap_or("-"));
    println!("  Priority: {}", issue.priority.as_deref().unwrap_or("-"));
    if let Some(description) = &issue.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

async fn handle_whoami(config: &AppConfig) -> Result<()> {
    let client = connect(config)?;
    let user = client.myself().await?;
    match &user.email_address {
        Some(email) => println!("{} <{email}> ({})", user.display_name, user.account_id),
        None => println!("{} ({})", user.display_name, user.account_id),
    }
    Ok(())
}

pub fn print_help() {
    println!("sre - personal SRE toolbox\n");
    println!("USAGE:");
    println!("  sre jira create <summary>  Create a ticket and add it to the active sprint");
    println!("  sre jira sprint            Show the active sprint(s) for the default project");
    println!("  sre jira mine              List your tickets in the active sprint");
    println!("  sre jira show <KEY>        Show one ticket");
    println!("  sre jira whoami            Check credentials");
    println!();
    println!("CREATE OPTIONS:");
    println!("  -d, --desc <text>          Description");
    println!("  -t, --type <name>          Issue type (default from config)");
    println!("  -p, --project <key>        Project key (default from config)");
    println!("  -f, --field <key=value>    Custom field; key may be an id, digits or alias");
    println!("      --ai                   Rewrite summary and description with AI first");
    println!();
    println!("GLOBAL OPTIONS:");
    println!("      --debug                Trace Jira requests on stderr");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    fn kind(err: &anyhow::Error) -> Option<crate::error::ErrorKind> {
        err.downcast_ref::<JiraError>().map(JiraError::kind)
    }

    #[test]
    fn parse_multi_word_summary() {
        let parsed = parse_create_args(&args(&["Disk", "full", "on", "db-1"])).unwrap();
        assert_eq!(parsed.summary, "Disk full on db-1");
        assert_eq!(parsed.description, None);
        assert!(!parsed.ai);
    }

    #[test]
    fn parse_all_flags() {
        let parsed = parse_create_args(&args(&[
            "Disk full",
            "-d",
            "db-1 at 98%",
            "-t",
            "Bug",
            "--project",
            "OPS",
            "--ai",
        ]))
        .unwrap();
        assert_eq!(parsed.summary, "Disk full");
        assert_eq!(parsed.description.as_deref(), Some("db-1 at 98%"));
        assert_eq!(parsed.issue_type.as_deref(), Some("Bug"));
        assert_eq!(parsed.project.as_deref(), Some("OPS"));
        assert!(parsed.ai);
    }

    #[test]
    fn parse_fields_as_json_or_string() {
        let parsed = parse_create_args(&args(&[
            "Rotate certs",
            "-f",
            r#"10050={"id":"7"}"#,
            "--field",
            "epic-link=OPS-1",
            "-f",
            "customfield_10016=3",
        ]))
        .unwrap();
        assert_eq!(parsed.fields["10050"], json!({ "id": "7" }));
        assert_eq!(parsed.fields["epic-link"], json!("OPS-1"));
        assert_eq!(parsed.fields["customfield_10016"], json!(3));
    }

    #[test]
    fn parse_empty_summary_is_misuse() {
        let err = parse_create_args(&args(&["-d", "only a description"])).unwrap_err();
        assert!(err.to_string().contains("empty"));
        assert_eq!(kind(&err), Some(crate::error::ErrorKind::Validation));
    }

    #[test]
    fn parse_missing_flag_value_fails() {
        let err = parse_create_args(&args(&["Disk full", "-t"])).unwrap_err();
        assert!(err.to_string().contains("Missing value for -t"));
    }

    #[test]
    fn parse_bad_field_arg_fails() {
        assert!(parse_create_args(&args(&["x", "-f", "novalue"])).is_err());
        assert!(parse_create_args(&args(&["x", "-f", "=3"])).is_err());
    }

    #[test]
    fn create_args_become_ticket_request() {
        let parsed = parse_create_args(&args(&["Disk full", "--ai"])).unwrap();
        let request: TicketRequest = parsed.into();
        assert_eq!(request.summary, "Disk full");
        assert!(request.enhance);
    }

    #[tokio::test]
    async fn unknown_command_is_misuse() {
        let err = run(&args(&["jira", "frobnicate"]), &AppConfig::default())
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(crate::error::ErrorKind::Validation));
    }

    #[tokio::test]
    async fn jira_help_is_not_an_error() {
        for help in ["help", "--help", "-h"] {
            run(&args(&["jira", help]), &AppConfig::default()).await.unwrap();
        }
        run(&args(&["jira"]), &AppConfig::default()).await.unwrap();
    }

    #[tokio::test]
    async fn commands_need_connection_settings() {
        let err = run(&args(&["jira", "sprint"]), &AppConfig::default())
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(crate::error::ErrorKind::Config));
    }
}
