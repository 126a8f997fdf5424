mod cli;
mod config;
mod enhance;
mod error;
mod jira;
mod logging;
mod model;
mod pipeline;
mod util;

use std::process::ExitCode;

use error::{exit_code, JiraError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let debug_flag = take_flag(&mut args, "--debug");

    match run(args, debug_flag).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let jira_err = e.downcast_ref::<JiraError>();
            if let Some(detail) = jira_err.and_then(|err| error_detail(err, debug_flag)) {
                eprintln!("{detail}");
            }
            let code = jira_err.map(JiraError::exit_code).unwrap_or(exit_code::GENERAL);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Vec<String>, debug_flag: bool) -> anyhow::Result<()> {
    let mut config = config::load_config()?;
    config.jira.debug |= debug_flag;
    config.ai.debug |= debug_flag;

    // Tracing is best effort; a failed init must not block the command.
    if let Err(e) = logging::init(config.jira.debug || config.ai.debug) {
        eprintln!("warning: {e}");
    }

    cli::run(&args, &config).await
}

/// The response body captured with a Jira failure, shown only with `--debug`.
fn error_detail(err: &JiraError, debug: bool) -> Option<String> {
    if !debug {
        return None;
    }
    err.context()
        .map(|context| serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string()))
}

/// Removes every occurrence of `flag` and reports whether it was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn take_flag_strips_every_occurrence() {
        let mut args: Vec<String> = ["--debug", "jira", "sprint", "--debug"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(take_flag(&mut args, "--debug"));
        assert_eq!(args, vec!["jira", "sprint"]);
        assert!(!take_flag(&mut args, "--debug"));
    }

    #[test]
    fn error_detail_needs_debug_and_context() {
        let err = JiraError::ExternalApi {
            status: Some(400),
            message: "bad".into(),
            context: Some(json!({ "errorMessages": ["bad"] })),
        };
        assert_eq!(error_detail(&err, false), None);
        assert!(error_detail(&err, true).unwrap().contains("errorMessages"));
        assert_eq!(error_detail(&JiraError::Auth("x".into()), true), None);
    }
}
