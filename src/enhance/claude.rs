use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tracing::debug;

use super::{Enhancement, Enhancer};

/// Runs a `claude -p` style CLI and reads a JSON `{title, description}` reply.
pub struct ClaudeEnhancer {
    command: String,
    debug: bool,
}

impl ClaudeEnhancer {
    pub fn new(command: String, debug: bool) -> Self {
        Self { command, debug }
    }
}

pub fn build_prompt(title: &str, description: Option<&str>) -> String {
    format!(
        r#"Rewrite this Jira ticket so an on-call engineer can act on it.

# {title}

## Description
{description}

Reply with only a JSON object: {{"title": "...", "description": "..."}}.
Keep the title under 80 characters. Do not invent facts."#,
        description = description.unwrap_or("No description provided."),
    )
}

/// Pulls the first `{...}` block out of the reply and decodes it.
pub fn parse_enhancement(output: &str) -> Result<Enhancement> {
    let start = output.find('{').context("No JSON object in AI reply")?;
    let end = output.rfind('}').context("No JSON object in AI reply")?;
    if end < start {
        bail!("Malformed JSON object in AI reply");
    }
    let enhancement: Enhancement =
        serde_json::from_str(&output[start..=end]).context("Failed to parse AI reply")?;
    if enhancement.title.trim().is_empty() {
        bail!("AI reply has an empty title");
    }
    Ok(enhancement)
}

#[async_trait]
impl Enhancer for ClaudeEnhancer {
    fn name(&self) -> &str {
        &self.command
    }

    async fn enhance(&self, title: &str, description: Option<&str>) -> Result<Enhancement> {
        let prompt = build_prompt(title, description);
        let output = tokio::process::Command::new(&self.command)
            .args(["-p", &prompt])
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.command))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if self.debug {
            debug!(command = %self.command, status = %output.status, reply = %stdout, "AI reply");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} failed: {}", self.command, stderr.trim());
        }

        parse_enhancement(&stdout)
    }
}
