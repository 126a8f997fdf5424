use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A Jira issue key such as `OPS-123`, with the project prefix uppercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketId {
    pub project: String,
    pub number: String,
    pub full: String,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^([A-Z][A-Z0-9]*)-(\d+)$").expect("ticket key pattern is valid")
    })
}

impl TicketId {
    pub fn parse(input: &str) -> Option<Self> {
        let caps = pattern().captures(input.trim())?;
        let project = caps[1].to_ascii_uppercase();
        let number = caps[2].to_string();
        Some(Self {
            full: format!("{project}-{number}"),
            project,
            number,
        })
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}
