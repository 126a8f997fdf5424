use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    #[serde(rename = "endDate", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Sprint {
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// Whole days left until the sprint ends, negative once it is overdue.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.ends_at().map(|end| (end - now).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprint(end_date: Option<&str>) -> Sprint {
        Sprint {
            id: 55,
            name: "Sprint 7".into(),
            end_date: end_date.map(String::from),
        }
    }

    #[test]
    fn parses_jira_end_date() {
        let s = sprint(Some("2026-10-20T09:00:00.000Z"));
        let now = DateTime::parse_from_rfc3339("2026-10-16T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(s.days_remaining(now), Some(4));
    }

    #[test]
    fn unparseable_end_date_is_ignored() {
        assert_eq!(sprint(Some("next tuesday")).ends_at(), None);
        assert_eq!(sprint(None).ends_at(), None);
    }

    #[test]
    fn deserializes_agile_payload() {
        let s: Sprint = serde_json::from_str(
            r#"{"id": 55, "name": "Sprint 7", "state": "active", "endDate": "2026-10-20T09:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(s.id, 55);
        assert!(s.end_date.is_some());
    }
}
