use serde_json::{json, Value};

/// Extract plain text from Jira's Atlassian Document Format (ADF).
pub fn extract_text_from_adf(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(arr) => {
            let parts: Vec<String> = arr.iter().filter_map(extract_text_from_adf).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        Value::Object(obj) => {
            if obj.get("type").and_then(|v| v.as_str()) == Some("text") {
                return obj.get("text").and_then(|v| v.as_str()).map(String::from);
            }
            if let Some(content) = obj.get("content") {
                return extract_text_from_adf(content);
            }
            None
        }
        _ => None,
    }
}

/// Wrap plain text in an ADF document, one paragraph per blank-line block.
pub fn text_to_adf(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": p }],
            })
        })
        .collect();

    json!({
        "type": "doc",
        "version": 1,
        "content": paragraphs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_paragraph_per_block() {
        let doc = text_to_adf("First line\n\nSecond block\n\n\n");
        let content = doc["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[1]["content"][0]["text"], "Second block");
        assert_eq!(doc["type"], "doc");
    }

    #[test]
    fn empty_text_gives_empty_doc() {
        let doc = text_to_adf("   ");
        assert!(doc["content"].as_array().unwrap().is_empty());
        assert_eq!(extract_text_from_adf(&doc), None);
    }

    #[test]
    fn extracts_text_back_out() {
        let doc = text_to_adf("Disk full on db-1\n\nPage the on-call");
        assert_eq!(
            extract_text_from_adf(&doc).as_deref(),
            Some("Disk full on db-1 Page the on-call")
        );
    }
}
