//! Tolerant JSON extraction from advisory model output
//!
//! Model answers may be bare JSON, JSON inside a markdown fence, or JSON
//! embedded in narrative text.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub struct ResponseParser;

impl ResponseParser {
    /// Parse a JSON value out of model output.
    ///
    /// Tried in order: the whole trimmed text, a ```json fence, any fence,
    /// then the first JSON object or array embedded in the text.
    pub fn parse_json<T: DeserializeOwned>(content: &str) -> Option<T> {
        let trimmed = content.trim();
        if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
            return Some(parsed);
        }

        let candidates = [
            Self::extract_fenced_block(trimmed, Some("json")),
            Self::extract_fenced_block(trimmed, None),
            Self::extract_first_json_value(trimmed),
        ];

        candidates
            .into_iter()
            .flatten()
            .find_map(|json| serde_json::from_str::<T>(&json).ok())
    }

    /// Numeric `confidence` field from a JSON answer, if the model gave one
    pub fn confidence(content: &str) -> Option<f64> {
        let value: Value = Self::parse_json(content)?;
        match value.get("confidence")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        }
    }

    /// Ecosystem insights as a JSON object. Text that carries no object is kept
    /// verbatim under `assessment`.
    pub fn insights(content: &str) -> Map<String, Value> {
        match Self::parse_json::<Value>(content) {
            Some(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert(
                    "assessment".to_string(),
                    Value::String(content.trim().to_string()),
                );
                map
            }
        }
    }

    /// Extract the first valid JSON value (object or array) from text
    pub fn extract_first_json_value(content: &str) -> Option<String> {
        for (idx, ch) in content.char_indices() {
            if ch == '{' || ch == '[' {
                let candidate = &content[idx..];
                let mut de = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
                if let Some(Ok(_)) = de.next() {
                    let end = de.byte_offset();
                    if end > 0 && end <= candidate.len() {
                        return Some(candidate[..end].to_string());
                    }
                }
            }
        }
        None
    }

    fn extract_fenced_block(content: &str, language: Option<&str>) -> Option<String> {
        let fence = "```";
        let mut search = content;

        loop {
            let start = search.find(fence)?;
            let after_start = &search[start + fence.len()..];
            let line_end = after_start.find('\n')?;
            let lang_tag = after_start[..line_end].trim();
            let rest = &after_start[line_end + 1..];

            match language {
                Some(expected) if !lang_tag.eq_ignore_ascii_case(expected) => {
                    // Skip past this block's closing fence
                    let close = rest.find(fence)?;
                    search = &rest[close + fence.len()..];
                }
                _ => {
                    let end = rest.find(fence)?;
                    return Some(rest[..end].trim().to_string());
                }
            }
        }
    }
}
