//! Lenient readers for the backends' loosely typed JSON documents.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Accept an identifier serialized either as a string or a number.
pub fn id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Read a text field. Numbers are rendered, blanks and placeholders are dropped.
pub fn text(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "N/A").then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read an integer field, accepting numeric strings.
pub fn integer(data: &Map<String, Value>, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a list of strings; a single comma-separated string is split.
pub fn list(data: &Map<String, Value>, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse an RFC 3339 timestamp; one without an offset is taken as UTC.
pub fn timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn text_skips_placeholders() {
        let d = data(json!({"Tier": "N/A", "Name": " IIT Delhi ", "Code": 12}));
        assert_eq!(text(&d, "Tier"), None);
        assert_eq!(text(&d, "Name").as_deref(), Some("IIT Delhi"));
        assert_eq!(text(&d, "Code").as_deref(), Some("12"));
    }

    #[test]
    fn integer_parses_strings() {
        let d = data(json!({"Seats": "1209", "Year": 1961, "Bad": "many"}));
        assert_eq!(integer(&d, "Seats"), Some(1209));
        assert_eq!(integer(&d, "Year"), Some(1961));
        assert_eq!(integer(&d, "Bad"), None);
    }

    #[test]
    fn list_splits_commas() {
        let d = data(json!({"A": ["CSE", "EE"], "B": "CSE, ME ,"}));
        assert_eq!(list(&d, "A"), vec!["CSE", "EE"]);
        assert_eq!(list(&d, "B"), vec!["CSE", "ME"]);
        assert!(list(&d, "C").is_empty());
    }

    #[test]
    fn timestamp_accepts_missing_offset() {
        let with_offset = timestamp("2025-06-01T10:00:00+05:30").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2025-06-01T04:30:00+00:00");
        let naive = timestamp("2025-06-01T10:00:00.5").unwrap();
        assert_eq!(naive.timestamp(), 1748772000);
        assert!(timestamp("tomorrow").is_none());
    }
}
