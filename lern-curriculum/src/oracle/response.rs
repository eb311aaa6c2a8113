//! Strict oracle response schemas
//!
//! The oracle is told to answer with one JSON object. A single Markdown code
//! fence around the object (```` ```json ```` … ```` ``` ````) is tolerated;
//! anything else around or inside the object that does not match the
//! expected shape is a contract violation, never silently coerced.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Response parsed but does not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleContractError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Unterminated or malformed code fence")]
    MalformedFence,

    #[error("Missing required key '{0}'")]
    MissingKey(String),

    #[error("Key '{key}' has wrong type: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Unexpected value for '{key}': {value}")]
    UnexpectedValue { key: String, value: String },
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Remove one enclosing code fence, if present
fn strip_code_fence(raw: &str) -> Result<&str, OracleContractError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return Ok(trimmed);
    }

    let (opening, rest) = trimmed
        .split_once('\n')
        .ok_or(OracleContractError::MalformedFence)?;
    let language = opening.trim_start_matches("```").trim();
    if !(language.is_empty() || language.eq_ignore_ascii_case("json")) {
        return Err(OracleContractError::MalformedFence);
    }

    let body = rest
        .trim_end()
        .strip_suffix("```")
        .ok_or(OracleContractError::MalformedFence)?;

    Ok(body.trim())
}

/// Parse raw oracle text into a JSON object
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, OracleContractError> {
    let body = strip_code_fence(raw)?;
    let value: Value =
        serde_json::from_str(body).map_err(|e| OracleContractError::InvalidJson(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(OracleContractError::NotAnObject(json_type_name(&other))),
    }
}

fn required<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a Value, OracleContractError> {
    map.get(key)
        .ok_or_else(|| OracleContractError::MissingKey(key.to_string()))
}

fn optional_text(map: &Map<String, Value>, key: &str) -> Result<Option<String>, OracleContractError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(OracleContractError::WrongType {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

// ============================================================================
// Linking: {"<content id>": <node id> | null, ...}
// ============================================================================

/// Content id → assigned node id (None = no fitting node)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAssignments(pub BTreeMap<i64, Option<i64>>);

impl LinkAssignments {
    pub fn parse(raw: &str) -> Result<Self, OracleContractError> {
        let map = extract_json_object(raw)?;
        let mut assignments = BTreeMap::new();

        for (key, value) in map {
            let content_id: i64 = key.trim().parse().map_err(|_| OracleContractError::UnexpectedValue {
                key: key.clone(),
                value: "content id keys must be integers".to_string(),
            })?;

            let node_id = match value {
                Value::Null => None,
                Value::Number(ref n) => Some(n.as_i64().ok_or_else(|| OracleContractError::WrongType {
                    key: key.clone(),
                    expected: "integer node id or null",
                })?),
                _ => {
                    return Err(OracleContractError::WrongType {
                        key,
                        expected: "integer node id or null",
                    })
                }
            };

            assignments.insert(content_id, node_id);
        }

        Ok(Self(assignments))
    }

    /// Non-null assignments
    pub fn links(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.0
            .iter()
            .filter_map(|(content_id, node_id)| node_id.map(|n| (*content_id, n)))
    }
}

// ============================================================================
// Validation: {"valid": bool, "reason": string}
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairVerdict {
    pub valid: bool,
    pub reason: String,
}

impl PairVerdict {
    pub fn parse(raw: &str) -> Result<Self, OracleContractError> {
        let map = extract_json_object(raw)?;

        let valid = required(&map, "valid")?
            .as_bool()
            .ok_or_else(|| OracleContractError::WrongType {
                key: "valid".to_string(),
                expected: "boolean",
            })?;

        let reason = required(&map, "reason")?
            .as_str()
            .ok_or_else(|| OracleContractError::WrongType {
                key: "reason".to_string(),
                expected: "string",
            })?
            .to_string();

        Ok(Self { valid, reason })
    }
}

// ============================================================================
// Quality review: {"status": "PASS"|"FAILED", "reason"?, "correction"?}
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Pass,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewVerdict {
    pub outcome: ReviewOutcome,
    pub reason: Option<String>,
    /// Suggested fix; structured corrections are kept as compact JSON
    pub correction: Option<String>,
}

impl ReviewVerdict {
    pub fn parse(raw: &str) -> Result<Self, OracleContractError> {
        let map = extract_json_object(raw)?;

        let status = required(&map, "status")?
            .as_str()
            .ok_or_else(|| OracleContractError::WrongType {
                key: "status".to_string(),
                expected: "string",
            })?;

        let outcome = match status {
            "PASS" => ReviewOutcome::Pass,
            "FAILED" => ReviewOutcome::Failed,
            other => {
                return Err(OracleContractError::UnexpectedValue {
                    key: "status".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let reason = optional_text(&map, "reason")?;
        let correction = match map.get("correction") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            outcome,
            reason,
            correction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_and_fenced_objects() {
        assert!(extract_json_object(r#"{"a": 1}"#).is_ok());
        assert!(extract_json_object("```json\n{\"a\": 1}\n```").is_ok());
        assert!(extract_json_object("```\n{\"a\": 1}\n```\n").is_ok());
        assert!(extract_json_object("  ```JSON\n{\"a\": 1}\n```  ").is_ok());
    }

    #[test]
    fn test_malformed_wrapping_rejected() {
        assert_eq!(
            extract_json_object("```json\n{\"a\": 1}"),
            Err(OracleContractError::MalformedFence)
        );
        assert_eq!(
            extract_json_object("```python\n{\"a\": 1}\n```"),
            Err(OracleContractError::MalformedFence)
        );
        assert!(matches!(
            extract_json_object("Here you go: {\"a\": 1}"),
            Err(OracleContractError::InvalidJson(_))
        ));
        assert_eq!(extract_json_object("[1, 2]"), Err(OracleContractError::NotAnObject("array")));
    }

    #[test]
    fn test_link_assignments() {
        let parsed = LinkAssignments::parse(r#"{"1": 279, "2": null, "3": 12}"#).unwrap();
        assert_eq!(parsed.0.len(), 3);
        assert_eq!(parsed.links().collect::<Vec<_>>(), vec![(1, 279), (3, 12)]);
    }

    #[test]
    fn test_link_assignments_reject_wrong_types() {
        assert!(matches!(
            LinkAssignments::parse(r#"{"1": "279"}"#),
            Err(OracleContractError::WrongType { .. })
        ));
        assert!(matches!(
            LinkAssignments::parse(r#"{"1": 2.5}"#),
            Err(OracleContractError::WrongType { .. })
        ));
        assert!(matches!(
            LinkAssignments::parse(r#"{"first": 279}"#),
            Err(OracleContractError::UnexpectedValue { .. })
        ));
    }

    #[test]
    fn test_pair_verdict() {
        let verdict = PairVerdict::parse(r#"{"valid": false, "reason": "no geometry in app"}"#).unwrap();
        assert!(!verdict.valid);
        assert_eq!(verdict.reason, "no geometry in app");

        assert_eq!(
            PairVerdict::parse(r#"{"reason": "x"}"#),
            Err(OracleContractError::MissingKey("valid".to_string()))
        );
        assert!(matches!(
            PairVerdict::parse(r#"{"valid": "yes", "reason": "x"}"#),
            Err(OracleContractError::WrongType { .. })
        ));
    }

    #[test]
    fn test_review_verdict() {
        let pass = ReviewVerdict::parse(r#"{"status": "PASS"}"#).unwrap();
        assert_eq!(pass.outcome, ReviewOutcome::Pass);
        assert!(pass.reason.is_none());

        let failed = ReviewVerdict::parse(
            "```json\n{\"status\": \"FAILED\", \"reason\": \"7+5 is 12\", \"correction\": {\"answer\": 12}}\n```",
        )
        .unwrap();
        assert_eq!(failed.outcome, ReviewOutcome::Failed);
        assert_eq!(failed.reason.as_deref(), Some("7+5 is 12"));
        assert_eq!(failed.correction.as_deref(), Some(r#"{"answer":12}"#));
    }

    #[test]
    fn test_review_verdict_unknown_status() {
        assert!(matches!(
            ReviewVerdict::parse(r#"{"status": "MAYBE"}"#),
            Err(OracleContractError::UnexpectedValue { .. })
        ));
        assert!(matches!(
            ReviewVerdict::parse(r#"{"status": "PASS", "reason": 3}"#),
            Err(OracleContractError::WrongType { .. })
        ));
    }
}
