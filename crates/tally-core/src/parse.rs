//! Extraction of a ledger payload from free-text model output.
//!
//! Model responses are non-deterministic: sometimes a fenced ```json block,
//! sometimes bare JSON with prose around it, sometimes no JSON at all. The
//! parser applies a layered fallback and always returns a value — a parse
//! failure is data, not a panic.

use serde_json::Value;

use crate::ledger::{Category, LedgerPayload};

/// Result of one parse attempt. Callers must handle both arms explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
  Parsed(LedgerPayload),
  /// No usable JSON object was found, or its shape did not match the
  /// category → assignee → task-list structure. Carries the raw response
  /// text for diagnostics.
  Failed { reason: String, raw: String },
}

impl ParseOutcome {
  pub fn is_parsed(&self) -> bool { matches!(self, ParseOutcome::Parsed(_)) }
}

/// Parse a raw model response into a [`LedgerPayload`].
///
/// Fallback order, stopping at the first candidate that parses as JSON:
/// 1. the contents of a fenced ```json code block;
/// 2. the substring between the first `{` and the last `}`;
/// 3. the whole response text.
pub fn parse_response(raw: &str) -> ParseOutcome {
  let Some(value) = extract_json(raw) else {
    return ParseOutcome::Failed {
      reason: "no JSON found in model response".to_string(),
      raw:    raw.to_string(),
    };
  };

  match validate(&value) {
    Ok(payload) => ParseOutcome::Parsed(payload),
    Err(reason) => ParseOutcome::Failed { reason, raw: raw.to_string() },
  }
}

/// The first JSON value found in `raw` via the fallback chain, with no shape
/// checking. Shared by the ledger parser and the meeting-summary parser.
pub fn extract_json(raw: &str) -> Option<Value> {
  extract_fenced(raw)
    .and_then(|s| serde_json::from_str(s).ok())
    .or_else(|| {
      extract_braced(raw).and_then(|s| serde_json::from_str(s).ok())
    })
    .or_else(|| serde_json::from_str(raw.trim()).ok())
}

/// Contents of the first ```json fenced block, if any.
fn extract_fenced(raw: &str) -> Option<&str> {
  let start = raw.find("```json")? + "```json".len();
  let rest = &raw[start..];
  let end = rest.find("```")?;
  Some(rest[..end].trim())
}

/// The substring from the first `{` to the last `}`, if both exist.
fn extract_braced(raw: &str) -> Option<&str> {
  let start = raw.find('{')?;
  let end = raw.rfind('}')?;
  (end > start).then(|| &raw[start..=end])
}

/// Check the parsed value against the expected shape and clean it up.
///
/// - unknown top-level keys are ignored;
/// - a category whose value is not an object is a shape error;
/// - an assignee whose value is not an array is dropped silently;
/// - non-string and empty-after-trim task entries are dropped silently.
fn validate(value: &Value) -> Result<LedgerPayload, String> {
  let Some(object) = value.as_object() else {
    return Err("top-level JSON value is not an object".to_string());
  };

  let mut payload = LedgerPayload::default();
  for category in Category::ALL {
    let Some(entry) = object.get(category.as_str()) else { continue };
    let Some(assignees) = entry.as_object() else {
      return Err(format!("category {:?} is not an object", category.as_str()));
    };

    for (assignee, tasks) in assignees {
      let Some(list) = tasks.as_array() else { continue };
      let cleaned: Vec<String> = list
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect();
      if !cleaned.is_empty() {
        payload.category_mut(category).insert(assignee.clone(), cleaned);
      }
    }
  }
  Ok(payload)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  const BODY: &str = r#"{"Pending":{"Alice":["fix login bug"]},"Completed":{"Bob":["fixed payment API"]},"Issue":{}}"#;

  fn expected() -> LedgerPayload {
    let mut p = LedgerPayload::default();
    p.pending.insert("Alice".into(), vec!["fix login bug".into()]);
    p.completed.insert("Bob".into(), vec!["fixed payment API".into()]);
    p
  }

  #[test]
  fn parses_fenced_json_block() {
    let raw = format!("Here is the result:\n```json\n{BODY}\n```\nDone.");
    assert_eq!(parse_response(&raw), ParseOutcome::Parsed(expected()));
  }

  #[test]
  fn parses_bare_object_with_surrounding_prose() {
    let raw = format!("Sure! The ledger is {BODY} — let me know.");
    assert_eq!(parse_response(&raw), ParseOutcome::Parsed(expected()));
  }

  #[test]
  fn parses_whole_response_as_json() {
    assert_eq!(parse_response(BODY), ParseOutcome::Parsed(expected()));
  }

  #[test]
  fn all_three_routes_agree() {
    let fenced = format!("```json\n{BODY}\n```");
    let prose = format!("prefix {BODY} suffix");
    let a = parse_response(&fenced);
    let b = parse_response(&prose);
    let c = parse_response(BODY);
    assert_eq!(a, b);
    assert_eq!(b, c);
  }

  #[test]
  fn no_json_is_an_explicit_failure() {
    let outcome = parse_response("I could not find any tasks today.");
    match outcome {
      ParseOutcome::Failed { raw, .. } => {
        assert!(raw.contains("could not find"));
      }
      other => panic!("expected failure, got {other:?}"),
    }
  }

  #[test]
  fn top_level_array_fails_validation() {
    let outcome = parse_response(r#"["Pending", "Completed"]"#);
    assert!(!outcome.is_parsed());
  }

  #[test]
  fn category_that_is_not_an_object_fails() {
    let outcome = parse_response(r#"{"Pending": ["not a map"]}"#);
    assert!(!outcome.is_parsed());
  }

  #[test]
  fn empty_and_non_string_tasks_are_dropped() {
    let raw = r#"{"Pending":{"Alice":["  ", "real task", 42, null]}}"#;
    match parse_response(raw) {
      ParseOutcome::Parsed(p) => {
        assert_eq!(p.pending["Alice"], vec!["real task"]);
      }
      other => panic!("expected success, got {other:?}"),
    }
  }

  #[test]
  fn unknown_top_level_keys_are_ignored() {
    let raw = r#"{"Pending":{},"analysis_summary":{"total":3}}"#;
    assert!(parse_response(raw).is_parsed());
  }

  #[test]
  fn assignee_with_non_array_value_is_dropped() {
    let raw = r#"{"Pending":{"Alice":"not a list","Bob":["ok"]}}"#;
    match parse_response(raw) {
      ParseOutcome::Parsed(p) => {
        assert!(!p.pending.contains_key("Alice"));
        assert_eq!(p.pending["Bob"], vec!["ok"]);
      }
      other => panic!("expected success, got {other:?}"),
    }
  }
}
