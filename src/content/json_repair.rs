//! Tolerant parsing of LLM JSON responses.
//!
//! Models frequently wrap the payload in markdown fences, leave trailing
//! commas, or emit Python-style literals. Parsing goes through escalating
//! stages: direct parse, fence extraction, mechanical repairs, then
//! balanced-brace extraction of the first JSON object in the text.

use crate::errors::ServiceError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"));
static SINGLE_QUOTED_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']*)'\s*:").expect("quoted key regex"));
static SINGLE_QUOTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\s*'([^']*)'").expect("quoted value regex"));

/// Parses an LLM response body into JSON, repairing common defects.
pub fn parse_llm_json(raw: &str) -> Result<Value, ServiceError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(caps) = FENCED_JSON.captures(trimmed) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if let Ok(value) = serde_json::from_str(inner) {
            return Ok(value);
        }
        if let Ok(value) = serde_json::from_str(&apply_repairs(inner)) {
            return Ok(value);
        }
    }

    if let Ok(value) = serde_json::from_str(&apply_repairs(trimmed)) {
        return Ok(value);
    }

    if let Some(candidate) = extract_balanced_object(trimmed) {
        if let Ok(value) = serde_json::from_str(candidate) {
            return Ok(value);
        }
        if let Ok(value) = serde_json::from_str(&apply_repairs(candidate)) {
            return Ok(value);
        }
    }

    Err(ServiceError::ParseError(format!(
        "Unparseable LLM response ({} chars)",
        trimmed.len()
    )))
}

/// Mechanical fixes safe to apply to near-JSON text.
fn apply_repairs(input: &str) -> String {
    let mut fixed = input.replace('\u{feff}', "").replace("\r\n", "\n");
    fixed = TRAILING_COMMA.replace_all(&fixed, "$1").into_owned();
    fixed = SINGLE_QUOTED_KEY.replace_all(&fixed, "\"$1\":").into_owned();
    fixed = SINGLE_QUOTED_VALUE
        .replace_all(&fixed, ": \"$1\"")
        .into_owned();
    fixed = fixed
        .replace(": True", ": true")
        .replace(": False", ": false")
        .replace(": None", ": null");
    fixed
}

/// Returns the first brace-balanced object in the text, respecting string
/// literals and escapes.
fn extract_balanced_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let bytes = input.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let value = parse_llm_json(r#"{"title": "Aarna Set"}"#).unwrap();
        assert_eq!(value["title"], "Aarna Set");
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "Here you go:\n```json\n{\"title\": \"Nayra Set\"}\n```\nEnjoy!";
        let value = parse_llm_json(raw).unwrap();
        assert_eq!(value["title"], "Nayra Set");
    }

    #[test]
    fn repairs_trailing_commas_and_python_literals() {
        let raw = r#"{"title": "Vanya Set", "active": True, "notes": None,}"#;
        let value = parse_llm_json(raw).unwrap();
        assert_eq!(value["active"], true);
        assert!(value["notes"].is_null());
    }

    #[test]
    fn extracts_embedded_object_from_prose() {
        let raw = "The answer is {\"action\": \"Final Answer\", \"action_input\": {\"title\": \"Ira Set\"}} as requested.";
        let value = parse_llm_json(raw).unwrap();
        assert_eq!(value["action_input"]["title"], "Ira Set");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let raw = "noise {\"text\": \"a } inside\", \"n\": 1} trailer";
        let value = parse_llm_json(raw).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn garbage_fails_with_parse_error() {
        let err = parse_llm_json("not json at all").unwrap_err();
        assert!(matches!(err, ServiceError::ParseError(_)));
    }
}
