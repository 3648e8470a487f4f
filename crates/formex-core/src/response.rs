//! Recovering the form object from a model reply.
//!
//! Models are asked for bare JSON but often wrap it in prose or a
//! markdown fence. The parser accepts the first complete JSON object it can
//! find and nothing else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::bedrock::ModelResponse;
use crate::error::{FormexError, Result};

/// Field names mapped to their values, in the order the model gave them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(Map<String, Value>);

impl FormData {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set a top-level entry, replacing any existing value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Parse the form object out of a model reply.
///
/// # Errors
///
/// Returns [`FormexError::MalformedResponse`] when the reply is bare JSON of
/// another type or contains no parseable JSON object.
pub fn parse_response(response: &ModelResponse) -> Result<FormData> {
    let text = response.text.trim();

    // Whole reply is JSON: it has to be the object itself
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return match value {
            Value::Object(fields) => Ok(FormData(fields)),
            other => Err(FormexError::malformed(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
        };
    }

    if let Some(fields) = fenced_block(text).and_then(first_object) {
        debug!(fields = fields.len(), "parsed JSON object from code fence");
        return Ok(FormData(fields));
    }

    if let Some(fields) = first_object(text) {
        debug!(fields = fields.len(), "parsed JSON object embedded in prose");
        return Ok(FormData(fields));
    }

    let mut reason = String::from("no JSON object found in model reply");
    if response.truncated {
        reason.push_str(" (reply was cut off at the token limit)");
    }
    Err(FormexError::malformed(reason))
}

/// Body of the first ``` fenced block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip an info string such as `json`
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// First complete top-level JSON object in `text`.
///
/// A `{` that fails to parse as an object is skipped together with
/// everything up to its matching `}`, so an object nested inside a broken
/// one is never taken for the form. A failure at end of input means the
/// reply was cut short and there is nothing left to try.
fn first_object(text: &str) -> Option<Map<String, Value>> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(fields))) => return Some(fields),
            Some(Err(e)) if e.is_eof() => return None,
            _ => from = start + balanced_end(&text[start..])?,
        }
    }
    None
}

/// Byte length of the brace group opening at the start of `text`,
/// ignoring braces inside JSON strings. `None` if it never closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Result<FormData> {
        parse_response(&ModelResponse::from_text(text))
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let form =
            parse("Here is the result:\n{\"name\": \"Alice\", \"age\": null}\nThanks.").unwrap();

        assert_eq!(
            serde_json::to_value(&form).unwrap(),
            json!({"name": "Alice", "age": null})
        );
        let keys: Vec<&String> = form.fields().keys().collect();
        assert_eq!(keys, ["name", "age"]);
    }

    #[test]
    fn test_bare_object() {
        let form = parse(r#"  {"Date": "2024-05-01", "Signature": null}  "#).unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form.get("Signature"), Some(&Value::Null));
    }

    #[test]
    fn test_markdown_fence() {
        let text = "Sure!\n```json\n{\"field1\": \"value1\"}\n```\nLet me know if you need more.";
        let form = parse(text).unwrap();
        assert_eq!(form.get("field1"), Some(&json!("value1")));
    }

    #[test]
    fn test_braces_in_prose_before_object() {
        let text = "Fields use {curly} names: {\"Employer {Legal}\": \"ACME\"}";
        let form = parse(text).unwrap();
        assert_eq!(form.get("Employer {Legal}"), Some(&json!("ACME")));
    }

    #[test]
    fn test_nested_values_are_kept() {
        let form = parse(r#"{"Applicant": {"Name": "Bob", "Phone": null}}"#).unwrap();
        assert_eq!(form.get("Applicant"), Some(&json!({"Name": "Bob", "Phone": null})));
    }

    #[test]
    fn test_no_json_is_malformed() {
        let err = parse("I could not find any form fields in this document.").unwrap_err();
        assert!(matches!(err, FormexError::MalformedResponse { .. }));
    }

    #[test]
    fn test_empty_reply_is_malformed() {
        assert!(matches!(
            parse("").unwrap_err(),
            FormexError::MalformedResponse { .. }
        ));
    }

    #[test]
    fn test_unterminated_object_is_malformed() {
        let err = parse("{\"name\": \"Alice\", \"age\":").unwrap_err();
        assert!(matches!(err, FormexError::MalformedResponse { .. }));
    }

    #[test]
    fn test_bare_array_is_rejected() {
        let err = parse(r#"[{"name": "Alice"}]"#).unwrap_err();
        match err {
            FormexError::MalformedResponse { reason } => assert!(reason.contains("array")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_reply_is_reported() {
        let response = ModelResponse {
            text: "{\"name\": \"Al".to_string(),
            usage: None,
            truncated: true,
        };
        match parse_response(&response).unwrap_err() {
            FormexError::MalformedResponse { reason } => assert!(reason.contains("token limit")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cut_off_outer_object_does_not_yield_inner_one() {
        let response = ModelResponse {
            text: "{\"Applicant\": {\"Name\": \"Bob\"}, \"Address\": \"12 Ma".to_string(),
            usage: None,
            truncated: true,
        };
        match parse_response(&response).unwrap_err() {
            FormexError::MalformedResponse { reason } => assert!(reason.contains("token limit")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_broken_outer_object_does_not_yield_inner_one() {
        let text = "Result: {\"Applicant\": {\"Name\": \"Bob\"}, Address: 12 Main}";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, FormexError::MalformedResponse { .. }));
    }

    #[test]
    fn test_object_after_broken_group() {
        let text = "Template {name: ?, note: \"}\"} filled: {\"name\": \"Alice\"}";
        let form = parse(text).unwrap();
        assert_eq!(form.get("name"), Some(&json!("Alice")));
        assert_eq!(form.len(), 1);
    }
}
