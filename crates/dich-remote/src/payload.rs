//! Extraction of the JSON document the model writes inside the envelope text.
//!
//! Models are told to return bare JSON but still wrap it in code fences or a
//! sentence of prose now and then. Parsing is bounded to the outermost
//! braces (objects) or brackets (arrays). A parse failure is final; asking
//! again would not fix it.

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("no JSON array in model output")]
    NoArray,

    #[error("invalid JSON in model output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Removes ```json / ``` markers
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// First `{` through last `}`; the cleaned text when there is no such span
pub fn isolate_object(raw: &str) -> String {
    let cleaned = strip_code_fences(raw);
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => cleaned[start..=end].to_string(),
        _ => cleaned,
    }
}

/// First `[` through the last `]` after it
pub fn isolate_array(raw: &str) -> Result<String, PayloadError> {
    let start = raw.find('[').ok_or(PayloadError::NoArray)?;
    let end = raw.rfind(']').ok_or(PayloadError::NoArray)?;
    if end < start {
        return Err(PayloadError::NoArray);
    }
    Ok(raw[start..=end].to_string())
}

/// Parses an object, unwrapping one level of JSON-string encoding if present
pub fn parse_object<T: DeserializeOwned>(raw: &str) -> Result<T, PayloadError> {
    let cleaned = strip_code_fences(raw);
    let source = match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::String(inner)) => inner,
        _ => cleaned,
    };
    let value: Value = serde_json::from_str(&isolate_object(&source))?;
    Ok(serde_json::from_value(value)?)
}

pub fn parse_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, PayloadError> {
    let cleaned = strip_code_fences(raw);
    Ok(serde_json::from_str(&isolate_array(&cleaned)?)?)
}
