use serde_json::Value;

use crate::errors::JudgeError;

/// Drop a surrounding Markdown code fence (```json … ```), if any.
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // skip the info string (`json`, `JSON`, nothing)
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Locate and parse the JSON object in a model answer.
///
/// Leading prose is skipped up to the first `{`; trailing text after the
/// first complete value is ignored. Anything that is not an object fails
/// with [`JudgeError::OutputInvalid`] carrying the raw text.
pub fn extract_json_object(template_id: &str, text: &str) -> Result<Value, JudgeError> {
    let trimmed = strip_fence(text.trim());
    let start = trimmed
        .find('{')
        .ok_or_else(|| {
            JudgeError::output_invalid(template_id, "no JSON object start '{' found", text)
        })?;
    let segment = &trimmed[start..];

    let value = serde_json::Deserializer::from_str(segment)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| JudgeError::output_invalid(template_id, "no JSON value found", text))?
        .map_err(|e| JudgeError::output_invalid(template_id, e.to_string(), text))?;

    if !value.is_object() {
        return Err(JudgeError::output_invalid(template_id, "JSON value is not an object", text));
    }
    Ok(value)
}
