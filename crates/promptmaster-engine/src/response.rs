use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use promptmaster_contracts::results::Source;
use serde_json::Value;

use crate::AdapterError;

/// Inline binary payload found in a content part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InlineBytes {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

fn first_candidate(response: &Value) -> Option<&Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
}

fn candidate_parts(response: &Value) -> &[Value] {
    first_candidate(response)
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Concatenated text parts of the first candidate. Thought parts are skipped.
pub(crate) fn response_text(response: &Value) -> String {
    candidate_parts(response)
        .iter()
        .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

/// First part of the first candidate that carries inline data.
pub(crate) fn first_inline_bytes(response: &Value) -> Result<Option<InlineBytes>, AdapterError> {
    for part in candidate_parts(response) {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64
            .decode(data.as_bytes())
            .map_err(|err| AdapterError::Decode(format!("inline data is not base64: {err}")))?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .map(str::to_string);
        return Ok(Some(InlineBytes { bytes, mime_type }));
    }
    Ok(None)
}

/// Web citations attached to the first candidate, in order. Entries without a
/// URI are dropped.
pub(crate) fn grounding_sources(response: &Value) -> Vec<Source> {
    first_candidate(response)
        .and_then(|candidate| candidate.get("groundingMetadata"))
        .and_then(|metadata| metadata.get("groundingChunks"))
        .and_then(Value::as_array)
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| chunk.get("web"))
                .filter_map(|web| {
                    let uri = web
                        .get("uri")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|uri| !uri.is_empty())?;
                    let title = web
                        .get("title")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|title| !title.is_empty())
                        .map(str::to_string);
                    Some(Source {
                        uri: uri.to_string(),
                        title,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pulls `error.message` out of a failed response body.
pub(crate) fn remote_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
