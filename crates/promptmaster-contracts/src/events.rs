use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SessionStarted,
    CredentialChanged,
    CredentialCleared,
    ModeSelected,
    ActionStarted,
    ActionCompleted,
    ActionFailed,
    ResultDiscarded,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionStarted => "session_started",
            EventKind::CredentialChanged => "credential_changed",
            EventKind::CredentialCleared => "credential_cleared",
            EventKind::ModeSelected => "mode_selected",
            EventKind::ActionStarted => "action_started",
            EventKind::ActionCompleted => "action_completed",
            EventKind::ActionFailed => "action_failed",
            EventKind::ResultDiscarded => "result_discarded",
        }
    }
}

/// Append-only activity log (`events.jsonl`).
///
/// - default fields are `type`, `session_id`, `ts`
/// - caller payload is merged last, after secrets and inline media are redacted
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    /// A writer with a fresh random session id.
    pub fn for_new_session(path: impl Into<PathBuf>) -> Self {
        Self::new(path, uuid::Uuid::new_v4().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, kind: EventKind, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        event.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            let value = redact(&key, &value);
            event.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }
}

fn redact(key: &str, value: &Value) -> Value {
    let lowered = key.to_ascii_lowercase();
    if matches!(
        lowered.as_str(),
        "token" | "api_key" | "key" | "data" | "image" | "image_bytes" | "audio" | "data_uri"
    ) {
        return Value::String("<omitted>".to_string());
    }
    match value {
        Value::Array(rows) => Value::Array(rows.iter().map(|row| redact("", row)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(inner_key, row)| (inner_key.clone(), redact(inner_key, row)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::json;

    use super::*;

    #[test]
    fn emit_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        let mut payload = EventPayload::new();
        payload.insert("mode".to_string(), json!("image-edit"));
        let emitted = writer.emit(EventKind::ActionStarted, payload)?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], json!("action_started"));
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["mode"], json!("image-edit"));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn secrets_and_media_are_redacted() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "session-123");

        let mut payload = EventPayload::new();
        payload.insert("token".to_string(), json!("AIzaSyExample"));
        payload.insert(
            "request".to_string(),
            json!({"parts": [{"inlineData": {"mimeType": "image/png", "data": "QUJD"}}]}),
        );
        let emitted = writer.emit(EventKind::CredentialChanged, payload)?;

        assert_eq!(emitted["token"], json!("<omitted>"));
        assert_eq!(
            emitted["request"]["parts"][0]["inlineData"]["data"],
            json!("<omitted>")
        );
        assert_eq!(
            emitted["request"]["parts"][0]["inlineData"]["mimeType"],
            json!("image/png")
        );
        Ok(())
    }

    #[test]
    fn emit_appends_lines() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::for_new_session(&path);
        assert!(!writer.session_id().is_empty());

        writer.emit(EventKind::SessionStarted, EventPayload::new())?;
        writer.emit(EventKind::ModeSelected, EventPayload::new())?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0])?;
        let second: Value = serde_json::from_str(lines[1])?;
        assert_eq!(first["type"], json!("session_started"));
        assert_eq!(second["type"], json!("mode_selected"));
        assert_eq!(first["session_id"], second["session_id"]);
        Ok(())
    }
}
