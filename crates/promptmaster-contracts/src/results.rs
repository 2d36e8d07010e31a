use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::modes::PromptMode;

pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_CHANNELS: u16 = 1;

/// A web reference the model attached to a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedResult {
    pub mode: PromptMode,
    pub original: String,
    pub optimized: String,
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl OptimizedResult {
    /// Storyboard rows, when `optimized` holds a parsed scene list.
    ///
    /// Returns `None` for other modes and for degraded storyboard results whose
    /// text could not be read as `{ "scenes": [...] }`.
    pub fn scenes(&self) -> Option<Vec<StoryboardScene>> {
        if self.mode != PromptMode::Storyboard {
            return None;
        }
        let parsed: Value = serde_json::from_str(&self.optimized).ok()?;
        let rows = parsed.get("scenes")?.clone();
        serde_json::from_value(rows).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardScene {
    pub scene: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub duration: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Generation,
    Edit,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Generation => f.write_str("generation"),
            ImageSource::Edit => f.write_str("edit"),
        }
    }
}

/// Image bytes returned by generation or editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub bytes: Vec<u8>,
    pub source: ImageSource,
}

impl ImageArtifact {
    pub fn new(bytes: Vec<u8>, source: ImageSource) -> Self {
        Self { bytes, source }
    }

    /// Always labelled PNG, matching what the service is asked to produce.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.bytes))
    }
}

/// Synthesized speech: 16-bit little-endian PCM, 24 kHz, mono.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pcm: Vec<u8>,
}

impl AudioArtifact {
    pub fn from_pcm_bytes(pcm: Vec<u8>) -> Self {
        Self { pcm }
    }

    pub fn pcm_bytes(&self) -> &[u8] {
        &self.pcm
    }

    pub fn sample_rate(&self) -> u32 {
        SPEECH_SAMPLE_RATE
    }

    pub fn channels(&self) -> u16 {
        SPEECH_CHANNELS
    }

    /// Decoded samples. A trailing odd byte is ignored.
    pub fn samples(&self) -> Vec<i16> {
        self.pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.pcm.len() / 2) as f64 / f64::from(SPEECH_SAMPLE_RATE * u32::from(SPEECH_CHANNELS))
    }
}

/// A `data:` URI split into its declared MIME type and base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: Option<&'a str>,
    pub base64: &'a str,
}

/// Splits `data:<mime>;base64,<payload>`. Input without a `data:` prefix is
/// taken to be a bare base64 payload.
pub fn split_data_uri(raw: &str) -> DataUri<'_> {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("data:") else {
        return DataUri {
            mime_type: None,
            base64: trimmed,
        };
    };
    let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
    let mime_type = header
        .split(';')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    DataUri {
        mime_type,
        base64: payload.trim(),
    }
}

pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        split_data_uri, to_data_uri, AudioArtifact, ImageArtifact, ImageSource, OptimizedResult,
        StoryboardScene,
    };
    use crate::modes::PromptMode;

    fn storyboard_result(optimized: &str) -> OptimizedResult {
        OptimizedResult {
            mode: PromptMode::Storyboard,
            original: "a chase through the market".to_string(),
            optimized: optimized.to_string(),
            explanation: String::new(),
            tags: Vec::new(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn storyboard_scenes_accept_numeric_duration() -> anyhow::Result<()> {
        let body = serde_json::to_string_pretty(&json!({
            "scenes": [
                {"scene": 1, "description": "wide market", "camera": "crane down", "lighting": "noon", "duration": 4},
                {"scene": 2, "description": "close on runner", "camera": "handheld", "lighting": "dappled", "duration": "2s"}
            ]
        }))?;
        let scenes = storyboard_result(&body).scenes().unwrap_or_default();
        assert_eq!(scenes.len(), 2);
        assert_eq!(
            scenes[0],
            StoryboardScene {
                scene: 1,
                description: "wide market".to_string(),
                camera: "crane down".to_string(),
                lighting: "noon".to_string(),
                duration: "4".to_string(),
            }
        );
        assert_eq!(scenes[1].duration, "2s");
        Ok(())
    }

    #[test]
    fn scenes_are_absent_for_degraded_or_non_storyboard_results() {
        assert_eq!(storyboard_result("not json at all").scenes(), None);
        let mut other = storyboard_result("{\"scenes\": []}");
        other.mode = PromptMode::ImageEnhance;
        assert_eq!(other.scenes(), None);
    }

    #[test]
    fn data_uri_split_handles_prefix_and_bare_payloads() {
        let parsed = split_data_uri("data:image/webp;base64,QUJD");
        assert_eq!(parsed.mime_type, Some("image/webp"));
        assert_eq!(parsed.base64, "QUJD");

        let bare = split_data_uri("  QUJD ");
        assert_eq!(bare.mime_type, None);
        assert_eq!(bare.base64, "QUJD");

        assert_eq!(to_data_uri("image/jpeg", b"ABC"), "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn image_artifact_renders_png_data_uri() {
        let artifact = ImageArtifact::new(b"ABC".to_vec(), ImageSource::Edit);
        assert_eq!(artifact.data_uri(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn audio_artifact_decodes_little_endian_samples() {
        let audio = AudioArtifact::from_pcm_bytes(vec![0x01, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x09]);
        assert_eq!(audio.samples(), vec![1, i16::MAX, i16::MIN]);
        assert_eq!(audio.sample_rate(), 24_000);
        assert_eq!(audio.channels(), 1);

        let one_second = AudioArtifact::from_pcm_bytes(vec![0; 48_000]);
        assert!((one_second.duration_secs() - 1.0).abs() < f64::EPSILON);
    }
}
