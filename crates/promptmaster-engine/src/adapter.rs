use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use promptmaster_contracts::models::ModelLineup;
use promptmaster_contracts::modes::{AspectRatio, PromptMode};
use promptmaster_contracts::results::{
    split_data_uri, AudioArtifact, ImageArtifact, ImageSource, OptimizedResult,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::instructions::{
    explanation_for, instruction, tags_for, ANALYSIS_INSTRUCTION, EXPLANATION_PARSE_FAILED,
    SPEECH_PREFIX, VOICE_NAME,
};
use crate::response::{first_inline_bytes, grounding_sources, response_text};
use crate::transport::GenerateTransport;
use crate::AdapterError;

const DEFAULT_UPLOAD_MIME: &str = "image/jpeg";

/// The five remote operations. Each is exactly one transport call; the
/// credential lives inside the transport, so adapters never share state.
pub struct GeminiAdapter<T> {
    transport: T,
    models: ModelLineup,
}

impl<T: GenerateTransport> GeminiAdapter<T> {
    pub fn new(transport: T, models: ModelLineup) -> Self {
        Self { transport, models }
    }

    /// Rewrites `text` with the instruction for `mode`, grounded on web search.
    ///
    /// Storyboard answers are requested as JSON and re-serialized pretty; an
    /// answer that does not parse comes back raw with an empty tag set.
    pub fn transform_prompt(
        &self,
        text: &str,
        mode: PromptMode,
    ) -> Result<OptimizedResult, AdapterError> {
        let mime_type = if mode.wants_structured_output() {
            "application/json"
        } else {
            "text/plain"
        };
        let payload = json!({
            "systemInstruction": {"parts": [{"text": instruction(mode)}]},
            "contents": [{"role": "user", "parts": [{"text": text}]}],
            "tools": [{"googleSearch": {}}],
            "generationConfig": {"responseMimeType": mime_type},
        });
        debug!(%mode, model = %self.models.text, "transform prompt");
        let response = self.transport.generate(&self.models.text, &payload)?;
        let answer = response_text(&response);
        let sources = grounding_sources(&response);

        let mut result = OptimizedResult {
            mode,
            original: text.to_string(),
            optimized: answer,
            explanation: explanation_for(mode).to_string(),
            tags: tags_for(mode).iter().map(|tag| tag.to_string()).collect(),
            sources,
        };

        if mode.wants_structured_output() {
            let body = if result.optimized.trim().is_empty() {
                "{}"
            } else {
                result.optimized.as_str()
            };
            match serde_json::from_str::<Value>(body).and_then(|parsed| serde_json::to_string_pretty(&parsed)) {
                Ok(pretty) => result.optimized = pretty,
                Err(err) => {
                    warn!(error = %err, "storyboard answer is not valid JSON; returning raw text");
                    result.explanation = EXPLANATION_PARSE_FAILED.to_string();
                    result.tags.clear();
                }
            }
        }

        info!(%mode, sources = result.sources.len(), "prompt transformed");
        Ok(result)
    }

    pub fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageArtifact, AdapterError> {
        let payload = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"imageConfig": {"aspectRatio": aspect_ratio.as_str()}},
        });
        debug!(%aspect_ratio, model = %self.models.image, "generate image");
        let response = self.transport.generate(&self.models.image, &payload)?;
        self.image_from(&response, ImageSource::Generation)
    }

    /// Free-text description of an uploaded image; empty when the answer has no text.
    pub fn analyze_image(
        &self,
        image_data_uri: &str,
        instruction_text: Option<&str>,
    ) -> Result<String, AdapterError> {
        let prompt = instruction_text
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANALYSIS_INSTRUCTION);
        let payload = json!({
            "contents": [{"role": "user", "parts": [image_part(image_data_uri)?, {"text": prompt}]}],
        });
        debug!(model = %self.models.vision, "analyze image");
        let response = self.transport.generate(&self.models.vision, &payload)?;
        let text = response_text(&response);
        info!(chars = text.chars().count(), "image analyzed");
        Ok(text)
    }

    pub fn edit_image(
        &self,
        image_data_uri: &str,
        instruction_text: &str,
    ) -> Result<ImageArtifact, AdapterError> {
        let payload = json!({
            "contents": [{"role": "user", "parts": [image_part(image_data_uri)?, {"text": instruction_text}]}],
        });
        debug!(model = %self.models.edit, "edit image");
        let response = self.transport.generate(&self.models.edit, &payload)?;
        self.image_from(&response, ImageSource::Edit)
    }

    /// Speech for `text` as raw 24 kHz mono PCM.
    pub fn synthesize_speech(&self, text: &str) -> Result<AudioArtifact, AdapterError> {
        let payload = json!({
            "contents": [{"role": "user", "parts": [{"text": format!("{SPEECH_PREFIX}{text}")}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": VOICE_NAME}},
                },
            },
        });
        debug!(model = %self.models.speech, "synthesize speech");
        let response = self.transport.generate(&self.models.speech, &payload)?;
        let audio = first_inline_bytes(&response)?.ok_or(AdapterError::NoAudio)?;
        info!(bytes = audio.bytes.len(), "speech synthesized");
        Ok(AudioArtifact::from_pcm_bytes(audio.bytes))
    }

    fn image_from(
        &self,
        response: &Value,
        source: ImageSource,
    ) -> Result<ImageArtifact, AdapterError> {
        let image = first_inline_bytes(response)?.ok_or(AdapterError::NoImage(source))?;
        info!(%source, bytes = image.bytes.len(), mime_type = ?image.mime_type, "image received");
        Ok(ImageArtifact::new(image.bytes, source))
    }
}

fn image_part(image_data_uri: &str) -> Result<Value, AdapterError> {
    let parsed = split_data_uri(image_data_uri);
    if parsed.base64.is_empty() {
        return Err(AdapterError::InvalidImageInput(
            "image data is empty".to_string(),
        ));
    }
    BASE64
        .decode(parsed.base64.as_bytes())
        .map_err(|err| AdapterError::InvalidImageInput(format!("image data is not base64: {err}")))?;
    Ok(json!({
        "inlineData": {
            "mimeType": parsed.mime_type.unwrap_or(DEFAULT_UPLOAD_MIME),
            "data": parsed.base64,
        }
    }))
}
