use super::registry::{ModelRegistry, ModelSpec};

pub const CAPABILITY_TEXT: &str = "text";
pub const CAPABILITY_VISION: &str = "vision";
pub const CAPABILITY_IMAGE: &str = "image";
pub const CAPABILITY_EDIT: &str = "edit";
pub const CAPABILITY_SPEECH: &str = "speech";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let (fallback_reason, requested_text) = if let Some(requested_value) = requested {
            if let Some(model) = self.registry.ensure(requested_value, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(requested_value.to_string()),
                    fallback_reason: None,
                });
            }
            (
                Some(format!(
                    "Requested model '{requested_value}' unavailable for capability '{capability}'."
                )),
                Some(requested_value.to_string()),
            )
        } else {
            (None, None)
        };

        let candidates = self.registry.by_capability(capability);
        let Some(model) = candidates.first().cloned() else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        Ok(ModelSelection {
            model,
            requested: requested_text,
            fallback_reason,
        })
    }
}

/// The model name used for each adapter operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLineup {
    pub text: String,
    pub vision: String,
    pub image: String,
    pub edit: String,
    pub speech: String,
}

impl Default for ModelLineup {
    fn default() -> Self {
        Self {
            text: "gemini-3-flash-preview".to_string(),
            vision: "gemini-3-pro-preview".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
            edit: "gemini-2.5-flash-image".to_string(),
            speech: "gemini-2.5-flash-preview-tts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOverrides {
    pub text: Option<String>,
    pub vision: Option<String>,
    pub image: Option<String>,
    pub edit: Option<String>,
    pub speech: Option<String>,
}

impl ModelLineup {
    /// Resolves overrides against the registry. Names the registry does not
    /// know are registered with the requested capability, since hosted
    /// endpoints gain models faster than this table does.
    pub fn resolve(
        selector: &mut ModelSelector,
        overrides: &ModelOverrides,
    ) -> Result<(Self, Vec<String>), String> {
        let defaults = Self::default();
        let mut warnings = Vec::new();
        let mut pick = |requested: Option<&String>, fallback: &str, capability: &str| {
            let name = requested.map(String::as_str).unwrap_or(fallback);
            if selector.registry.get(name).is_none() {
                selector.registry.insert(ModelSpec::new(name, &[capability]));
            }
            let selection = selector.select(Some(name), capability)?;
            if let Some(reason) = selection.fallback_reason {
                warnings.push(reason);
            }
            Ok::<String, String>(selection.model.name)
        };
        let lineup = Self {
            text: pick(overrides.text.as_ref(), &defaults.text, CAPABILITY_TEXT)?,
            vision: pick(overrides.vision.as_ref(), &defaults.vision, CAPABILITY_VISION)?,
            image: pick(overrides.image.as_ref(), &defaults.image, CAPABILITY_IMAGE)?,
            edit: pick(overrides.edit.as_ref(), &defaults.edit, CAPABILITY_EDIT)?,
            speech: pick(overrides.speech.as_ref(), &defaults.speech, CAPABILITY_SPEECH)?,
        };
        Ok((lineup, warnings))
    }
}
