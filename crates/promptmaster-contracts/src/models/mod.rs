mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec};
pub use selectors::{
    ModelLineup, ModelOverrides, ModelSelection, ModelSelector, CAPABILITY_EDIT, CAPABILITY_IMAGE,
    CAPABILITY_SPEECH, CAPABILITY_TEXT, CAPABILITY_VISION,
};

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use indexmap::IndexMap;

    use super::{ModelLineup, ModelOverrides, ModelRegistry, ModelSelector, ModelSpec};

    fn resolve(
        selector: &mut ModelSelector,
        overrides: &ModelOverrides,
    ) -> anyhow::Result<(ModelLineup, Vec<String>)> {
        ModelLineup::resolve(selector, overrides).map_err(|err| anyhow!(err))
    }

    #[test]
    fn model_selector_falls_back_when_requested_model_unavailable() -> anyhow::Result<()> {
        let mut models = IndexMap::new();
        models.insert(
            "tts-fallback".to_string(),
            ModelSpec::new("tts-fallback", &["speech"]),
        );
        let selection = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("missing"), "speech")
            .map_err(|err| anyhow!(err))?;
        assert_eq!(selection.model.name, "tts-fallback");
        assert_eq!(selection.requested.as_deref(), Some("missing"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'missing' unavailable for capability 'speech'.")
        );
        Ok(())
    }

    #[test]
    fn model_selector_raises_when_no_models_for_capability() {
        let mut models = IndexMap::new();
        models.insert("text-only".to_string(), ModelSpec::new("text-only", &["text"]));
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("gemini-2.5-flash-image"), "image")
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'image'.");
    }

    #[test]
    fn default_lineup_matches_registry() -> anyhow::Result<()> {
        let mut selector = ModelSelector::default();
        let (lineup, warnings) = resolve(&mut selector, &ModelOverrides::default())?;
        assert_eq!(lineup, ModelLineup::default());
        assert!(warnings.is_empty());
        assert!(selector
            .registry
            .ensure(&lineup.edit, "edit")
            .is_some());
        Ok(())
    }

    #[test]
    fn unknown_override_is_registered_for_its_capability() -> anyhow::Result<()> {
        let mut selector = ModelSelector::default();
        let overrides = ModelOverrides {
            text: Some("gemini-2.5-pro".to_string()),
            ..ModelOverrides::default()
        };
        let (lineup, warnings) = resolve(&mut selector, &overrides)?;
        assert_eq!(lineup.text, "gemini-2.5-pro");
        assert!(warnings.is_empty());
        assert!(selector.registry.ensure("gemini-2.5-pro", "text").is_some());
        Ok(())
    }

    #[test]
    fn edit_override_must_support_editing() -> anyhow::Result<()> {
        let mut selector = ModelSelector::default();
        let overrides = ModelOverrides {
            edit: Some("gemini-3-pro-preview".to_string()),
            ..ModelOverrides::default()
        };
        let (lineup, warnings) = resolve(&mut selector, &overrides)?;
        assert_eq!(lineup.edit, "gemini-2.5-flash-image");
        assert_eq!(
            warnings,
            vec![
                "Requested model 'gemini-3-pro-preview' unavailable for capability 'edit'."
                    .to_string()
            ]
        );
        Ok(())
    }

    #[test]
    fn override_lacking_capability_falls_back_with_warning() -> anyhow::Result<()> {
        let mut selector = ModelSelector::default();
        let overrides = ModelOverrides {
            speech: Some("gemini-3-flash-preview".to_string()),
            ..ModelOverrides::default()
        };
        let (lineup, warnings) = resolve(&mut selector, &overrides)?;
        assert_eq!(lineup.speech, "gemini-2.5-flash-preview-tts");
        assert_eq!(
            warnings,
            vec![
                "Requested model 'gemini-3-flash-preview' unavailable for capability 'speech'."
                    .to_string()
            ]
        );
        Ok(())
    }
}
