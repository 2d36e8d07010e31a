use promptmaster_contracts::modes::PromptMode;

pub const EXPLANATION_OPTIMIZED: &str = "Optimized against current trends";
pub const EXPLANATION_STORYBOARD: &str = "Storyboard breakdown generated";
pub const EXPLANATION_PARSE_FAILED: &str =
    "Failed to parse structured output; showing raw response";

pub const ANALYSIS_INSTRUCTION: &str =
    "Describe this image in detail so it can be used to reproduce a similar image.";
pub const SPEECH_PREFIX: &str = "Read the following aloud in a gentle, natural tone: ";
pub const VOICE_NAME: &str = "Kore";

const IMAGE_ENHANCE: &str = "You are a top-tier expert in prompts for AI image generation. \
Turn the user's short description into a professional, detailed and artistic Midjourney or \
Stable Diffusion prompt. Cover: subject detail, environment and lighting, composition, \
quality terms (such as 8k, unreal engine 5, ray tracing) and art style.";

const VIDEO_ENHANCE: &str = "You are a top-tier expert in prompts for AI video generation. \
Optimize the user's idea for models such as Runway Gen-2, Pika and Sora. The prompt must \
describe camera movement (zoom in, pan, dolly shot), light dynamics, material detail, \
frame-rate feel and emotional atmosphere.";

const STORYBOARD: &str = "You are an expert film storyboard planner. Break the user's \
creative brief down into a professional shot-by-shot script. Answer in JSON shaped as \
{ \"scenes\": [{ \"scene\": 1, \"description\": \"\", \"camera\": \"\", \"lighting\": \"\", \
\"duration\": \"\" }] }.";

const STYLIZED: &str = "You are a prompt expert focused on the Lovart style: elegant, \
luxurious, refined colour. Rewrite the user's request as a description with a strong \
Lovart artistic character.";

/// System instruction steering the prompt-transform call for `mode`.
pub fn instruction(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::ImageEnhance => IMAGE_ENHANCE,
        PromptMode::VideoEnhance => VIDEO_ENHANCE,
        PromptMode::Storyboard => STORYBOARD,
        PromptMode::Stylized => STYLIZED,
    }
}

/// Fixed labels attached to a successful transform; never derived from model output.
pub fn tags_for(mode: PromptMode) -> &'static [&'static str] {
    match mode {
        PromptMode::Storyboard => &["Storyboard", "Pro script"],
        PromptMode::ImageEnhance | PromptMode::VideoEnhance | PromptMode::Stylized => {
            &["AI enhanced", "Pro composition"]
        }
    }
}

pub(crate) fn explanation_for(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::Storyboard => EXPLANATION_STORYBOARD,
        PromptMode::ImageEnhance | PromptMode::VideoEnhance | PromptMode::Stylized => {
            EXPLANATION_OPTIMIZED
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use promptmaster_contracts::modes::PromptMode;

    use super::{instruction, tags_for};

    #[test]
    fn every_prompt_mode_has_a_distinct_instruction() {
        let texts: HashSet<&str> = PromptMode::ALL.into_iter().map(instruction).collect();
        assert_eq!(texts.len(), PromptMode::ALL.len());
        assert!(instruction(PromptMode::Storyboard).contains("\"scenes\""));
        assert!(instruction(PromptMode::VideoEnhance).contains("camera movement"));
        assert!(instruction(PromptMode::Stylized).contains("Lovart"));
    }

    #[test]
    fn storyboard_has_its_own_tag_set() {
        assert_eq!(tags_for(PromptMode::Storyboard), &["Storyboard", "Pro script"]);
        for mode in [
            PromptMode::ImageEnhance,
            PromptMode::VideoEnhance,
            PromptMode::Stylized,
        ] {
            assert_eq!(tags_for(mode), &["AI enhanced", "Pro composition"]);
        }
    }
}
