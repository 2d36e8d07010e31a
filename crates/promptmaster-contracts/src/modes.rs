use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every request kind the front end exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationMode {
    #[default]
    ImagePromptEnhance,
    VideoPromptEnhance,
    StoryboardBreakdown,
    StylizedPrompt,
    ImageGenerationTest,
    ImageToPromptAnalysis,
    ImageEdit,
}

impl OperationMode {
    pub const ALL: [OperationMode; 7] = [
        OperationMode::ImagePromptEnhance,
        OperationMode::VideoPromptEnhance,
        OperationMode::StoryboardBreakdown,
        OperationMode::StylizedPrompt,
        OperationMode::ImageGenerationTest,
        OperationMode::ImageToPromptAnalysis,
        OperationMode::ImageEdit,
    ];

    pub fn id(self) -> &'static str {
        match self {
            OperationMode::ImagePromptEnhance => "image-prompt-enhance",
            OperationMode::VideoPromptEnhance => "video-prompt-enhance",
            OperationMode::StoryboardBreakdown => "storyboard-breakdown",
            OperationMode::StylizedPrompt => "stylized-prompt",
            OperationMode::ImageGenerationTest => "image-generation-test",
            OperationMode::ImageToPromptAnalysis => "image-to-prompt-analysis",
            OperationMode::ImageEdit => "image-edit",
        }
    }

    /// The text-transform flavour of this mode, if it is one of the four prompt modes.
    pub fn prompt_mode(self) -> Option<PromptMode> {
        match self {
            OperationMode::ImagePromptEnhance => Some(PromptMode::ImageEnhance),
            OperationMode::VideoPromptEnhance => Some(PromptMode::VideoEnhance),
            OperationMode::StoryboardBreakdown => Some(PromptMode::Storyboard),
            OperationMode::StylizedPrompt => Some(PromptMode::Stylized),
            OperationMode::ImageGenerationTest
            | OperationMode::ImageToPromptAnalysis
            | OperationMode::ImageEdit => None,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for OperationMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        OperationMode::ALL
            .into_iter()
            .find(|mode| mode.id() == normalized)
            .ok_or_else(|| {
                let known = OperationMode::ALL
                    .iter()
                    .map(|mode| mode.id())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unknown mode '{}' (expected one of: {known})", raw.trim())
            })
    }
}

/// The four modes served by the prompt-transform call.
///
/// Kept separate from [`OperationMode`] so instruction lookups can match
/// exhaustively without a catch-all arm. Serializes under the id of its
/// operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptMode {
    #[serde(rename = "image-prompt-enhance")]
    ImageEnhance,
    #[serde(rename = "video-prompt-enhance")]
    VideoEnhance,
    #[serde(rename = "storyboard-breakdown")]
    Storyboard,
    #[serde(rename = "stylized-prompt")]
    Stylized,
}

impl PromptMode {
    pub const ALL: [PromptMode; 4] = [
        PromptMode::ImageEnhance,
        PromptMode::VideoEnhance,
        PromptMode::Storyboard,
        PromptMode::Stylized,
    ];

    pub fn operation(self) -> OperationMode {
        match self {
            PromptMode::ImageEnhance => OperationMode::ImagePromptEnhance,
            PromptMode::VideoEnhance => OperationMode::VideoPromptEnhance,
            PromptMode::Storyboard => OperationMode::StoryboardBreakdown,
            PromptMode::Stylized => OperationMode::StylizedPrompt,
        }
    }

    pub fn wants_structured_output(self) -> bool {
        matches!(self, PromptMode::Storyboard)
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation().id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Widescreen,
        AspectRatio::Tall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "square" => return Ok(AspectRatio::Square),
            "portrait" | "tall" => return Ok(AspectRatio::Tall),
            "landscape" | "wide" => return Ok(AspectRatio::Widescreen),
            _ => {}
        }
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == normalized)
            .ok_or_else(|| {
                format!("unsupported aspect ratio '{}' (expected 1:1, 3:4, 4:3, 16:9 or 9:16)", raw.trim())
            })
    }
}
