use crate::modes::{OperationMode, PromptMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSurface {
    FreeText,
    /// Free text plus an aspect-ratio picker.
    FreeTextWithAspectRatio,
    /// Image upload; an instruction may optionally override the default one.
    ImageOnly,
    ImageAndInstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSurface {
    HighlightedText,
    SceneList,
    ImagePreview,
    AnalysisText,
}

impl OutputSurface {
    /// Whether the view offers a read-aloud trigger for the result.
    pub fn offers_speech(self) -> bool {
        matches!(self, OutputSurface::HighlightedText | OutputSurface::SceneList)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterCall {
    TransformPrompt(PromptMode),
    GenerateImage,
    AnalyzeImage,
    EditImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRoute {
    pub mode: OperationMode,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub input: InputSurface,
    pub output: OutputSurface,
    pub call: AdapterCall,
}

pub fn route(mode: OperationMode) -> ModeRoute {
    let (title, subtitle, input, output, call) = match mode {
        OperationMode::ImagePromptEnhance => (
            "Image prompt enhancement",
            "Turn a plain description into a professional Midjourney / Stable Diffusion prompt",
            InputSurface::FreeText,
            OutputSurface::HighlightedText,
            AdapterCall::TransformPrompt(PromptMode::ImageEnhance),
        ),
        OperationMode::VideoPromptEnhance => (
            "Video prompt enhancement",
            "Produce cinematic, motion-aware direction for video models",
            InputSurface::FreeText,
            OutputSurface::HighlightedText,
            AdapterCall::TransformPrompt(PromptMode::VideoEnhance),
        ),
        OperationMode::StoryboardBreakdown => (
            "Storyboard breakdown",
            "Split an idea into a film-industry shot list",
            InputSurface::FreeText,
            OutputSurface::SceneList,
            AdapterCall::TransformPrompt(PromptMode::Storyboard),
        ),
        OperationMode::StylizedPrompt => (
            "Lovart style",
            "Elegant, luxurious, detail-rich art direction",
            InputSurface::FreeText,
            OutputSurface::HighlightedText,
            AdapterCall::TransformPrompt(PromptMode::Stylized),
        ),
        OperationMode::ImageGenerationTest => (
            "Image generation test",
            "Try an optimized prompt and preview the render",
            InputSurface::FreeTextWithAspectRatio,
            OutputSurface::ImagePreview,
            AdapterCall::GenerateImage,
        ),
        OperationMode::ImageToPromptAnalysis => (
            "Image to prompt",
            "Upload a reference image and extract a reusable prompt",
            InputSurface::ImageOnly,
            OutputSurface::AnalysisText,
            AdapterCall::AnalyzeImage,
        ),
        OperationMode::ImageEdit => (
            "Edit by prompt",
            "Describe a local change or restyle and let the model edit the image",
            InputSurface::ImageAndInstruction,
            OutputSurface::ImagePreview,
            AdapterCall::EditImage,
        ),
    };
    ModeRoute {
        mode,
        title,
        subtitle,
        input,
        output,
        call,
    }
}

pub fn routes() -> impl Iterator<Item = ModeRoute> {
    OperationMode::ALL.into_iter().map(route)
}
