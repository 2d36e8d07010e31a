use crate::modes::OperationMode;
use crate::results::{ImageArtifact, ImageSource, OptimizedResult};

use super::routes::{route, ModeRoute, OutputSurface};

#[derive(Debug, Clone, PartialEq)]
pub enum ModeResult {
    Optimized(OptimizedResult),
    Image(ImageArtifact),
    Analysis(String),
}

impl ModeResult {
    fn fits(&self, mode: OperationMode) -> bool {
        let output = route(mode).output;
        match self {
            ModeResult::Optimized(result) => {
                Some(result.mode) == mode.prompt_mode()
                    && matches!(
                        output,
                        OutputSurface::HighlightedText | OutputSurface::SceneList
                    )
            }
            ModeResult::Image(artifact) => {
                let expected = match mode {
                    OperationMode::ImageEdit => ImageSource::Edit,
                    _ => ImageSource::Generation,
                };
                output == OutputSurface::ImagePreview && artifact.source == expected
            }
            ModeResult::Analysis(_) => output == OutputSurface::AnalysisText,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModeResult::Optimized(_) => "optimized prompt",
            ModeResult::Image(_) => "image",
            ModeResult::Analysis(_) => "analysis",
        }
    }
}

/// Identifies one submitted request so a late answer can be matched or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub mode: OperationMode,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    /// The ticket was superseded or its mode is no longer selected.
    Discarded,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("a {0} request is already in progress")]
    Busy(OperationMode),
    #[error("a {kind} result cannot be shown in {mode} mode")]
    ResultMismatch {
        mode: OperationMode,
        kind: &'static str,
    },
}

/// Tracks the selected mode and its single current result.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    mode: OperationMode,
    next_seq: u64,
    in_flight: Option<RequestTicket>,
    current: Option<ModeResult>,
}

impl Dispatcher {
    pub fn new(mode: OperationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn route(&self) -> ModeRoute {
        route(self.mode)
    }

    pub fn current(&self) -> Option<&ModeResult> {
        self.current.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Switches mode. Any result or outstanding request of the prior mode is
    /// dropped. Returns false when `mode` was already selected.
    pub fn select(&mut self, mode: OperationMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.current = None;
        self.in_flight = None;
        true
    }

    pub fn begin(&mut self) -> Result<RequestTicket, DispatchError> {
        if self.in_flight.is_some() {
            return Err(DispatchError::Busy(self.mode));
        }
        self.next_seq += 1;
        let ticket = RequestTicket {
            mode: self.mode,
            seq: self.next_seq,
        };
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: ModeResult,
    ) -> Result<Completion, DispatchError> {
        if self.in_flight != Some(ticket) || ticket.mode != self.mode {
            return Ok(Completion::Discarded);
        }
        if !result.fits(self.mode) {
            self.in_flight = None;
            return Err(DispatchError::ResultMismatch {
                mode: self.mode,
                kind: result.kind(),
            });
        }
        self.in_flight = None;
        self.current = Some(result);
        Ok(Completion::Accepted)
    }

    /// Ends a failed request. The previous result, if any, stays visible.
    pub fn fail(&mut self, ticket: RequestTicket) -> Completion {
        if self.in_flight != Some(ticket) {
            return Completion::Discarded;
        }
        self.in_flight = None;
        Completion::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::{Completion, DispatchError, Dispatcher, ModeResult};
    use crate::modes::{OperationMode, PromptMode};
    use crate::results::{ImageArtifact, ImageSource, OptimizedResult};

    fn optimized(mode: PromptMode, text: &str) -> ModeResult {
        ModeResult::Optimized(OptimizedResult {
            mode,
            original: "input".to_string(),
            optimized: text.to_string(),
            explanation: String::new(),
            tags: Vec::new(),
            sources: Vec::new(),
        })
    }

    #[test]
    fn completed_result_becomes_current() -> Result<(), DispatchError> {
        let mut dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.mode(), OperationMode::ImagePromptEnhance);

        let ticket = dispatcher.begin()?;
        assert!(dispatcher.is_busy());
        let outcome = dispatcher.complete(ticket, optimized(PromptMode::ImageEnhance, "done"))?;
        assert_eq!(outcome, Completion::Accepted);
        assert!(!dispatcher.is_busy());
        assert_eq!(
            dispatcher.current(),
            Some(&optimized(PromptMode::ImageEnhance, "done"))
        );
        Ok(())
    }

    #[test]
    fn duplicate_submission_is_refused_while_busy() -> Result<(), DispatchError> {
        let mut dispatcher = Dispatcher::new(OperationMode::ImageEdit);
        let ticket = dispatcher.begin()?;
        assert_eq!(
            dispatcher.begin(),
            Err(DispatchError::Busy(OperationMode::ImageEdit))
        );
        assert_eq!(dispatcher.fail(ticket), Completion::Accepted);
        assert!(dispatcher.begin().is_ok());
        Ok(())
    }

    #[test]
    fn switching_modes_clears_result_and_drops_late_answers() -> Result<(), DispatchError> {
        let mut dispatcher = Dispatcher::new(OperationMode::VideoPromptEnhance);
        let first = dispatcher.begin()?;
        dispatcher.complete(first, optimized(PromptMode::VideoEnhance, "v1"))?;
        assert!(dispatcher.current().is_some());

        let stale = dispatcher.begin()?;
        assert!(dispatcher.select(OperationMode::ImageGenerationTest));
        assert!(dispatcher.current().is_none());
        assert!(!dispatcher.is_busy());

        let late = dispatcher.complete(stale, optimized(PromptMode::VideoEnhance, "v2"))?;
        assert_eq!(late, Completion::Discarded);
        assert!(dispatcher.current().is_none());
        assert_eq!(dispatcher.fail(stale), Completion::Discarded);
        Ok(())
    }

    #[test]
    fn reselecting_the_same_mode_keeps_the_result() -> Result<(), DispatchError> {
        let mut dispatcher = Dispatcher::new(OperationMode::ImageToPromptAnalysis);
        let ticket = dispatcher.begin()?;
        dispatcher.complete(ticket, ModeResult::Analysis("a cat".to_string()))?;
        assert!(!dispatcher.select(OperationMode::ImageToPromptAnalysis));
        assert_eq!(
            dispatcher.current(),
            Some(&ModeResult::Analysis("a cat".to_string()))
        );
        Ok(())
    }

    #[test]
    fn failure_leaves_previous_result_untouched() -> Result<(), DispatchError> {
        let mut dispatcher = Dispatcher::new(OperationMode::ImageGenerationTest);
        let first = dispatcher.begin()?;
        let image = ModeResult::Image(ImageArtifact::new(vec![1, 2, 3], ImageSource::Generation));
        dispatcher.complete(first, image.clone())?;

        let second = dispatcher.begin()?;
        assert_eq!(dispatcher.fail(second), Completion::Accepted);
        assert_eq!(dispatcher.current(), Some(&image));
        assert!(!dispatcher.is_busy());
        Ok(())
    }

    #[test]
    fn mismatched_result_kind_is_rejected() -> Result<(), DispatchError> {
        let mut dispatcher = Dispatcher::new(OperationMode::ImageEdit);
        let ticket = dispatcher.begin()?;
        let wrong = ModeResult::Image(ImageArtifact::new(vec![9], ImageSource::Generation));
        assert_eq!(
            dispatcher.complete(ticket, wrong),
            Err(DispatchError::ResultMismatch {
                mode: OperationMode::ImageEdit,
                kind: "image",
            })
        );
        assert!(!dispatcher.is_busy());
        assert!(dispatcher.current().is_none());
        Ok(())
    }
}
