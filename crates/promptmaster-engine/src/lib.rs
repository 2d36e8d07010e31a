//! Model-invocation layer: turns one user action into one `generateContent`
//! round trip and normalizes whatever comes back.

mod adapter;
mod instructions;
mod response;
mod transport;

use promptmaster_contracts::results::ImageSource;
use thiserror::Error;

pub use adapter::GeminiAdapter;
pub use instructions::{
    instruction, tags_for, ANALYSIS_INSTRUCTION, EXPLANATION_OPTIMIZED, EXPLANATION_PARSE_FAILED,
    EXPLANATION_STORYBOARD, SPEECH_PREFIX, VOICE_NAME,
};
pub use transport::{
    ApiKeySource, GenerateTransport, HttpTransport, RetryPolicy, GENERIC_FAILURE_MESSAGE,
};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("remote call failed{}: {message}", status_suffix(.status))]
    Remote { status: Option<u16>, message: String },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{}", no_image_message(.0))]
    NoImage(ImageSource),
    #[error("speech synthesis failed: no audio returned")]
    NoAudio,
    #[error("invalid image input: {0}")]
    InvalidImageInput(String),
    #[error("could not decode service response: {0}")]
    Decode(String),
    #[error("no API key available: {0}")]
    MissingCredential(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

fn no_image_message(source: &ImageSource) -> &'static str {
    match source {
        ImageSource::Generation => "no image produced",
        ImageSource::Edit => "image edit failed: no image returned",
    }
}

#[cfg(test)]
mod tests {
    use promptmaster_contracts::results::ImageSource;

    use super::AdapterError;

    #[test]
    fn error_messages_name_the_failed_outcome() {
        assert_eq!(
            AdapterError::NoImage(ImageSource::Generation).to_string(),
            "no image produced"
        );
        assert_eq!(
            AdapterError::NoImage(ImageSource::Edit).to_string(),
            "image edit failed: no image returned"
        );
        assert_eq!(
            AdapterError::Remote {
                status: Some(403),
                message: "API key not valid".to_string(),
            }
            .to_string(),
            "remote call failed (403): API key not valid"
        );
        assert_eq!(
            AdapterError::Remote {
                status: None,
                message: "quota".to_string(),
            }
            .to_string(),
            "remote call failed: quota"
        );
    }
}
