//! Transcription and generation provider interface.
//!
//! The HTTP handlers only see the [`AiProvider`] trait; the Groq
//! implementation lives in [`groq`] and tests substitute a mock.

pub mod groq;
pub mod markers;

use std::future::Future;

pub use groq::GroqClient;
pub use markers::{split_generated, GeneratedApp};

/// Errors that can occur talking to the transcription/generation provider.
#[derive(Debug)]
pub enum AiError {
    /// Network/HTTP error
    Network(String),
    /// Provider returned a non-success status
    Api { status: u16, message: String },
    /// Failed to parse the provider response
    Parse(String),
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::Network(e) => write!(f, "Network error: {}", e),
            AiError::Api { status, message } => {
                write!(f, "Provider API error ({}): {}", status, message)
            }
            AiError::Parse(e) => write!(f, "Failed to parse provider response: {}", e),
        }
    }
}

impl std::error::Error for AiError {}

/// External speech-to-text and text-generation provider.
///
/// Both operations are hard failures for the current request when they
/// error; callers do not retry.
pub trait AiProvider: Send + Sync + 'static {
    /// Transcribe raw audio bytes to text.
    fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: String,
        mime_type: String,
    ) -> impl Future<Output = Result<String, AiError>> + Send;

    /// Send a prompt to the text-generation endpoint and return the full
    /// accumulated completion text. Marker extraction is a separate step,
    /// see [`markers::split_generated`].
    fn generate(&self, prompt: String) -> impl Future<Output = Result<String, AiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = AiError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_network_error_display() {
        let err = AiError::Network("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
