//! Groq API client for transcription (Whisper) and generation (chat
//! completions).

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AiError, AiProvider};

const TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Whisper model used for transcription.
const TRANSCRIPTION_MODEL: &str = "whisper-large-v3";

/// Model used for HTML generation.
const GENERATION_MODEL: &str = "llama-3.1-70b-versatile";

/// Generation sampling parameters.
const GENERATION_TEMPERATURE: f32 = 0.5;
const GENERATION_MAX_TOKENS: u32 = 2170;
const GENERATION_TOP_P: f32 = 1.0;

/// Request timeout. Generation of a full HTML document can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Request body for the chat completions endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Transcription response (`verbose_json` format; only `text` is used).
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Error envelope returned by the provider on non-success statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Groq-backed [`AiProvider`]. Holds a shared `reqwest::Client` so TLS
/// handshakes are reused across requests.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }
}

impl AiProvider for GroqClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: String,
        mime_type: String,
    ) -> Result<String, AiError> {
        log::info!("Transcribing audio file: {} ({} bytes)", file_name, audio.len());

        let file_part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", TRANSCRIPTION_MODEL)
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status.as_u16(), response.text().await.unwrap_or_default()));
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        log::info!("Transcription successful: {} chars", transcription.text.len());
        Ok(transcription.text)
    }

    async fn generate(&self, prompt: String) -> Result<String, AiError> {
        log::info!("Sending prompt to Groq API ({} chars)", prompt.len());

        let request = ChatRequest {
            model: GENERATION_MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
            top_p: GENERATION_TOP_P,
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status.as_u16(), response.text().await.unwrap_or_default()));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::Parse("Empty choices in completion response".to_string()))?;

        log::info!("Received completion from Groq API ({} chars)", content.len());
        Ok(content)
    }
}

/// Build an [`AiError::Api`], preferring the provider's structured error
/// message when the body parses as the usual envelope.
fn api_error(status: u16, body: String) -> AiError {
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    };
    log::error!("Groq API error ({}): {}", status, message);
    AiError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_structured_message() {
        let err = api_error(401, r#"{"error":{"message":"Invalid API Key"}}"#.to_string());
        match err {
            AiError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = api_error(502, "Bad Gateway".to_string());
        match err {
            AiError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
