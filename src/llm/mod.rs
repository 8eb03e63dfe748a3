//! Language-model backend.
//!
//! The pipeline only needs "messages in, text out". Processors build a [`CompletionRequest`]
//! and hand it to whichever [`ModelBackend`] was constructed at startup.

use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::core::{
    GenerationError,
    Stage,
    YomicardError,
};

pub mod openai;

pub use openai::OpenAiClient;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Model id and sampling parameters, shared by every call in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { model: DEFAULT_MODEL.to_string(), max_tokens: DEFAULT_MAX_TOKENS, temperature: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn new(settings: &GenerationSettings, instructions: &str, input: String) -> Self {
        Self {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            messages: vec![ChatMessage::system(instructions.trim()), ChatMessage::user(input)],
        }
    }
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Sends one request. `Ok(None)` means the backend answered without any text.
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, YomicardError>;
}

/// Runs one call for `stage`, turning a missing or blank answer into `EmptyResponse`.
pub async fn generate(
    backend: &dyn ModelBackend,
    stage: Stage,
    request: &CompletionRequest,
) -> Result<String, YomicardError> {
    let content = backend.complete(request).await?;
    match content {
        Some(text) if !text.trim().is_empty() => {
            debug!("{} response:\n{}", stage, text);
            Ok(text)
        }
        _ => Err(GenerationError::EmptyResponse { stage }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    #[test]
    fn test_request_shape() {
        let request = CompletionRequest::new(
            &GenerationSettings::default(),
            "\n  instructions\n",
            "猫".to_string(),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "instructions");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "猫");
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_content() {
        let backend = ScriptedBackend::new(vec![None, Some("  \n".to_string())]);
        let request = CompletionRequest::new(&GenerationSettings::default(), "x", String::new());

        for _ in 0..2 {
            let err = generate(&backend, Stage::Reading, &request).await.unwrap_err();
            assert!(matches!(
                err,
                YomicardError::Generation(GenerationError::EmptyResponse { stage: Stage::Reading })
            ));
        }
    }
}
