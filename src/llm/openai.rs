//! Client for OpenAI-compatible `/chat/completions` endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    CompletionRequest,
    ModelBackend,
};
use crate::core::{
    http::{
        ensure_success,
        http_client,
    },
    YomicardError,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, YomicardError> {
        if api_key.trim().is_empty() {
            return Err(YomicardError::Config("OPENAI_API_KEY is not set".to_string()));
        }

        Ok(Self {
            client: http_client()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn first_content(response: ChatCompletionResponse) -> Option<String> {
    response.choices.into_iter().next().and_then(|choice| choice.message.content)
}

#[async_trait]
impl ModelBackend for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, YomicardError> {
        debug!("POST {} (model {})", self.endpoint(), request.model);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let response: ChatCompletionResponse = ensure_success(resp).await?.json().await?;
        Ok(first_content(response))
    }
}
