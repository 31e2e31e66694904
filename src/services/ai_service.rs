use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const OPENAI_DEFAULT_MAX_TOKENS: u32 = 1024;
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "claude")]
    Anthropic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "claude"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Anthropic),
            _ => Err(format!("unknown provider: {s}")),
        }
    }
}

impl Provider {
    fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiRequest {
    pub prompt: String,
    pub credential: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// Text-generation service: one prompt in, raw reply text out.
pub trait AiGateway {
    fn complete(
        &self,
        request: &AiRequest,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// HTTP adapter over the two supported providers.
pub struct AiConnector {
    provider: Provider,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

impl AiConnector {
    pub fn new(provider: Provider) -> Self {
        let base_url = match provider {
            Provider::OpenAi => OPENAI_BASE_URL,
            Provider::Anthropic => ANTHROPIC_BASE_URL,
        };
        Self {
            provider,
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, request: &AiRequest) -> serde_json::Value {
        let default_max = match self.provider {
            Provider::OpenAi => OPENAI_DEFAULT_MAX_TOKENS,
            Provider::Anthropic => ANTHROPIC_DEFAULT_MAX_TOKENS,
        };
        json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "max_tokens": request.max_output_tokens.unwrap_or(default_max),
        })
    }

    async fn error_from_response(&self, response: reqwest::Response) -> AppError {
        let status = response.status();
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.to_string())
            });
        AppError::Gateway(format!(
            "{} API error: {message}",
            self.provider.display_name()
        ))
    }

    async fn call_openai(&self, request: &AiRequest) -> Result<String, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&request.credential)
            .json(&self.request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let body: OpenAiResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Gateway("OpenAI API error: empty completion".to_string()))
    }

    async fn call_anthropic(&self, request: &AiRequest) -> Result<String, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &request.credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let body: AnthropicResponse = response.json().await?;
        body.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AppError::Gateway("Anthropic API error: empty completion".to_string()))
    }
}

impl AiGateway for AiConnector {
    async fn complete(&self, request: &AiRequest) -> Result<String, AppError> {
        tracing::debug!(
            provider = %self.provider,
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "sending AI request"
        );
        let reply = match self.provider {
            Provider::OpenAi => self.call_openai(request).await,
            Provider::Anthropic => self.call_anthropic(request).await,
        }?;
        tracing::debug!(
            reply_chars = reply.len(),
            preview = %reply.chars().take(200).collect::<String>(),
            "received AI reply"
        );
        Ok(reply)
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned replies in order and records every request it saw.
    #[derive(Default)]
    pub struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub requests: Mutex<Vec<AiRequest>>,
    }

    impl ScriptedGateway {
        pub fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl AiGateway for ScriptedGateway {
        async fn complete(&self, request: &AiRequest) -> Result<String, AppError> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(AppError::Gateway(message)),
                None => Err(AppError::Gateway("no scripted reply left".to_string())),
            }
        }
    }
}
