use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::GenerateError;
use crate::prompt::ChatRequest;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Anything that can turn a chat request into completion text.
pub trait Completer: Send + Sync {
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(url: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self, GenerateError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(ChatClient {
            http: builder.build()?,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl Completer for ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerateError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "completion response");
        read_completion(status, &body)
    }
}

/// Classify a raw HTTP response into completion text or an error.
pub fn read_completion(status: u16, body: &str) -> Result<String, GenerateError> {
    if !(200..300).contains(&status) {
        return Err(match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(env) => GenerateError::Service {
                status,
                message: env.error.message,
            },
            Err(_) => GenerateError::Transport(format!("HTTP {} with unreadable error body", status)),
        });
    }

    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerateError::Transport(format!("malformed response envelope: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(GenerateError::EmptyResponse)
}
