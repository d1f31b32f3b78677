
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{CompletionRequest, CompletionService, EmbeddingService};
use crate::DeskError;
use crate::config::OpenAiConfig;

const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for the OpenAI compatible `/embeddings` and `/chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
    retry_delay: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let base_url = config
            .api_url()
            .context("Failed to build API URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.resolved_api_key(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            agent,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; later retries back off exponentially
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Check that the API answers at all
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("models")
            .context("Failed to build ping URL")?;

        debug!("Pinging API at {}", url);

        self.make_request_with_retry(|| {
            let mut request = self.agent.get(url.as_str());
            if let Some(auth) = self.authorization() {
                request = request.header("Authorization", auth.as_str());
            }
            request
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to ping API")?;

        info!("API at {} is reachable", self.base_url);
        Ok(())
    }

    /// Request embeddings for one batch of texts
    #[inline]
    pub fn create_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let url = self
            .base_url
            .join("embeddings")
            .context("Failed to build embeddings URL")?;

        let request_json = serde_json::to_string(&EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        })
        .context("Failed to serialize embeddings request")?;

        let response_text = self
            .post_json(&url, &request_json)
            .context("Failed to generate embeddings")?;

        let mut response: EmbeddingsResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embeddings response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        // Entries carry their input position; keep input order even if the server reorders
        response
            .data
            .sort_by_key(|entry| entry.index.unwrap_or(usize::MAX));

        Ok(response
            .data
            .into_iter()
            .map(|entry| entry.embedding)
            .collect())
    }

    /// Run a two-message chat completion and return the trimmed reply
    #[inline]
    pub fn create_chat_completion(&self, request: &CompletionRequest) -> Result<String> {
        let url = self
            .base_url
            .join("chat/completions")
            .context("Failed to build chat completions URL")?;

        let request_json = serde_json::to_string(&ChatRequest {
            model: &self.chat_model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        })
        .context("Failed to serialize chat request")?;

        let response_text = self
            .post_json(&url, &request_json)
            .context("Failed to generate chat completion")?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Chat response contained no message content"))?;

        debug!("Chat completion returned {} characters", content.len());
        Ok(content.trim().to_string())
    }

    fn authorization(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| format!("Bearer {}", key))
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<String> {
        self.make_request_with_retry(|| {
            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            if let Some(auth) = self.authorization() {
                request = request.header("Authorization", auth.as_str());
            }
            request
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 || *status == 429 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay = self
                            .retry_delay
                            .saturating_mul(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) as u32);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

impl EmbeddingService for OpenAiClient {
    fn embed_texts(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.create_embeddings(texts)
            .map_err(|e| DeskError::Embedding(format!("{:#}", e)))
    }
}

impl CompletionService for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> crate::Result<String> {
        self.create_chat_completion(request)
            .map_err(|e| DeskError::Completion(format!("{:#}", e)))
    }
}
