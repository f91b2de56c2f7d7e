// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

//! OpenAI-compatible chat completions, used for both OpenAI and Groq.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::LlmProvider;
use super::lines::LineBuffer;
use crate::config::{Config, Provider};
use crate::error::{Error, Result};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

pub struct OpenAiProvider {
    client: Client,
    provider: String,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        let default_base = match config.provider {
            Provider::Groq => GROQ_BASE_URL,
            _ => OPENAI_BASE_URL,
        };

        Self {
            client,
            provider: config.provider.to_string(),
            base_url: config
                .openai_base_url
                .as_deref()
                .unwrap_or(default_base)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            temperature: config.temperature,
            max_tokens: config.num_predict,
            max_retries: config.max_retries,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Provider {
            provider: self.provider.clone(),
            message: message.into(),
        }
    }

    /// POST with retries on connection failures, 429 and 5xx.
    async fn send_with_retry(&self, body: &ChatRequest<'_>) -> Result<Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let retryable = match &result {
                Ok(resp) => {
                    resp.status() == StatusCode::TOO_MANY_REQUESTS
                        || resp.status().is_server_error()
                }
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if !retryable || attempt >= self.max_retries {
                return result.map_err(|e| {
                    if e.is_timeout() {
                        self.error("request timed out")
                    } else {
                        self.error(e.to_string())
                    }
                });
            }

            attempt += 1;
            warn!(
                provider = %self.provider,
                attempt,
                delay_ms = backoff.as_millis() as u64,
                "transient provider failure, retrying"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn verify(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(self.error("API key not configured"));
        }

        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.error(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(self.error("invalid API key"));
        }

        debug!(provider = %self.provider, status = %response.status(), "provider verified");
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &str,
        token_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.send_with_retry(&request) => response?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.error(format!("HTTP {status}: {body}")));
        }

        let mut stream = response.bytes_stream();
        let mut full_response = String::new();
        let mut lines = LineBuffer::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled);
                }
                chunk = stream.next() => {
                    let Some(chunk) = chunk else { break };

                    let chunk = chunk.map_err(|e| self.error(e.to_string()))?;

                    lines.push(&chunk);

                    while let Some(line) = lines.next_line() {
                        let line = line.trim();
                        if line.is_empty() || line == "data: [DONE]" {
                            continue;
                        }

                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };

                        if let Ok(chunk) = serde_json::from_str::<ChatChunk>(data) {
                            for choice in &chunk.choices {
                                if let Some(ref content) = choice.delta.content {
                                    let _ = token_tx.send(content.clone()).await;
                                    full_response.push_str(content);
                                }
                                if choice.finish_reason.is_some() {
                                    return Ok(full_response.trim().to_string());
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(full_response.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.provider
    }
}
