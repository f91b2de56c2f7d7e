// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod lines;
pub mod ollama;
pub mod openai;

use crate::config::{Config, Provider};
use crate::error::Result;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Check that the backend is reachable and usable before generating
    async fn verify(&self) -> Result<()>;

    /// Generate with streaming tokens and cancellation support
    async fn generate(
        &self,
        prompt: &str,
        token_tx: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<String>;

    fn name(&self) -> &str;
}

pub fn create_provider(config: &Config) -> Result<Box<dyn LlmProvider>> {
    config.require_api_key()?;
    match config.provider {
        Provider::Ollama => Ok(Box::new(ollama::OllamaProvider::new(config))),
        Provider::Groq | Provider::OpenAI => Ok(Box::new(openai::OpenAiProvider::new(config))),
    }
}
