//! Text-generation capability
//!
//! "given a prompt, return generated text, fails on timeout". The client
//! enforces an explicit finite timeout and reports it as a distinct error
//! so callers can fall back instead of hanging.

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for one generation call
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            timeout: Duration::from_secs(30),
        }
    }
}

impl GenerationOptions {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Trait for the generation capability
#[async_trait]
pub trait Generator: Send + Sync {
    async fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Ollama-compatible generation client
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Per-call deadline is enforced via tokio::time::timeout;
            // this is the transport-level ceiling.
            .timeout(Duration::from_secs(config.timeout_secs.saturating_add(5)))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: format!("{}/api/generate", config.url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| AppError::Generation {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(parsed.response)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn invoke(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        match tokio::time::timeout(options.timeout, self.generate(prompt, options)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::GenerationTimeout {
                timeout_ms: options.timeout.as_millis() as u64,
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
