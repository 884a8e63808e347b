//! Explanation generation through the Gemini `generateContent` API.

mod prompt;
mod scrub;
mod types;

pub use prompt::ExplanationPrompt;
pub use scrub::sanitize_api_error;

use self::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationParams, Part,
};
use super::validation::ValidatedQuery;
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub trait ExplanationGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        query: &'a ValidatedQuery,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;
}

pub struct GeminiGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    base_url: String,
    prompt: ExplanationPrompt,
}

fn build_generation_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            client: build_generation_client(config.timeout_secs),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            prompt: ExplanationPrompt::new()?,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn build_request(&self, prompt: String) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationParams {
                temperature: self.temperature,
            },
        }
    }

    async fn generate_inner(&self, query: &ValidatedQuery) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;
        let prompt = self.prompt.render(query)?;
        let url = format!(
            "{}/v1beta/{}:generateContent?key={api_key}",
            self.base_url,
            self.model_path()
        );

        let response = self
            .client
            .post(url)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| GenerationError::Request(sanitize_api_error(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request(format!(
                "Gemini API error ({status}): {}",
                sanitize_api_error(&body)
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Request(sanitize_api_error(&e.to_string())))?;

        if let Some(error) = result.error.as_ref() {
            return Err(GenerationError::Request(format!(
                "Gemini API error: {}",
                sanitize_api_error(&error.message)
            )));
        }

        extract_text(&result)
    }
}

/// Text parts of the first candidate, joined by newlines.
fn extract_text(result: &GenerateContentResponse) -> Result<String, GenerationError> {
    let text = result
        .candidates
        .as_ref()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(text)
}

impl ExplanationGenerator for GeminiGenerator {
    fn generate<'a>(
        &'a self,
        query: &'a ValidatedQuery,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>> {
        Box::pin(async move {
            let started = std::time::Instant::now();
            let result = self.generate_inner(query).await;
            match &result {
                Ok(text) => tracing::debug!(
                    model = %self.model,
                    chars = text.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "explanation generated"
                ),
                Err(error) => tracing::warn!(
                    model = %self.model,
                    error = %error,
                    "explanation generation failed"
                ),
            }
            result
        })
    }
}
