//! Ollama client and providers for embeddings and chat generation

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::embedding::EmbeddingProvider;
use super::llm::{FragmentStream, LlmProvider};
use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::types::GenerationParams;

/// Ollama API client with automatic retry
pub struct OllamaClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl From<&GenerationParams> for ChatOptions {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            num_predict: params.max_length,
        }
    }
}

/// One line of a chat response (streaming or not)
#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::internal("Retry loop ran zero times")))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let endpoint = format!("{}/api/embeddings", self.base_url);
        let url = endpoint.as_str();

        self.retry_request(|| async move {
            let response = self
                .client
                .post(url)
                .json(&EmbedRequest { model, prompt: text })
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let embed_response: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Non-streaming chat completion with retry
    pub async fn chat(&self, model: &str, prompt: &str, params: &GenerationParams) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.base_url);
        let url = endpoint.as_str();
        tracing::info!("Generating answer with model: {}", model);

        self.retry_request(|| async move {
            let response = self
                .client
                .post(url)
                .json(&chat_request(model, prompt, params, false))
                .send()
                .await
                .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::generation(format!(
                    "Generation failed: HTTP {} - {}",
                    status, body
                )));
            }

            let chunk: ChatChunk = response
                .json()
                .await
                .map_err(|e| Error::generation(format!("Failed to parse generation response: {}", e)))?;
            if let Some(message) = chunk.error {
                return Err(Error::generation(message));
            }

            Ok(chunk.message.map(|m| m.content).unwrap_or_default())
        })
        .await
    }

    /// Streaming chat completion
    ///
    /// Only opening the stream is retried; once fragments flow, errors end it.
    pub async fn chat_stream(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream> {
        let endpoint = format!("{}/api/chat", self.base_url);
        let url = endpoint.as_str();
        tracing::info!("Streaming answer with model: {}", model);

        let response = self
            .retry_request(|| async move {
                let response = self
                    .client
                    .post(url)
                    .json(&chat_request(model, prompt, params, true))
                    .send()
                    .await
                    .map_err(|e| Error::generation(format!("Stream request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::generation(format!(
                        "Stream failed: HTTP {}",
                        response.status()
                    )));
                }
                Ok(response)
            })
            .await?;

        Ok(ndjson_fragments(response.bytes_stream()))
    }
}

fn chat_request<'a>(
    model: &'a str,
    prompt: &'a str,
    params: &GenerationParams,
    stream: bool,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        stream,
        options: ChatOptions::from(params),
    }
}

struct NdjsonState<E> {
    bytes: BoxStream<'static, std::result::Result<Bytes, E>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String>>,
    done: bool,
}

impl<E> NdjsonState<E> {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.parse_line(&line);
            if self.done {
                return;
            }
        }
    }

    fn parse_line(&mut self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match serde_json::from_str::<ChatChunk>(text) {
            Ok(chunk) => {
                if let Some(message) = chunk.error {
                    self.pending.push_back(Err(Error::generation(message)));
                    self.done = true;
                    return;
                }
                if let Some(message) = chunk.message.filter(|m| !m.content.is_empty()) {
                    self.pending.push_back(Ok(message.content));
                }
                if chunk.done {
                    self.done = true;
                }
            }
            Err(e) => {
                self.pending.push_back(Err(Error::generation(format!(
                    "Malformed stream line: {}",
                    e
                ))));
                self.done = true;
            }
        }
    }
}

/// Turn a byte stream of newline-delimited chat chunks into text fragments
///
/// Lines may be split across network chunks; partial lines are buffered.
pub fn ndjson_fragments<S, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = NdjsonState {
        bytes: bytes.boxed(),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(Error::generation(format!("Stream error: {}", e))));
                    state.done = true;
                }
                None => {
                    // Final line without a trailing newline
                    let rest = std::mem::take(&mut state.buffer);
                    state.parse_line(&rest);
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
}

impl OllamaEmbedder {
    /// Create from an existing OllamaClient
    pub fn new(client: Arc<OllamaClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            dimensions: config.dimensions,
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::embedding("Cannot embed empty text"));
        }

        let embedding = self.client.embed(&self.model, text).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
}

impl OllamaLlm {
    /// Create from an existing OllamaClient
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &str, model: &str, params: &GenerationParams) -> Result<String> {
        self.client.chat(model, prompt, params).await
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream> {
        self.client.chat_stream(model, prompt, params).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
