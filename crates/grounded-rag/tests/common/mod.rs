//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use std::sync::Arc;

use grounded_rag::config::{EmbeddingBackend, RagConfig};
use grounded_rag::error::{Error, Result};
use grounded_rag::providers::{FragmentStream, HashingEmbedder, LlmProvider};
use grounded_rag::server::state::AppState;
use grounded_rag::storage::{DistanceMetric, SqliteDocumentTable, TableOptions};
use grounded_rag::GenerationParams;

pub const DIMS: usize = 64;

/// What the fake backend does when asked to generate
#[derive(Clone)]
pub enum Script {
    /// Emit these fragments and finish
    Fragments(Vec<&'static str>),
    /// Refuse to start
    FailStart,
    /// Emit these fragments, then fail
    FailAfter(Vec<&'static str>),
}

/// In-process LLM that records the prompts it receives
pub struct FakeLlm {
    script: Script,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            prompts: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(fragments: Vec<&'static str>) -> Arc<Self> {
        Self::new(Script::Fragments(fragments))
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    pub fn last_model(&self) -> Option<String> {
        self.models.lock().last().cloned()
    }

    fn record(&self, prompt: &str, model: &str) {
        self.prompts.lock().push(prompt.to_string());
        self.models.lock().push(model.to_string());
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, prompt: &str, model: &str, _params: &GenerationParams) -> Result<String> {
        self.record(prompt, model);
        match &self.script {
            Script::Fragments(parts) => Ok(parts.concat()),
            Script::FailStart | Script::FailAfter(_) => Err(Error::internal("backend down")),
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        _params: &GenerationParams,
    ) -> Result<FragmentStream> {
        self.record(prompt, model);
        let items: Vec<Result<String>> = match &self.script {
            Script::Fragments(parts) => parts.iter().map(|p| Ok(p.to_string())).collect(),
            Script::FailStart => return Err(Error::internal("backend down")),
            Script::FailAfter(parts) => parts
                .iter()
                .map(|p| Ok(p.to_string()))
                .chain(std::iter::once(Err(Error::internal("connection reset"))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Configuration with hashing embeddings sized for tests
pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.provider = EmbeddingBackend::Hashing;
    config.embeddings.dimensions = DIMS;
    config
}

/// Application state over an in-memory table
pub fn test_state(llm: Arc<FakeLlm>) -> AppState {
    let table = SqliteDocumentTable::in_memory(TableOptions::new(DistanceMetric::Cosine, DIMS))
        .expect("in-memory table");
    AppState::from_parts(
        test_config(),
        Arc::new(HashingEmbedder::new(DIMS)),
        Arc::new(table),
        llm,
    )
}
