//! Query engine: retrieve, assemble, generate

use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::{AnswerStream, GenerationOrchestrator, GenerationRequest, PromptAssembler};
use crate::retrieval::Retriever;
use crate::storage::DocumentStore;
use crate::types::{Answer, Query};

/// Number of documents retrieved as context for every query
pub const CONTEXT_WINDOW: usize = 3;

/// Answers questions grounded in stored documents
pub struct QueryEngine {
    retriever: Retriever,
    assembler: PromptAssembler,
    orchestrator: GenerationOrchestrator,
}

impl QueryEngine {
    /// Compose an engine from its stages
    pub fn new(
        retriever: Retriever,
        assembler: PromptAssembler,
        orchestrator: GenerationOrchestrator,
    ) -> Self {
        Self {
            retriever,
            assembler,
            orchestrator,
        }
    }

    async fn prepare(&self, query: &Query) -> Result<GenerationRequest> {
        let question = query.text.trim();
        if question.is_empty() {
            return Err(Error::validation("Query text must not be empty"));
        }

        let matches = self.retriever.retrieve(question, CONTEXT_WINDOW).await?;
        let prompt = self.assembler.assemble(question, &matches);

        Ok(GenerationRequest::new(prompt, &matches)
            .with_model(query.model_name.clone())
            .with_params(query.params))
    }

    /// Answer with a single backend call
    pub async fn answer(&self, query: &Query) -> Result<Answer> {
        let start = Instant::now();
        let request = self.prepare(query).await?;
        let answer = self.orchestrator.generate(request).await?;

        tracing::info!(
            "Answered in {}ms ({} chars)",
            start.elapsed().as_millis(),
            answer.text.len()
        );
        Ok(answer)
    }

    /// Answer as a stream of fragments followed by the citation block
    pub async fn answer_stream(&self, query: &Query) -> Result<AnswerStream> {
        let request = self.prepare(query).await?;
        self.orchestrator.generate_stream(request).await
    }

    /// Underlying document store
    pub fn store(&self) -> &DocumentStore {
        self.retriever.store()
    }

    /// Generation stage
    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FragmentStream, HashingEmbedder, LlmProvider};
    use crate::storage::{DistanceMetric, SqliteDocumentTable, TableOptions};
    use crate::types::{DocumentMetadata, GenerationParams};
    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records prompts and echoes the question back
    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn generate(&self, prompt: &str, _model: &str, _params: &GenerationParams) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok("Paris.".to_string())
        }

        async fn generate_stream(
            &self,
            prompt: &str,
            _model: &str,
            _params: &GenerationParams,
        ) -> Result<FragmentStream> {
            self.prompts.lock().push(prompt.to_string());
            Ok(futures::stream::iter(vec![Ok("Par".to_string()), Ok("is.".to_string())]).boxed())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn engine(llm: Arc<RecordingLlm>) -> QueryEngine {
        let table =
            SqliteDocumentTable::in_memory(TableOptions::new(DistanceMetric::Cosine, 64)).unwrap();
        let store = DocumentStore::new(Arc::new(HashingEmbedder::new(64)), Arc::new(table));
        QueryEngine::new(
            Retriever::new(store),
            PromptAssembler::default(),
            GenerationOrchestrator::new(llm, "test-model", GenerationParams::default()),
        )
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let engine = engine(Arc::new(RecordingLlm::default()));
        let err = engine.answer(&Query::new("   ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(matches!(
            engine.answer_stream(&Query::new("")).await.err().unwrap(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_context_window_caps_prompt() {
        let llm = Arc::new(RecordingLlm::default());
        let engine = engine(llm.clone());
        for i in 0..5 {
            engine
                .store()
                .ingest(&format!("France fact number {}", i), DocumentMetadata::new(format!("f{}.txt", i)))
                .await
                .unwrap();
        }

        let answer = engine.answer(&Query::new("France fact")).await.unwrap();
        assert_eq!(answer.text, "Paris.");
        assert_eq!(answer.citations.lines().count(), 1 + CONTEXT_WINDOW);

        let prompt = llm.prompts.lock()[0].clone();
        assert!(prompt.contains("Context 3:"));
        assert!(!prompt.contains("Context 4:"));
    }

    #[tokio::test]
    async fn test_empty_store_still_answers() {
        let engine = engine(Arc::new(RecordingLlm::default()));

        let answer = engine.answer(&Query::new("Anything?")).await.unwrap();
        assert_eq!(answer.citations, "Sources:");

        let streamed = engine
            .answer_stream(&Query::new("Anything?"))
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(streamed.text, "Paris.");
    }
}
