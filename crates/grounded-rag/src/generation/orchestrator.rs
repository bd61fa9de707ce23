//! Drives the generation backend for complete and streamed answers

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::citation::citation_block;
use crate::error::{Error, Result};
use crate::providers::{FragmentStream, LlmProvider};
use crate::types::{Answer, GenerationParams, RetrievedMatch};

/// Events buffered between the backend pump and the consumer
const STREAM_BUFFER: usize = 32;

/// Separator written before the citation block in byte streams
pub const CITATION_SEPARATOR: &str = "\n\n";

/// Payload of a stream event
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Generated text
    Text(String),
    /// Citation block, sent once after generation completes
    Citations(String),
}

/// One item of an answer stream
#[derive(Debug)]
pub enum StreamEvent {
    /// Text or citations
    Fragment(Fragment),
    /// Generation finished and citations were delivered
    End,
    /// Generation failed mid-stream; nothing follows
    Error(Error),
}

/// A prompt ready for the backend, with the citations it will carry
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Assembled prompt
    pub prompt: String,
    /// Citation block for the context documents
    pub citations: String,
    /// Model override
    pub model_name: Option<String>,
    /// Parameter overrides
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Build a request for `prompt` citing `matches`
    pub fn new(prompt: String, matches: &[RetrievedMatch]) -> Self {
        Self {
            prompt,
            citations: citation_block(matches),
            model_name: None,
            params: GenerationParams::default(),
        }
    }

    /// Use a specific model
    pub fn with_model(mut self, model_name: Option<String>) -> Self {
        self.model_name = model_name;
        self
    }

    /// Override generation parameters
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Wraps an LLM backend with defaults and citation handling
pub struct GenerationOrchestrator {
    llm: Arc<dyn LlmProvider>,
    default_model: String,
    default_params: GenerationParams,
}

impl GenerationOrchestrator {
    /// Create an orchestrator over `llm`
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        default_model: impl Into<String>,
        default_params: GenerationParams,
    ) -> Self {
        Self {
            llm,
            default_model: default_model.into(),
            default_params,
        }
    }

    /// Backend in use
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    fn resolve(&self, request: &GenerationRequest) -> (String, GenerationParams) {
        let model = request
            .model_name
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        (model, request.params.or(&self.default_params))
    }

    /// Generate a complete answer in one backend call
    pub async fn generate(&self, request: GenerationRequest) -> Result<Answer> {
        let (model, params) = self.resolve(&request);
        let text = self
            .llm
            .generate(&request.prompt, &model, &params)
            .await
            .map_err(as_generation)?;

        Ok(Answer {
            text,
            citations: request.citations,
        })
    }

    /// Start a streamed answer
    ///
    /// Fails without producing any events if the backend cannot be started
    /// or errors before its first non-empty fragment.
    pub async fn generate_stream(&self, request: GenerationRequest) -> Result<AnswerStream> {
        let (model, params) = self.resolve(&request);
        let mut fragments = self
            .llm
            .generate_stream(&request.prompt, &model, &params)
            .await
            .map_err(as_generation)?;

        let first = loop {
            match fragments.next().await {
                Some(Ok(text)) if text.is_empty() => continue,
                Some(Ok(text)) => break Some(text),
                Some(Err(e)) => return Err(as_generation(e)),
                None => break None,
            }
        };
        let fragments: FragmentStream = match first {
            Some(text) => stream::iter(std::iter::once(Ok::<_, Error>(text)))
                .chain(fragments)
                .boxed(),
            None => fragments,
        };

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(pump(fragments, tx, request.citations));

        Ok(AnswerStream::new(rx))
    }
}

fn as_generation(err: Error) -> Error {
    match err {
        Error::Generation(_) => err,
        other => Error::generation(other.to_string()),
    }
}

/// Forward backend fragments until the backend ends, fails, or the consumer leaves
async fn pump(mut fragments: FragmentStream, tx: mpsc::Sender<StreamEvent>, citations: String) {
    let mut sent = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!("Answer stream dropped after {} fragments", sent);
                return;
            }
            next = fragments.next() => next,
        };

        match next {
            Some(Ok(text)) => {
                if text.is_empty() {
                    continue;
                }
                if tx.send(StreamEvent::Fragment(Fragment::Text(text))).await.is_err() {
                    tracing::debug!("Answer stream dropped after {} fragments", sent);
                    return;
                }
                sent += 1;
            }
            Some(Err(e)) => {
                tracing::error!("Generation failed after {} fragments: {}", sent, e);
                let _ = tx.send(StreamEvent::Error(as_generation(e))).await;
                return;
            }
            None => break,
        }
    }

    // Backend stream is released before the trailer goes out
    drop(fragments);

    if tx
        .send(StreamEvent::Fragment(Fragment::Citations(citations)))
        .await
        .is_ok()
    {
        let _ = tx.send(StreamEvent::End).await;
        tracing::debug!("Answer stream completed with {} fragments", sent);
    }
}

/// Consumer side of a streamed answer
///
/// Dropping it cancels generation.
pub struct AnswerStream {
    rx: mpsc::Receiver<StreamEvent>,
    finished: bool,
}

impl AnswerStream {
    fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx, finished: false }
    }

    /// Next event, or `None` once `End` or `Error` has been returned
    ///
    /// If the producer vanishes without a terminal event, a generation
    /// error is returned in its place.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }

        match self.rx.recv().await {
            Some(event) => {
                if matches!(event, StreamEvent::End | StreamEvent::Error(_)) {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.finished = true;
                Some(StreamEvent::Error(Error::generation(
                    "Generation stopped before completion",
                )))
            }
        }
    }

    /// Drain the stream into a complete answer
    pub async fn collect_text(mut self) -> Result<Answer> {
        let mut text = String::new();
        let mut citations = String::new();

        while let Some(event) = self.next_event().await {
            match event {
                StreamEvent::Fragment(Fragment::Text(t)) => text.push_str(&t),
                StreamEvent::Fragment(Fragment::Citations(c)) => citations = c,
                StreamEvent::End => break,
                StreamEvent::Error(e) => return Err(e),
            }
        }

        Ok(Answer { text, citations })
    }

    /// Byte chunks for an HTTP body
    ///
    /// Text is written as-is and the citation block follows a blank line.
    /// A failure becomes a stream error, which aborts the response.
    pub fn into_byte_stream(self) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
        stream::unfold(self, |mut answer| async move {
            match answer.next_event().await? {
                StreamEvent::Fragment(Fragment::Text(text)) => Some((Ok(Bytes::from(text)), answer)),
                StreamEvent::Fragment(Fragment::Citations(block)) => Some((
                    Ok(Bytes::from(format!("{}{}", CITATION_SEPARATOR, block))),
                    answer,
                )),
                StreamEvent::End => None,
                StreamEvent::Error(e) => Some((Err(e), answer)),
            }
        })
    }
}
