//! Prompt templates for RAG generation

use crate::config::PromptConfig;
use crate::types::RetrievedMatch;

/// Maximum number of retrieved documents rendered into a prompt
pub const MAX_CONTEXT_DOCUMENTS: usize = 3;

/// Renders retrieved documents and a question into one generation prompt
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    language: String,
    decline_phrase: String,
}

impl PromptAssembler {
    /// Create an assembler from prompt configuration
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            language: config.language.clone(),
            decline_phrase: config.decline_phrase.clone(),
        }
    }

    /// Phrase the model must use when the context lacks the answer
    pub fn decline_phrase(&self) -> &str {
        &self.decline_phrase
    }

    /// Build the full prompt
    ///
    /// Context blocks come first in rank order, then the grounding
    /// instructions, then the question. Output depends only on the inputs.
    pub fn assemble(&self, question: &str, matches: &[RetrievedMatch]) -> String {
        let context = Self::build_context(matches);

        format!(
            r#"{context}

Answer only in {language}. If any part of your answer is in another language, translate it into {language}.
Use only the context above. If it does not contain the answer, reply exactly "{decline}" and do not guess.

Question: {question}
Detailed answer:"#,
            context = context,
            language = self.language,
            decline = self.decline_phrase,
            question = question.trim(),
        )
    }

    /// Render labeled context blocks for the first few matches
    pub fn build_context(matches: &[RetrievedMatch]) -> String {
        if matches.is_empty() {
            return "No context documents were found for this question.".to_string();
        }

        matches
            .iter()
            .take(MAX_CONTEXT_DOCUMENTS)
            .enumerate()
            .map(|(i, m)| {
                format!(
                    "Context {}:\n{}\nSource: {}",
                    i + 1,
                    m.text.trim(),
                    m.metadata.provenance()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(&PromptConfig::default())
    }
}
