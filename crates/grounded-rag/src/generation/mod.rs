//! Answer generation: prompt assembly, backend orchestration and citations

pub mod citation;
pub mod orchestrator;
pub mod prompt;

pub use citation::{citation_block, CITATION_HEADER};
pub use orchestrator::{
    AnswerStream, Fragment, GenerationOrchestrator, GenerationRequest, StreamEvent,
    CITATION_SEPARATOR,
};
pub use prompt::PromptAssembler;
