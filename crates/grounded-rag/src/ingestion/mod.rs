//! Document ingestion with multi-format text extraction

mod parser;
mod pipeline;

pub use parser::{extract, ExtractedText};
pub use pipeline::{IngestPipeline, UploadedFile};
