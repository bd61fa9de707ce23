//! Retrieval of context documents for a question

mod search;

pub use search::Retriever;
