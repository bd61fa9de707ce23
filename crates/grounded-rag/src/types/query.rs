//! Query request types

use serde::{Deserialize, Serialize};

/// Optional generation overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Top-k sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl GenerationParams {
    /// Fill unset fields from `defaults`
    pub fn or(self, defaults: &GenerationParams) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature.or(defaults.temperature),
            top_p: self.top_p.or(defaults.top_p),
            top_k: self.top_k.or(defaults.top_k),
            max_length: self.max_length.or(defaults.max_length),
        }
    }
}

/// A question to answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// The question text
    pub text: String,
    /// Generation model override
    pub model_name: Option<String>,
    /// Generation parameter overrides
    pub params: GenerationParams,
}

impl Query {
    /// Create a new query
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Use a specific generation model
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Override generation parameters
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Body of `/respond` and `/respond_stream`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question
    pub body: String,
    /// Generation model (optional)
    #[serde(default)]
    pub model_name: Option<String>,
    /// Generation overrides
    #[serde(flatten)]
    pub params: GenerationParams,
}

impl From<QueryRequest> for Query {
    fn from(request: QueryRequest) -> Self {
        Query {
            text: request.body,
            model_name: request.model_name.filter(|m| !m.trim().is_empty()),
            params: request.params,
        }
    }
}

/// `doc_name` query parameter of the document routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocNameParams {
    /// Document name
    pub doc_name: String,
}

/// Body of `/update_document`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataPatch {
    /// Metadata key to set
    pub key: String,
    /// New value
    pub value: String,
}
