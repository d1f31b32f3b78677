// External model services
// The pipeline only talks to these traits so tests can swap in fakes

#[cfg(test)]
pub(crate) mod fakes;
pub mod openai;

pub use openai::OpenAiClient;

use crate::Result;

/// Turns text into fixed-length vectors. One call is one upstream request.
pub trait EmbeddingService: Send + Sync {
    /// Returns exactly one vector per input, in input order
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Generates free-form text from a system instruction and a user prompt
pub trait CompletionService: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}
