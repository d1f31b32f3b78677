
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::llm::EmbeddingService;
use crate::{DeskError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Batches texts through an [`EmbeddingService`] and checks the vectors that come back
#[derive(Clone)]
pub struct Embedder {
    service: Arc<dyn EmbeddingService>,
    batch_size: usize,
    dimension: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("batch_size", &self.batch_size)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl Embedder {
    #[inline]
    pub fn new(service: Arc<dyn EmbeddingService>, batch_size: usize, dimension: usize) -> Self {
        Self {
            service,
            batch_size: batch_size.max(1),
            dimension,
        }
    }

    #[inline]
    pub fn from_config(service: Arc<dyn EmbeddingService>, config: &OpenAiConfig) -> Self {
        Self::new(
            service,
            config.batch_size as usize,
            config.embedding_dimension as usize,
        )
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed every text, one upstream call per batch, preserving input order
    #[inline]
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_count = texts.len().div_ceil(self.batch_size);
        debug!(
            "Embedding {} texts in {} batches of up to {}",
            texts.len(),
            batch_count,
            self.batch_size
        );

        let bar = if batch_count > 1 && console::user_attended_stderr() {
            ProgressBar::new(texts.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding knowledge records")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let batch_vectors = self.service.embed_texts(batch)?;
            self.check_batch(batch.len(), &batch_vectors)?;
            vectors.extend(batch_vectors);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        Ok(vectors)
    }

    #[inline]
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| DeskError::Embedding("No embedding returned for query".to_string()))
    }

    fn check_batch(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
        if vectors.len() != expected {
            return Err(DeskError::Embedding(format!(
                "Expected {} embeddings but received {}",
                expected,
                vectors.len()
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(DeskError::Embedding(format!(
                "Expected {}-dimensional embeddings but received {} dimensions",
                self.dimension,
                bad.len()
            )));
        }

        Ok(())
    }
}
