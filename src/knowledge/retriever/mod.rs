
use std::sync::Arc;
use tracing::debug;

use super::embedder::Embedder;
use super::store::KnowledgeBase;
use crate::Result;
use crate::config::RetrievalConfig;
use crate::models::{Category, KnowledgeRecord};

/// Appended to security incident queries to pull policy material towards the top
pub const SECURITY_QUERY_CLAUSE: &str =
    "This is a security incident. Follow all necessary security policy. ";

/// Threshold-filtered top-k search over the loaded knowledge base.
///
/// The category hint never restricts which records come back; it only
/// changes the query text for security incidents.
#[derive(Debug, Clone)]
pub struct Retriever {
    knowledge: Arc<KnowledgeBase>,
    embedder: Embedder,
    similarity_threshold: f32,
    max_results: usize,
}

impl Retriever {
    #[inline]
    pub fn new(knowledge: Arc<KnowledgeBase>, embedder: Embedder, config: &RetrievalConfig) -> Self {
        Self {
            knowledge,
            embedder,
            similarity_threshold: config.similarity_threshold,
            max_results: config.max_results,
        }
    }

    #[inline]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    #[inline]
    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Best-first records for `query`, at most `top_k` (the configured maximum when `None`)
    #[inline]
    pub async fn search(
        &self,
        query: &str,
        category_hint: Option<Category>,
        top_k: Option<usize>,
    ) -> Result<Vec<KnowledgeRecord>> {
        let top_k = top_k.unwrap_or(self.max_results);
        let Some(index) = self.knowledge.index().filter(|index| !index.is_empty()) else {
            debug!("Knowledge index is empty, skipping retrieval");
            return Ok(Vec::new());
        };
        if top_k == 0 || self.knowledge.is_empty() {
            return Ok(Vec::new());
        }

        let query = match category_hint {
            Some(Category::SecurityIncident) => format!("{}{}", query, SECURITY_QUERY_CLAUSE),
            _ => query.to_string(),
        };

        let query_vector = self.embedder.embed_query(&query)?;
        let candidates = index
            .search(&query_vector, top_k.min(self.knowledge.len()))
            .await?;

        let records = self.knowledge.records();
        let mut results: Vec<KnowledgeRecord> = candidates
            .into_iter()
            .filter(|&(_, score)| score >= self.similarity_threshold)
            .filter_map(|(id, score)| {
                records.get(id).map(|record| KnowledgeRecord {
                    score,
                    ..record.clone()
                })
            })
            .collect();

        // Stable sort keeps index order for equal scores
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        debug!(
            "Retrieved {} records above threshold {}",
            results.len(),
            self.similarity_threshold
        );
        Ok(results)
    }
}
