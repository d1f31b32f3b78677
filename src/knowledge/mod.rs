// Knowledge retrieval: ingestion, embedding, the vector index and its persisted pair

pub mod catalog;
pub mod embedder;
pub mod index;
pub mod ingest;
pub mod retriever;
pub mod store;

pub use catalog::{CategoryCatalog, CategoryInfo};
pub use embedder::Embedder;
pub use index::SimilarityIndex;
pub use retriever::Retriever;
pub use store::{KnowledgeBase, KnowledgePaths};
