use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeskError>;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error(
        "Knowledge base artifacts are out of sync: {records} records but {vectors} indexed vectors"
    )]
    IndexMismatch { records: usize, vectors: usize },

    #[error("Knowledge base artifacts are out of sync: record {position} differs from its indexed text")]
    RecordMismatch { position: usize },

    #[error("Ingestion error: {0}")]
    Ingest(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod classifier;
pub mod commands;
pub mod config;
pub mod desk;
pub mod evaluation;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod responder;
