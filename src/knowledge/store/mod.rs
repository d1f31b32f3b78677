//! Paired persistence of the record list and its vector index.
//!
//! Record `i` in `knowledge_items.json` is vector `i` in the index, and the
//! index keeps the text each vector was embedded from. The two artifacts are
//! loaded together or rebuilt together; a load that finds them disagreeing in
//! length or text is a fatal error.


use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use super::embedder::Embedder;
use super::index::SimilarityIndex;
use super::ingest::{SourceDocuments, ingest};
use crate::config::Config;
use crate::models::KnowledgeRecord;
use crate::{DeskError, Result};

/// Locations of the two persisted artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgePaths {
    pub records: PathBuf,
    pub vectors: PathBuf,
}

impl KnowledgePaths {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            records: config.records_path(),
            vectors: config.vector_database_path(),
        }
    }

    fn staging_records(&self) -> PathBuf {
        self.records.with_extension("json.tmp")
    }
}

/// The loaded record list and the index built over it. Read-only once constructed.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    records: Vec<KnowledgeRecord>,
    index: Option<SimilarityIndex>,
}

impl KnowledgeBase {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn records(&self) -> &[KnowledgeRecord] {
        &self.records
    }

    #[inline]
    pub fn index(&self) -> Option<&SimilarityIndex> {
        self.index.as_ref()
    }

    /// True when there is an index to search
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.index.as_ref().is_some_and(|index| !index.is_empty())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load the persisted pair if both artifacts exist, otherwise ingest the sources and persist a new pair
    #[inline]
    pub async fn load_or_build(config: &Config, embedder: &Embedder) -> Result<Self> {
        let paths = KnowledgePaths::from_config(config);

        if let Some(knowledge) = Self::load(&paths).await? {
            if knowledge
                .index()
                .is_some_and(|index| index.dimension() == embedder.dimension())
            {
                return Ok(knowledge);
            }
            warn!(
                "Persisted index does not match the configured embedding dimension {}, rebuilding",
                embedder.dimension()
            );
        }

        Self::rebuild(config, embedder).await
    }

    /// Ingest every source document from scratch and persist the new pair
    #[inline]
    pub async fn rebuild(config: &Config, embedder: &Embedder) -> Result<Self> {
        info!("Building knowledge base from source documents");
        let sources = SourceDocuments::load(config)?;
        let records = ingest(&sources)?;
        Self::build(records, embedder, &KnowledgePaths::from_config(config)).await
    }

    /// Embed `records`, index them and write both artifacts
    #[inline]
    pub async fn build(
        records: Vec<KnowledgeRecord>,
        embedder: &Embedder,
        paths: &KnowledgePaths,
    ) -> Result<Self> {
        // Invalidate the old pair first so a crash mid-build never leaves a stale but matching pair
        remove_file_if_exists(&paths.records).await?;

        if records.is_empty() {
            warn!("No knowledge records to index; retrieval will return nothing");
            SimilarityIndex::remove(&paths.vectors)?;
            return Ok(Self::empty());
        }

        let texts: Vec<String> = records.iter().map(|record| record.text.clone()).collect();
        let vectors = embedder.embed(&texts)?;
        let index = SimilarityIndex::build(&paths.vectors, &texts, &vectors).await?;

        if let Some(parent) = paths.records.parent() {
            fs::create_dir_all(parent).await?;
        }
        let staging = paths.staging_records();
        fs::write(&staging, serde_json::to_vec(&records)?).await?;
        fs::rename(&staging, &paths.records).await?;

        info!(
            "Knowledge base built and saved with {} records",
            records.len()
        );

        Ok(Self {
            records,
            index: Some(index),
        })
    }

    /// Load the persisted pair. `None` when either artifact is missing.
    #[inline]
    pub async fn load(paths: &KnowledgePaths) -> Result<Option<Self>> {
        if !paths.records.exists() {
            return Ok(None);
        }

        let Some(index) = SimilarityIndex::open(&paths.vectors).await? else {
            return Ok(None);
        };

        let bytes = fs::read(&paths.records).await?;
        let records: Vec<KnowledgeRecord> = serde_json::from_slice(&bytes)?;

        if records.len() != index.len() {
            return Err(DeskError::IndexMismatch {
                records: records.len(),
                vectors: index.len(),
            });
        }

        let contents = index.contents().await?;
        if let Some(position) = records
            .iter()
            .zip(&contents)
            .position(|(record, text)| record.text != *text)
        {
            return Err(DeskError::RecordMismatch { position });
        }

        info!("Loaded {} knowledge records from disk", records.len());
        Ok(Some(Self {
            records,
            index: Some(index),
        }))
    }
}

async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
