#[cfg(test)]
mod tests;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase, Select},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{DeskError, Result};

const TABLE_NAME: &str = "knowledge";

/// A scored hit: position of the vector in build order, and its inner-product similarity
pub type Neighbor = (usize, f32);

/// Exact inner-product nearest neighbour index persisted with LanceDB.
///
/// Vector `i` is stored with `row_id = i` next to the text it was embedded
/// from, so hits map straight back onto the record list the index was built
/// from. The index is immutable once built.
pub struct SimilarityIndex {
    connection: Connection,
    dimension: usize,
    len: usize,
}

impl std::fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl SimilarityIndex {
    /// Build a fresh index at `db_path`, replacing whatever was there.
    /// `contents[i]` is the text `vectors[i]` was embedded from.
    #[inline]
    pub async fn build(db_path: &Path, contents: &[String], vectors: &[Vec<f32>]) -> Result<Self> {
        if contents.len() != vectors.len() {
            return Err(DeskError::Index(format!(
                "Got {} texts for {} vectors",
                contents.len(),
                vectors.len()
            )));
        }

        let dimension = vectors
            .first()
            .map(Vec::len)
            .filter(|&dim| dim > 0)
            .ok_or_else(|| DeskError::Index("Cannot build an index without vectors".to_string()))?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(DeskError::Index(format!(
                "Inconsistent vector dimensions: expected {}, found {}",
                dimension,
                bad.len()
            )));
        }

        std::fs::create_dir_all(db_path).map_err(|e| {
            DeskError::Index(format!("Failed to create vector database directory: {}", e))
        })?;
        let connection = connect(db_path).await?;

        drop_table_if_exists(&connection).await?;
        connection
            .create_empty_table(TABLE_NAME, create_schema(dimension))
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to create table: {}", e)))?;

        let record_batch = create_record_batch(contents, vectors, dimension)?;
        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to insert vectors: {}", e)))?;

        info!(
            "Built vector index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self {
            connection,
            dimension,
            len: vectors.len(),
        })
    }

    /// Open a previously built index, or `None` if nothing was persisted at `db_path`
    #[inline]
    pub async fn open(db_path: &Path) -> Result<Option<Self>> {
        if !db_path.exists() {
            return Ok(None);
        }

        let connection = connect(db_path).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to list tables: {}", e)))?;

        if !table_names.iter().any(|name| name == TABLE_NAME) {
            debug!("No knowledge table found at {}", db_path.display());
            return Ok(None);
        }

        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to get table schema: {}", e)))?;
        if schema.field_with_name("content").is_err() {
            debug!("Knowledge table at {} has no content column", db_path.display());
            return Ok(None);
        }

        let dimension = schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                DeskError::Index("Could not find vector column or determine dimension".to_string())
            })?;

        let len = table
            .count_rows(None)
            .await
            .map_err(|e| DeskError::Index(format!("Failed to count rows: {}", e)))?;

        debug!(
            "Opened vector index with {} vectors of dimension {}",
            len, dimension
        );

        Ok(Some(Self {
            connection,
            dimension,
            len,
        }))
    }

    /// Delete the persisted index directory, if any
    #[inline]
    pub fn remove(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_dir_all(db_path).map_err(|e| {
                DeskError::Index(format!("Failed to remove vector database: {}", e))
            })?;
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Stored texts in build order
    #[inline]
    pub async fn contents(&self) -> Result<Vec<String>> {
        if self.len == 0 {
            return Ok(Vec::new());
        }

        let table = self
            .connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to open table: {}", e)))?;

        let mut stream = table
            .query()
            .select(Select::columns(&["row_id", "content"]))
            .limit(self.len)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to scan table: {}", e)))?;

        let mut contents: Vec<Option<String>> = vec![None; self.len];
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to read scan stream: {}", e)))?
        {
            let row_ids = row_id_column(&batch)?;
            let texts = batch
                .column_by_name("content")
                .ok_or_else(|| DeskError::Index("Missing content column".to_string()))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| DeskError::Index("Invalid content column type".to_string()))?;

            for row in 0..batch.num_rows() {
                let id = row_ids.value(row) as usize;
                let slot = contents.get_mut(id).ok_or_else(|| {
                    DeskError::Index(format!(
                        "Scan returned row {} but the index holds {} vectors",
                        id, self.len
                    ))
                })?;
                *slot = Some(texts.value(row).to_string());
            }
        }

        contents
            .into_iter()
            .enumerate()
            .map(|(id, text)| {
                text.ok_or_else(|| DeskError::Index(format!("Row {} is missing from the index", id)))
            })
            .collect()
    }

    /// Top `k` neighbours by descending inner product; `k` is clamped to the stored count
    #[inline]
    pub async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let k = k.min(self.len);
        if k == 0 {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.dimension {
            return Err(DeskError::Index(format!(
                "Query has {} dimensions but the index stores {}",
                query_vector.len(),
                self.dimension
            )));
        }

        debug!("Searching for {} nearest neighbours", k);

        let table = self
            .connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to open table: {}", e)))?;

        let mut stream = table
            .vector_search(query_vector)
            .map_err(|e| DeskError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Dot)
            .limit(k)
            .execute()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to execute search: {}", e)))?;

        let mut neighbors = Vec::with_capacity(k);
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| DeskError::Index(format!("Failed to read result stream: {}", e)))?
        {
            neighbors.extend(self.parse_search_batch(&batch)?);
        }

        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<Neighbor>> {
        let row_ids = row_id_column(batch)?;

        let distances = batch
            .column_by_name("_distance")
            .ok_or_else(|| DeskError::Index("Missing _distance column".to_string()))?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| DeskError::Index("Invalid _distance column type".to_string()))?;

        let mut neighbors = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let id = row_ids.value(row) as usize;
            if id >= self.len {
                return Err(DeskError::Index(format!(
                    "Search returned row {} but the index holds {} vectors",
                    id, self.len
                )));
            }

            // Dot distance is 1 - <a, b>
            let distance = if distances.is_null(row) {
                1.0
            } else {
                distances.value(row)
            };
            neighbors.push((id, 1.0 - distance));
        }

        Ok(neighbors)
    }
}

fn row_id_column(batch: &RecordBatch) -> Result<&UInt32Array> {
    batch
        .column_by_name("row_id")
        .ok_or_else(|| DeskError::Index("Missing row_id column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| DeskError::Index("Invalid row_id column type".to_string()))
}

async fn connect(db_path: &Path) -> Result<Connection> {
    lancedb::connect(&db_path.to_string_lossy())
        .execute()
        .await
        .map_err(|e| DeskError::Index(format!("Failed to connect to LanceDB: {}", e)))
}

async fn drop_table_if_exists(connection: &Connection) -> Result<()> {
    let table_names = connection
        .table_names()
        .execute()
        .await
        .map_err(|e| DeskError::Index(format!("Failed to list tables for drop: {}", e)))?;

    if table_names.iter().any(|name| name == TABLE_NAME) {
        info!("Dropping existing knowledge table");
        connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(|e| DeskError::Index(format!("Failed to drop table: {}", e)))?;
    }

    Ok(())
}

fn create_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("row_id", DataType::UInt32, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
    ]))
}

fn create_record_batch(
    contents: &[String],
    vectors: &[Vec<f32>],
    dimension: usize,
) -> Result<RecordBatch> {
    let row_ids = (0..vectors.len())
        .map(|id| {
            u32::try_from(id)
                .map_err(|_| DeskError::Index(format!("Too many vectors for one index: {}", id)))
        })
        .collect::<Result<Vec<u32>>>()?;

    let flat_values: Vec<f32> = vectors.iter().flatten().copied().collect();
    let values_array = Float32Array::from(flat_values);
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| DeskError::Index(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(UInt32Array::from(row_ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents.to_vec())),
    ];

    RecordBatch::try_new(create_schema(dimension), arrays)
        .map_err(|e| DeskError::Index(format!("Failed to create record batch: {}", e)))
}
