use super::*;
use tempfile::TempDir;

fn unit(values: &[f32]) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    values.iter().map(|v| v / norm).collect()
}

fn labels(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("record {}", i)).collect()
}

fn sample_vectors() -> Vec<Vec<f32>> {
    vec![
        unit(&[1.0, 0.0, 0.0, 0.0]),
        unit(&[0.0, 1.0, 0.0, 0.0]),
        unit(&[0.7, 0.7, 0.0, 0.0]),
        unit(&[0.0, 0.0, 1.0, 0.2]),
        unit(&[0.9, 0.1, 0.1, 0.0]),
    ]
}

#[tokio::test]
async fn search_orders_by_inner_product() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");

    let index = SimilarityIndex::build(&db_path, &labels(5), &sample_vectors())
        .await
        .expect("index should build");
    assert_eq!(index.len(), 5);
    assert_eq!(index.dimension(), 4);

    let hits = index
        .search(&[1.0, 0.0, 0.0, 0.0], 3)
        .await
        .expect("search should succeed");

    let ids: Vec<usize> = hits.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![0, 4, 2]);
    assert!((hits[0].1 - 1.0).abs() < 1e-4);
    assert!(hits.windows(2).all(|pair| pair[0].1 >= pair[1].1));
}

#[tokio::test]
async fn k_is_clamped_to_stored_count() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = SimilarityIndex::build(&temp_dir.path().join("vectors"), &labels(5), &sample_vectors())
        .await
        .expect("index should build");

    let hits = index
        .search(&[0.0, 1.0, 0.0, 0.0], 50)
        .await
        .expect("search should succeed");
    assert_eq!(hits.len(), 5);

    let none = index
        .search(&[0.0, 1.0, 0.0, 0.0], 0)
        .await
        .expect("search should succeed");
    assert!(none.is_empty());
}

#[tokio::test]
async fn reopened_index_returns_identical_neighbors() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");
    let probe = unit(&[0.3, 0.5, 0.1, 0.8]);

    let built = SimilarityIndex::build(&db_path, &labels(5), &sample_vectors())
        .await
        .expect("index should build");
    let before = built.search(&probe, 5).await.expect("search should succeed");
    drop(built);

    let reopened = SimilarityIndex::open(&db_path)
        .await
        .expect("open should succeed")
        .expect("index should exist");
    assert_eq!(reopened.len(), 5);
    assert_eq!(reopened.dimension(), 4);
    assert_eq!(
        reopened.contents().await.expect("scan should succeed"),
        labels(5)
    );

    let after = reopened
        .search(&probe, 5)
        .await
        .expect("search should succeed");
    assert_eq!(before, after);
}

#[tokio::test]
async fn rebuild_replaces_previous_vectors() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");

    SimilarityIndex::build(&db_path, &labels(5), &sample_vectors())
        .await
        .expect("index should build");
    let rebuilt = SimilarityIndex::build(&db_path, &labels(2), &[vec![0.0, 1.0], vec![1.0, 0.0]])
        .await
        .expect("index should rebuild");

    assert_eq!(rebuilt.len(), 2);
    assert_eq!(rebuilt.dimension(), 2);

    let reopened = SimilarityIndex::open(&db_path)
        .await
        .expect("open should succeed")
        .expect("index should exist");
    assert_eq!(reopened.len(), 2);
}

#[tokio::test]
async fn open_missing_index_returns_none() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = SimilarityIndex::open(&temp_dir.path().join("vectors"))
        .await
        .expect("open should succeed");
    assert!(missing.is_none());
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");

    assert!(SimilarityIndex::build(&db_path, &[], &[]).await.is_err());
    assert!(
        SimilarityIndex::build(&db_path, &labels(2), &[vec![1.0, 0.0], vec![1.0]])
            .await
            .is_err()
    );

    assert!(
        SimilarityIndex::build(&db_path, &labels(4), &sample_vectors())
            .await
            .is_err()
    );

    let index = SimilarityIndex::build(&db_path, &labels(5), &sample_vectors())
        .await
        .expect("index should build");
    let result = index.search(&[1.0, 0.0], 2).await;
    assert!(matches!(result, Err(DeskError::Index(_))));
}

#[tokio::test]
async fn remove_deletes_persisted_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");

    SimilarityIndex::build(&db_path, &labels(5), &sample_vectors())
        .await
        .expect("index should build");
    SimilarityIndex::remove(&db_path).expect("remove should succeed");

    assert!(!db_path.exists());
    assert!(
        SimilarityIndex::open(&db_path)
            .await
            .expect("open should succeed")
            .is_none()
    );
}

#[tokio::test]
async fn equal_scores_keep_build_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let vectors = vec![
        vec![0.0, 1.0, 0.0, 0.0],
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0, 0.0],
    ];
    let index = SimilarityIndex::build(&temp_dir.path().join("vectors"), &labels(4), &vectors)
        .await
        .expect("index should build");

    let hits = index
        .search(&[1.0, 0.0, 0.0, 0.0], 2)
        .await
        .expect("search should succeed");

    let ids: Vec<usize> = hits.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert!((hits[0].1 - hits[1].1).abs() < 1e-6);
}
