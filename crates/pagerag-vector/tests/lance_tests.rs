use pagerag_core::{Chunk, ChunkMetadata, IndexedChunk, VectorIndex};
use pagerag_vector::LanceIndex;
use tempfile::TempDir;

fn item(id: &str, source: &str, page: u32, vector: Vec<f32>) -> IndexedChunk {
    IndexedChunk {
        chunk: Chunk { id: id.to_string(), page, text: format!("content of {id}") },
        metadata: ChunkMetadata { page, source: source.to_string() },
        vector,
    }
}

#[test]
fn lance_index_upsert_query_delete() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "pdf_chunks_test", 3).expect("open");
    assert_eq!(index.count().expect("count"), 0);
    assert!(index.query(&[1.0, 0.0, 0.0], 5).expect("empty query").is_empty());

    index
        .upsert(&[
            item("manual_001", "manual.pdf", 1, vec![1.0, 0.0, 0.0]),
            item("manual_002", "manual.pdf", 2, vec![0.0, 1.0, 0.0]),
            item("other_001", "other.pdf", 1, vec![0.0, 0.0, 1.0]),
        ])
        .expect("upsert");
    assert_eq!(index.count().expect("count"), 3);

    let result = index.query(&[0.9, 0.1, 0.0], 2).expect("query");
    assert_eq!(result.len(), 2);
    assert_eq!(result.hits[0].text, "content of manual_001");
    assert_eq!(result.hits[0].metadata, ChunkMetadata { page: 1, source: "manual.pdf".to_string() });
    assert!(result.hits[0].distance <= result.hits[1].distance);

    // same id overwrites
    index.upsert(&[item("manual_001", "manual.pdf", 1, vec![0.0, 0.0, 1.0])]).expect("re-upsert");
    assert_eq!(index.count().expect("count"), 3);

    assert_eq!(index.delete_source("manual.pdf").expect("delete"), 2);
    assert_eq!(index.count().expect("count"), 1);
}

#[test]
fn lance_index_delete_stale_and_sources() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "chunks", 2).expect("open");
    index
        .upsert(&[
            item("a_001", "a.pdf", 1, vec![1.0, 0.0]),
            item("a_002", "a.pdf", 1, vec![1.0, 0.0]),
            item("b_001", "b.txt", 1, vec![0.0, 1.0]),
        ])
        .expect("upsert");
    assert_eq!(index.sources().expect("sources"), vec!["a.pdf".to_string(), "b.txt".to_string()]);
    assert_eq!(index.delete_stale("a.pdf", &["a_001".to_string()]).expect("stale"), 1);
    assert_eq!(index.count().expect("count"), 2);
    assert_eq!(index.delete_stale("a.pdf", &["a_001".to_string()]).expect("stale again"), 0);
}

#[test]
fn lance_index_persists_across_reopen() {
    let tmp = TempDir::new().expect("tmp");
    {
        let index = LanceIndex::open(tmp.path(), "chunks", 2).expect("open");
        index.upsert(&[item("a_001", "a.txt", 1, vec![1.0, 0.0])]).expect("upsert");
    }
    let index = LanceIndex::open(tmp.path(), "chunks", 2).expect("reopen");
    assert_eq!(index.count().expect("count"), 1);
}

#[test]
fn lance_index_rejects_wrong_dimension() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(tmp.path(), "chunks", 4).expect("open");
    assert!(index.upsert(&[item("a_001", "a.txt", 1, vec![1.0, 0.0])]).is_err());
    assert!(index.query(&[1.0], 1).is_err());
}
