//! Vector store adapter (C6).
//!
//! `spec.md` §4.6 specifies this purely as a capability contract with no
//! named backend. At personal-PKM scale (hundreds to low thousands of
//! notes) a dependency on an external vector database service would be
//! disproportionate, so [`FlatVectorStore`] is a self-contained flat file
//! per collection plus a brute-force cosine scan — the right complexity
//! class here, and the [`VectorStore`] trait is the real seam if a future
//! ANN index or external service ever replaces it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{NoteweaveError, Result};

/// One embedded record in a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// A single hit returned from [`VectorStore::query`].
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, String>,
    pub distance: f32,
}

/// Capability contract for a vector store adapter.
pub trait VectorStore: Send + Sync {
    fn open_or_create(&mut self, name: &str, metadata: HashMap<String, String>) -> Result<()>;
    fn add(&mut self, collection: &str, record: VectorRecord) -> Result<()>;
    fn add_batch(&mut self, collection: &str, records: Vec<VectorRecord>) -> Result<()>;
    fn delete(&mut self, collection: &str, ids: &[String]) -> Result<()>;
    fn get(&self, collection: &str, ids: Option<&[String]>) -> Result<Vec<VectorRecord>>;
    fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>>;
}

/// Retry a vector-store mutation once before surfacing its error, per
/// `spec.md` §7's `VectorStoreError` contract. Callers that mutate other
/// in-memory state alongside a vector-store call should perform the
/// vector-store side first and only apply their own mutation once this
/// returns `Ok`, so a still-failing retry leaves nothing to roll back.
pub fn retry_once<T>(mut op: impl FnMut() -> Result<T>) -> Result<T> {
    match op() {
        Ok(value) => Ok(value),
        Err(first_err) => {
            tracing::warn!(error = %first_err, "vector store operation failed, retrying once");
            op()
        }
    }
}

/// Cosine distance: `1 - cosine_similarity`. Zero for identical direction,
/// up to 2 for opposite vectors.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let a = Array1::from_vec(a.to_vec());
    let b = Array1::from_vec(b.to_vec());
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

/// One `.bin` file per collection under `<knowledge_base_directory>/vectors/`.
pub struct FlatVectorStore {
    root: PathBuf,
    collections: HashMap<String, Vec<VectorRecord>>,
}

impl FlatVectorStore {
    pub fn new(knowledge_base_directory: &Path) -> Self {
        FlatVectorStore {
            root: knowledge_base_directory.join("vectors"),
            collections: HashMap::new(),
        }
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.bin"))
    }

    fn load_collection(&self, name: &str) -> Result<Vec<VectorRecord>> {
        let path = self.collection_path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes =
            std::fs::read(&path).map_err(|e| NoteweaveError::io(path.clone(), e))?;
        let (records, _) = bincode::serde::decode_from_slice::<Vec<VectorRecord>, _>(
            &bytes,
            bincode::config::standard(),
        )
        .map_err(|e| NoteweaveError::vector_store(format!("corrupt collection {name}: {e}")))?;
        Ok(records)
    }

    fn save_collection(&self, name: &str, records: &[VectorRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| NoteweaveError::io(self.root.clone(), e))?;
        let bytes = bincode::serde::encode_to_vec(records, bincode::config::standard())
            .map_err(|e| NoteweaveError::vector_store(e.to_string()))?;
        let path = self.collection_path(name);
        let tmp = path.with_extension("bin.tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| NoteweaveError::io(tmp.clone(), e))?;
        std::fs::rename(&tmp, &path).map_err(|e| NoteweaveError::io(path, e))?;
        Ok(())
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Vec<VectorRecord>> {
        if !self.collections.contains_key(name) {
            let loaded = self.load_collection(name)?;
            self.collections.insert(name.to_string(), loaded);
        }
        Ok(self.collections.get_mut(name).unwrap())
    }
}

impl VectorStore for FlatVectorStore {
    fn open_or_create(&mut self, name: &str, _metadata: HashMap<String, String>) -> Result<()> {
        self.collection_mut(name)?;
        Ok(())
    }

    fn add(&mut self, collection: &str, record: VectorRecord) -> Result<()> {
        self.add_batch(collection, vec![record])
    }

    fn add_batch(&mut self, collection: &str, records: Vec<VectorRecord>) -> Result<()> {
        let entries = self.collection_mut(collection)?;
        for record in records {
            entries.retain(|r| r.id != record.id);
            entries.push(record);
        }
        let snapshot = entries.clone();
        self.save_collection(collection, &snapshot)
    }

    fn delete(&mut self, collection: &str, ids: &[String]) -> Result<()> {
        let entries = self.collection_mut(collection)?;
        entries.retain(|r| !ids.contains(&r.id));
        let snapshot = entries.clone();
        self.save_collection(collection, &snapshot)
    }

    fn get(&self, collection: &str, ids: Option<&[String]>) -> Result<Vec<VectorRecord>> {
        let records = self
            .collections
            .get(collection)
            .cloned()
            .map(Ok)
            .unwrap_or_else(|| self.load_collection(collection))?;
        Ok(match ids {
            Some(ids) => records.into_iter().filter(|r| ids.contains(&r.id)).collect(),
            None => records,
        })
    }

    fn query(&self, collection: &str, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let records = self.get(collection, None)?;
        let mut scored: Vec<QueryHit> = records
            .into_iter()
            .map(|r| {
                let distance = cosine_distance(&r.embedding, embedding);
                QueryHit {
                    id: r.id,
                    document: r.document,
                    metadata: r.metadata,
                    distance,
                }
            })
            .collect();
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            document: format!("doc-{id}"),
            embedding,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn add_then_query_finds_nearest() {
        let dir = tempdir().unwrap();
        let mut store = FlatVectorStore::new(dir.path());
        store.open_or_create("local__model", HashMap::new()).unwrap();
        store
            .add_batch(
                "local__model",
                vec![
                    record("a", vec![1.0, 0.0]),
                    record("b", vec![0.0, 1.0]),
                ],
            )
            .unwrap();

        let hits = store.query("local__model", &[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn delete_removes_record() {
        let dir = tempdir().unwrap();
        let mut store = FlatVectorStore::new(dir.path());
        store.add("c", record("x", vec![1.0, 1.0])).unwrap();
        store.delete("c", &["x".to_string()]).unwrap();
        assert!(store.get("c", None).unwrap().is_empty());
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempdir().unwrap();
        {
            let mut store = FlatVectorStore::new(dir.path());
            store.add("c", record("x", vec![1.0, 0.0])).unwrap();
        }
        let store = FlatVectorStore::new(dir.path());
        let records = store.get("c", None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "x");
    }

    #[test]
    fn retry_once_succeeds_on_second_attempt() {
        let mut attempts = 0;
        let result = retry_once(|| {
            attempts += 1;
            if attempts < 2 {
                Err(NoteweaveError::vector_store("transient"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(attempts, 2);
    }

    #[test]
    fn retry_once_surfaces_error_after_two_failures() {
        let mut attempts = 0;
        let result: Result<()> = retry_once(|| {
            attempts += 1;
            Err(NoteweaveError::vector_store("persistent"))
        });
        assert!(result.is_err());
        assert_eq!(attempts, 2);
    }

    #[test]
    fn add_batch_dedups_by_id() {
        let dir = tempdir().unwrap();
        let mut store = FlatVectorStore::new(dir.path());
        store.add("c", record("x", vec![1.0, 0.0])).unwrap();
        store.add("c", record("x", vec![0.0, 1.0])).unwrap();
        let records = store.get("c", None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].embedding, vec![0.0, 1.0]);
    }
}
