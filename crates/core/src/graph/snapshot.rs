//! Persistence of the compiled graph to `enhanced_graph.json` (`spec.md`
//! §3/§4.7). Loading is deliberately tolerant: a missing, truncated, or
//! schema-mismatched file degrades to an empty graph with a warning,
//! never a hard failure — `init()` must always be able to start a fresh
//! vault cleanly.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{EdgeKey, GraphEdge, GraphNode};
use crate::error::{NoteweaveError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMetadata {
    saved_at: DateTime<Utc>,
    total_nodes: usize,
    total_edges: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    metadata: SnapshotMetadata,
}

pub fn snapshot_path(knowledge_base_directory: &Path) -> std::path::PathBuf {
    knowledge_base_directory.join("enhanced_graph.json")
}

/// Serialize every node and edge to `enhanced_graph.json`, atomically.
pub fn save(
    knowledge_base_directory: &Path,
    nodes: &HashMap<String, GraphNode>,
    edges: &HashMap<EdgeKey, GraphEdge>,
) -> Result<()> {
    let snapshot = Snapshot {
        nodes: nodes.values().cloned().collect(),
        edges: edges.values().cloned().collect(),
        metadata: SnapshotMetadata {
            saved_at: Utc::now(),
            total_nodes: nodes.len(),
            total_edges: edges.len(),
        },
    };
    let content = serde_json::to_string_pretty(&snapshot)?;
    crate::fsutil::atomic_write(&snapshot_path(knowledge_base_directory), &content)
}

/// Load nodes and edges back out of `enhanced_graph.json`. Returns empty
/// maps (logged, not erred) when the file is absent or unreadable.
pub fn load(
    knowledge_base_directory: &Path,
) -> Result<(HashMap<String, GraphNode>, HashMap<EdgeKey, GraphEdge>)> {
    let path = snapshot_path(knowledge_base_directory);
    if !path.exists() {
        return Ok((HashMap::new(), HashMap::new()));
    }

    let content = fs::read_to_string(&path).map_err(|e| NoteweaveError::io(path.clone(), e))?;
    let snapshot: Snapshot = match serde_json::from_str(&content) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "discarding malformed graph snapshot, starting empty");
            return Ok((HashMap::new(), HashMap::new()));
        }
    };

    let nodes = snapshot
        .nodes
        .into_iter()
        .map(|n| (n.id.clone(), n))
        .collect();

    let mut edges = HashMap::new();
    for edge in snapshot.edges {
        edges.insert(edge.key(), edge);
    }

    Ok((nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            title: "Title".to_string(),
            content: "body".to_string(),
            category: "Research".to_string(),
            tags: vec![],
            metadata: HashMap::new(),
            content_hash: "abc".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            file_path: None,
            parent_id: None,
            children_ids: vec![],
        }
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let dir = tempdir().unwrap();
        let (nodes, edges) = load(dir.path()).unwrap();
        assert!(nodes.is_empty());
        assert!(edges.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let mut nodes = HashMap::new();
        nodes.insert("note_1".to_string(), node("note_1"));
        save(dir.path(), &nodes, &HashMap::new()).unwrap();

        let (loaded_nodes, loaded_edges) = load(dir.path()).unwrap();
        assert_eq!(loaded_nodes.len(), 1);
        assert!(loaded_edges.is_empty());
    }

    #[test]
    fn malformed_snapshot_degrades_to_empty() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(snapshot_path(dir.path()), "{not valid json").unwrap();
        let (nodes, edges) = load(dir.path()).unwrap();
        assert!(nodes.is_empty());
        assert!(edges.is_empty());
    }
}
