//! In-memory graph state: nodes, edges and their four derived indexes
//! (title, category, tag, hierarchy), plus the stores C7 owns outright
//! (C1 hash tracker, C3 link cache, C4 notes index, C6 vector store).
//!
//! Every mutation here is synchronous and infallible except where it
//! touches disk (hash tracker, vector store) — those return [`Result`]
//! and callers are expected to treat a single note's add/remove as one
//! transaction across all four stores (`spec.md` §7).

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::hash::HashTracker;
use crate::linkcache::{LinkCache, LinkMetadata};
use crate::notes::{IndexedNote, NotesIndex};
use crate::vectorstore::VectorStore;

use super::types::{EdgeKey, GraphEdge, GraphNode};

pub struct GraphState {
    pub nodes_by_id: HashMap<String, GraphNode>,
    pub edges_by_id: HashMap<EdgeKey, GraphEdge>,
    pub title_to_id: HashMap<String, String>,
    pub category_index: HashMap<String, HashSet<String>>,
    pub tag_index: HashMap<String, HashSet<String>>,
    pub hierarchy_index: HashMap<String, HashSet<String>>,
    pub link_cache: LinkCache,
    pub hash_tracker: HashTracker,
    pub notes_index: NotesIndex,
    pub vector_store: Box<dyn VectorStore>,
    pub vector_collection: String,
}

impl GraphState {
    /// Insert (or overwrite) a node and fold it into the four indexes.
    /// Title collisions are allowed but logged — `title_to_id` is
    /// last-writer-wins, matching the open-question resolution in
    /// `DESIGN.md`.
    pub fn insert_node(&mut self, node: GraphNode) {
        if let Some(existing) = self.title_to_id.get(&node.title) {
            if existing != &node.id {
                tracing::warn!(
                    title = %node.title,
                    existing_id = %existing,
                    new_id = %node.id,
                    "title collision: overwriting title index entry"
                );
            }
        }
        self.title_to_id.insert(node.title.clone(), node.id.clone());
        self.category_index
            .entry(node.category.clone())
            .or_default()
            .insert(node.id.clone());
        for tag in &node.tags {
            self.tag_index.entry(tag.clone()).or_default().insert(node.id.clone());
        }
        if let Some(parent) = &node.parent_id {
            self.hierarchy_index
                .entry(parent.clone())
                .or_default()
                .insert(node.id.clone());
        }
        self.nodes_by_id.insert(node.id.clone(), node);
    }

    /// Remove a node and everything derived from it: index entries,
    /// incident edges, link-cache entries, hash/mapping bookkeeping, and
    /// its vector-store record(s) (including any chunk records).
    ///
    /// The vector-store delete happens first, retried once on failure
    /// (`spec.md` §7): nothing else is mutated until it succeeds, so a
    /// delete that still fails after the retry leaves the graph's indexes
    /// untouched rather than needing to be unwound.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        if !self.nodes_by_id.contains_key(id) {
            return Ok(());
        }

        let ids_to_drop: Vec<String> = self
            .vector_store
            .get(&self.vector_collection, None)?
            .into_iter()
            .map(|r| r.id)
            .filter(|record_id| record_id == id || record_id.starts_with(&format!("{id}_chunk_")))
            .collect();
        if !ids_to_drop.is_empty() {
            let collection = self.vector_collection.clone();
            let store = &mut self.vector_store;
            crate::vectorstore::retry_once(|| store.delete(&collection, &ids_to_drop))?;
        }

        let node = self.nodes_by_id.remove(id).expect("checked above");

        if self.title_to_id.get(&node.title).map(String::as_str) == Some(id) {
            self.title_to_id.remove(&node.title);
        }
        if let Some(set) = self.category_index.get_mut(&node.category) {
            set.remove(id);
            if set.is_empty() {
                self.category_index.remove(&node.category);
            }
        }
        for tag in &node.tags {
            if let Some(set) = self.tag_index.get_mut(tag) {
                set.remove(id);
                if set.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        if let Some(parent) = &node.parent_id {
            if let Some(set) = self.hierarchy_index.get_mut(parent) {
                set.remove(id);
                if set.is_empty() {
                    self.hierarchy_index.remove(parent);
                }
            }
        }
        self.hierarchy_index.remove(id);

        self.edges_by_id
            .retain(|_, e| e.source_id != id && e.target_id != id);
        self.link_cache.remove_node(id);

        if let Some(path) = &node.file_path {
            self.hash_tracker.remove(path)?;
            self.notes_index.remove(std::path::Path::new(path));
        }

        Ok(())
    }

    /// Register (or replace) an edge. At most one edge per
    /// `(source, target, kind)` tuple.
    pub fn upsert_edge(&mut self, edge: GraphEdge) {
        self.edges_by_id.insert(edge.key(), edge);
    }

    pub fn register_link(&mut self, from: &str, to: &str, metadata: LinkMetadata) {
        self.link_cache.add_link(from, to, metadata);
    }

    pub fn valid_ids(&self) -> HashSet<String> {
        self.nodes_by_id.keys().cloned().collect()
    }

    pub fn indexed_note_for(node: &GraphNode) -> Option<IndexedNote> {
        node.file_path.as_ref().map(|path| IndexedNote {
            path: std::path::PathBuf::from(path),
            title: node.title.clone(),
            body: node.content.clone(),
            category: node.category.clone(),
            tags: node.tags.clone(),
        })
    }
}
