//! The compiled knowledge graph (C7): the single entry point that owns a
//! [`state::GraphState`] behind a `tokio::sync::RwLock` and exposes every
//! read/write operation the rest of the system (CLI, watcher, an external
//! HTTP/agent layer) needs. This is the only module that touches more than
//! one of C1/C3/C4/C5/C6 at a time — everything else talks to exactly one
//! of those stores.
//!
//! Mutating operations (`sync`, `process_path`, `add_note_from_content`)
//! take the write guard for as short a span as the cross-store invariant
//! allows; reads (`search_*`, `get_*`) take the read guard.

pub mod chunk;
pub mod resolve;
pub mod search;
pub mod snapshot;
pub mod state;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::{Config, EmbeddingProviderKind};
use crate::embedding::{EmbeddingProvider, LocalProvider, RemoteProvider};
use crate::error::{NoteweaveError, Result};
use crate::hash::HashTracker;
use crate::linkcache::LinkCache;
use crate::logging::ResourceMetrics;
use crate::note::{self, NoteFrontmatter, ParsedNote};
use crate::notes::{self, NotesIndex};
use crate::vectorstore::{FlatVectorStore, VectorRecord, VectorStore};
use crate::{log_resource_metrics, trace_time};

use state::GraphState;
pub use types::{
    FileMatches, GraphData, GraphEdgeSummary, GraphNode, GraphNodeSummary, GraphStatistics,
    HierarchyNode, SearchResult, SourceType, UnifiedResult,
};

/// Outcome of folding one changed file into the graph during [`KnowledgeGraph::sync`].
enum FileOutcome {
    Unchanged,
    Added,
    Updated,
}

/// Summary of one [`KnowledgeGraph::sync`] pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub errors: Vec<String>,
    pub orphaned_hash_entries_removed: usize,
    pub orphaned_vectors_removed: usize,
    pub duration_ms: u128,
}

/// The knowledge graph: notes compiled into nodes/edges, with their
/// derived indexes, link cache, hash tracker, notes index and vector
/// store kept consistent as one unit behind a single lock.
pub struct KnowledgeGraph {
    state: Arc<RwLock<GraphState>>,
    notes_root: PathBuf,
    kb_dir: PathBuf,
    config: Config,
    embedding_provider: Box<dyn EmbeddingProvider>,
}

impl KnowledgeGraph {
    /// Build (or reopen) a knowledge graph rooted at `config`'s notes and
    /// knowledge-base directories: ensures the category folders and
    /// knowledge-base directory exist, loads the last snapshot (if any),
    /// rebuilds every derived index and link from it, and opens the
    /// vector-store collection matching the configured embedding provider.
    pub async fn init(config: Config) -> Result<Self> {
        let notes_root = PathBuf::from(&config.notes_directory);
        let kb_dir = PathBuf::from(&config.knowledge_base_directory);
        notes::init_category_folders(&notes_root)?;
        std::fs::create_dir_all(&kb_dir).map_err(|e| NoteweaveError::io(kb_dir.clone(), e))?;

        let embedding_provider = build_embedding_provider(&config)?;
        let provider_info = embedding_provider.provider_info();
        let vector_collection =
            sanitize_for_collection(&format!("{}__{}", provider_info.provider, provider_info.model));

        let mut vector_store = FlatVectorStore::new(&kb_dir);
        vector_store.open_or_create(&vector_collection, HashMap::new())?;

        let (nodes, _edges) = snapshot::load(&kb_dir)?;
        let mut state = GraphState {
            nodes_by_id: HashMap::new(),
            edges_by_id: HashMap::new(),
            title_to_id: HashMap::new(),
            category_index: HashMap::new(),
            tag_index: HashMap::new(),
            hierarchy_index: HashMap::new(),
            link_cache: LinkCache::new(),
            hash_tracker: HashTracker::load(&kb_dir)?,
            notes_index: NotesIndex::new(),
            vector_store: Box::new(vector_store),
            vector_collection,
        };
        for node in nodes.into_values() {
            if let Some(indexed) = GraphState::indexed_note_for(&node) {
                state.notes_index.insert(indexed);
            }
            state.insert_node(node);
        }
        resolve::resolve_all_links(&mut state, &notes_root);

        Ok(KnowledgeGraph {
            state: Arc::new(RwLock::new(state)),
            notes_root,
            kb_dir,
            config,
            embedding_provider,
        })
    }

    pub fn notes_root(&self) -> &Path {
        &self.notes_root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fold a freshly parsed note into the graph: resolve its parent/child
    /// links, embed and persist its chunks, then insert it and rebuild the
    /// link cache/edges from every node's current body.
    async fn add_parsed(
        &self,
        parsed: ParsedNote,
        file_path: Option<PathBuf>,
        raw_content: &str,
    ) -> Result<String> {
        let id = parsed.id.as_str().to_string();
        let now = Utc::now();

        let (created_at, parent_id, children_ids) = {
            let state = self.state.read().await;
            let created_at = state.nodes_by_id.get(&id).map(|n| n.created_at).unwrap_or(now);
            let parent_id = parsed
                .parent
                .as_deref()
                .and_then(|p| resolve::resolve_target(p, &state, &self.notes_root));
            let children_ids = parsed
                .children
                .iter()
                .filter_map(|c| resolve::resolve_target(c, &state, &self.notes_root))
                .collect();
            (created_at, parent_id, children_ids)
        };

        let node = GraphNode {
            id: id.clone(),
            title: parsed.title.clone(),
            content: parsed.body.clone(),
            category: parsed.category.clone(),
            tags: parsed.tags.clone(),
            metadata: frontmatter_extra_metadata(&parsed.frontmatter),
            content_hash: parsed.content_hash.clone(),
            created_at,
            updated_at: now,
            file_path: file_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            parent_id,
            children_ids,
        };

        self.embed_and_store(&id, &parsed.body).await?;

        let mut state = self.state.write().await;
        if let Some(path) = &file_path {
            let key = path.to_string_lossy().to_string();
            // The file at `key` may already be mapped to a different
            // (now-stale) content-addressed id — a modification produces a
            // new id rather than reusing the old one. Drop the old node
            // first so it doesn't linger in the indexes and vector
            // collection alongside the new one (`spec.md` §4.8, invariant 5).
            let previous_id = state.hash_tracker.get_knowledge_node_id(&key).map(str::to_string);
            if let Some(previous_id) = previous_id {
                if previous_id != id {
                    state.remove_node(&previous_id)?;
                }
            }
            state
                .hash_tracker
                .update_hash(key.clone(), crate::hash::hash_content(raw_content), HashMap::new())?;
            state.hash_tracker.set_note_mapping(key, id.clone())?;
            if let Some(indexed) = GraphState::indexed_note_for(&node) {
                state.notes_index.insert(indexed);
            }
        }
        state.insert_node(node);
        resolve::resolve_all_links(&mut state, &self.notes_root);

        Ok(id)
    }

    /// Chunk `body`, embed every chunk, and persist one vector record per
    /// chunk (or a single record when there's only one chunk).
    async fn embed_and_store(&self, id: &str, body: &str) -> Result<()> {
        let start = Instant::now();
        let chunks = chunk::chunk_text(body, self.config.chunk_size, self.config.chunk_overlap);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedding_provider.embed_many(&texts).await?;

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let record_id = if chunk.total_chunks == 1 {
                    id.to_string()
                } else {
                    format!("{id}_chunk_{}", chunk.chunk_index)
                };
                let mut metadata = HashMap::new();
                metadata.insert("node_id".to_string(), id.to_string());
                metadata.insert("chunk_index".to_string(), chunk.chunk_index.to_string());
                metadata.insert("total_chunks".to_string(), chunk.total_chunks.to_string());
                VectorRecord {
                    id: record_id,
                    document: chunk.text,
                    embedding,
                    metadata,
                }
            })
            .collect();

        let mut state = self.state.write().await;
        let collection = state.vector_collection.clone();
        let store = &mut state.vector_store;
        crate::vectorstore::retry_once(|| store.add_batch(&collection, records.clone()))?;
        trace_time!(start, "embed_and_store", node_id = id);
        Ok(())
    }

    /// Create a brand-new note file and fold it into the graph. The
    /// counterpart to the heuristic decider in [`crate::decide`]: callers
    /// that decided `Action::Create` call this; callers that decided
    /// `Action::Update` call [`crate::notes::update_note`] directly and
    /// then [`KnowledgeGraph::process_path`] to re-sync it.
    pub async fn add_note_from_content(
        &self,
        title: &str,
        body: &str,
        category: &str,
        tags: &[String],
    ) -> Result<String> {
        let path = {
            let state = self.state.read().await;
            notes::create_note(&self.notes_root, title, body, category, tags, &state.notes_index)?
        };
        let content = std::fs::read_to_string(&path).map_err(|e| NoteweaveError::io(path.clone(), e))?;
        let parsed = note::parse_note(&content, &path, &self.notes_root);
        self.add_parsed(parsed, Some(path), &content).await
    }

    /// Re-sync a single file the watcher observed changing: reparse and
    /// fold it in if its content hash changed, or remove its node if the
    /// file is gone.
    pub async fn process_path(&self, path: &Path) -> Result<()> {
        let key = path.to_string_lossy().to_string();

        if !path.exists() {
            let node_id = {
                let state = self.state.read().await;
                state.hash_tracker.get_knowledge_node_id(&key).map(str::to_string)
            };
            if let Some(id) = node_id {
                let mut state = self.state.write().await;
                state.remove_node(&id)?;
                resolve::resolve_all_links(&mut state, &self.notes_root);
            }
            return Ok(());
        }

        let content = std::fs::read_to_string(path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
        let changed = {
            let state = self.state.read().await;
            state.hash_tracker.has_content_changed(&key, &content)
        };
        if !changed {
            return Ok(());
        }

        let parsed = note::parse_note(&content, path, &self.notes_root);
        self.add_parsed(parsed, Some(path.to_path_buf()), &content).await?;
        Ok(())
    }

    /// Walk the notes directory, fold every changed file into the graph,
    /// remove nodes whose file disappeared, prune stale hash-tracker
    /// entries, and persist a fresh snapshot. Pass `force_rebuild` to wipe
    /// every store first (vector collection, indexes, link cache, hash
    /// cache, note mapping, snapshot file) and reprocess every file from
    /// scratch, per `spec.md` §4.8 step 1.
    pub async fn sync(&self, force_rebuild: bool) -> Result<SyncReport> {
        let start = Instant::now();
        let metrics = ResourceMetrics::new();

        if force_rebuild {
            self.reset_for_force_rebuild().await?;
        }

        let files = enumerate_note_files(&self.notes_root);
        let valid_paths: Vec<String> = files.iter().map(|p| p.to_string_lossy().to_string()).collect();

        let mut added = 0usize;
        let mut updated = 0usize;
        let mut errors = Vec::new();

        for path in &files {
            match self.sync_one_file(path, force_rebuild, &metrics).await {
                Ok(FileOutcome::Added) => added += 1,
                Ok(FileOutcome::Updated) => updated += 1,
                Ok(FileOutcome::Unchanged) => {}
                Err(e) => errors.push(format!("{}: {e}", path.display())),
            }
        }

        let (removed, orphaned_hash_entries_removed) = self.cleanup_stale(&valid_paths).await?;
        let orphaned_vectors_removed = self.cleanup_orphaned_vectors().await?;
        if orphaned_vectors_removed > 0 {
            tracing::info!(orphaned_vectors_removed, "reaped orphaned vector-store entries");
        }

        {
            let state = self.state.read().await;
            snapshot::save(&self.kb_dir, &state.nodes_by_id, &state.edges_by_id)?;
        }

        log_resource_metrics!(&metrics, "sync");
        trace_time!(start, "sync", added, updated, removed);

        Ok(SyncReport {
            added,
            updated,
            removed,
            errors,
            orphaned_hash_entries_removed,
            orphaned_vectors_removed,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    /// `spec.md` §4.8 step 1: drop the vector collection's contents, clear
    /// every in-memory index and the link cache, clear the hash cache and
    /// note mapping, and delete the snapshot file, before a forced full
    /// rebuild reprocesses every file from scratch.
    async fn reset_for_force_rebuild(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let all_ids: Vec<String> = state
            .vector_store
            .get(&state.vector_collection, None)?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if !all_ids.is_empty() {
            let collection = state.vector_collection.clone();
            let store = &mut state.vector_store;
            crate::vectorstore::retry_once(|| store.delete(&collection, &all_ids))?;
        }

        state.nodes_by_id.clear();
        state.edges_by_id.clear();
        state.title_to_id.clear();
        state.category_index.clear();
        state.tag_index.clear();
        state.hierarchy_index.clear();
        state.link_cache = LinkCache::new();
        state.notes_index = NotesIndex::new();
        state.hash_tracker.clear()?;
        drop(state);

        let snapshot_path = snapshot::snapshot_path(&self.kb_dir);
        if snapshot_path.exists() {
            std::fs::remove_file(&snapshot_path)
                .map_err(|e| NoteweaveError::io(snapshot_path, e))?;
        }
        Ok(())
    }

    /// `spec.md` §4.8 step 6: every id in the vector collection that no
    /// longer has a backing node (a chunk orphaned by a crash between
    /// embedding and graph insertion, or a stale record from a dropped
    /// node) is deleted. Maintains invariant 3 in `spec.md` §3.
    async fn cleanup_orphaned_vectors(&self) -> Result<usize> {
        let mut state = self.state.write().await;
        let collection = state.vector_collection.clone();
        let valid = state.valid_ids();
        let orphaned: Vec<String> = state
            .vector_store
            .get(&collection, None)?
            .into_iter()
            .map(|r| r.id)
            .filter(|id| !valid.contains(id.as_str()) && !valid.contains(base_node_id(id).as_str()))
            .collect();
        let count = orphaned.len();
        if count > 0 {
            let store = &mut state.vector_store;
            crate::vectorstore::retry_once(|| store.delete(&collection, &orphaned))?;
        }
        Ok(count)
    }

    async fn sync_one_file(
        &self,
        path: &Path,
        force_rebuild: bool,
        metrics: &ResourceMetrics,
    ) -> Result<FileOutcome> {
        let content = std::fs::read_to_string(path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
        let key = path.to_string_lossy().to_string();

        let (changed, is_new) = {
            let state = self.state.read().await;
            let changed = force_rebuild || state.hash_tracker.has_content_changed(&key, &content);
            let is_new = state.hash_tracker.get_knowledge_node_id(&key).is_none();
            (changed, is_new)
        };
        if !changed {
            metrics.record_cache_hit();
            return Ok(FileOutcome::Unchanged);
        }
        metrics.record_cache_miss();

        let parsed = note::parse_note(&content, path, &self.notes_root);
        self.add_parsed(parsed, Some(path.to_path_buf()), &content).await?;
        Ok(if is_new { FileOutcome::Added } else { FileOutcome::Updated })
    }

    async fn cleanup_stale(&self, valid_paths: &[String]) -> Result<(usize, usize)> {
        let mut state = self.state.write().await;
        let stale_ids: Vec<String> = state
            .nodes_by_id
            .values()
            .filter(|n| n.file_path.as_ref().map(|p| !valid_paths.contains(p)).unwrap_or(false))
            .map(|n| n.id.clone())
            .collect();
        let removed = stale_ids.len();
        for id in &stale_ids {
            state.remove_node(id)?;
        }

        let orphaned_hash_entries_removed = state.hash_tracker.cleanup_stale_entries(valid_paths)?;
        resolve::resolve_all_links(&mut state, &self.notes_root);
        Ok((removed, orphaned_hash_entries_removed))
    }

    /// Embed `query` and return the nodes whose best-matching chunk clears
    /// `semantic_threshold`, one result per node, ranked by similarity.
    pub async fn search_semantic(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let embedding = self.embedding_provider.embed_one(query).await?;
        let state = self.state.read().await;
        let collection = state.vector_collection.clone();
        let hits = state.vector_store.query(&collection, &embedding, k.saturating_mul(4).max(k))?;

        let mut best_per_node: HashMap<String, (f32, String)> = HashMap::new();
        for hit in hits {
            let similarity = 1.0 - hit.distance;
            if similarity < self.config.semantic_threshold {
                continue;
            }
            let node_id = hit
                .metadata
                .get("node_id")
                .cloned()
                .unwrap_or_else(|| base_node_id(&hit.id));
            best_per_node
                .entry(node_id)
                .and_modify(|(best_score, best_doc)| {
                    if similarity > *best_score {
                        *best_score = similarity;
                        *best_doc = hit.document.clone();
                    }
                })
                .or_insert((similarity, hit.document.clone()));
        }

        let mut results: Vec<SearchResult> = best_per_node
            .into_iter()
            .filter_map(|(node_id, (similarity, document))| {
                let node = state.nodes_by_id.get(&node_id)?;
                Some(SearchResult {
                    node_id,
                    title: node.title.clone(),
                    category: node.category.clone(),
                    snippet: search::semantic_snippet(&document, query, 200),
                    similarity,
                    file_path: node.file_path.clone(),
                })
            })
            .collect();
        results.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        results.truncate(k);
        Ok(results)
    }

    /// Lexical (grep) search across every note file, off the async
    /// executor's worker threads since it's a synchronous filesystem walk.
    pub async fn search_content(
        &self,
        query: &str,
        case_sensitive: Option<bool>,
        k: usize,
    ) -> Result<Vec<FileMatches>> {
        let case_sensitive = case_sensitive.unwrap_or(self.config.case_sensitive_default);
        let notes_root = self.notes_root.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || search::search_content(&notes_root, &query, case_sensitive, k))
            .await
            .map_err(|e| NoteweaveError::Other(e.to_string()))?
    }

    /// Merge semantic, grep, title and tag sub-queries into one ranked list
    /// (`spec.md` §4.10), deduped by `(node_id, source_type)` keeping the
    /// highest-scoring hit from each source.
    pub async fn unified_search(&self, query: &str, k: usize) -> Result<Vec<UnifiedResult>> {
        let mut acc: HashMap<(String, SourceType), UnifiedResult> = HashMap::new();

        for hit in self.search_semantic(query, k).await? {
            merge_result(&mut acc, unified_from_semantic(hit));
        }

        let file_matches = self.search_content(query, None, (k / 2).max(1)).await?;
        {
            let state = self.state.read().await;
            for file_match in &file_matches {
                for candidate in grep_to_unified(file_match, query, &state) {
                    merge_result(&mut acc, candidate);
                }
            }
            for candidate in title_matches(query, &state) {
                merge_result(&mut acc, candidate);
            }
            for candidate in tag_matches(query, &state) {
                merge_result(&mut acc, candidate);
            }
        }

        let mut results: Vec<UnifiedResult> = acc.into_values().collect();
        results.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());
        results.truncate(k);
        Ok(results)
    }

    pub async fn get_backlinks(&self, id: &str) -> Vec<String> {
        let state = self.state.read().await;
        state.link_cache.get_incoming_links(id).into_iter().map(String::from).collect()
    }

    pub async fn get_outgoing(&self, id: &str) -> Vec<String> {
        let state = self.state.read().await;
        state.link_cache.get_outgoing_links(id).into_iter().map(String::from).collect()
    }

    pub async fn get_nodes_by_category(&self, category: &str) -> Vec<GraphNode> {
        let state = self.state.read().await;
        state
            .category_index
            .get(category)
            .map(|ids| ids.iter().filter_map(|id| state.nodes_by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub async fn get_nodes_by_tag(&self, tag: &str) -> Vec<GraphNode> {
        let state = self.state.read().await;
        state
            .tag_index
            .get(tag)
            .map(|ids| ids.iter().filter_map(|id| state.nodes_by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Expand `root_id`'s child hierarchy up to `max_depth` levels deep.
    /// Cycle-safe: a single `visited` set is threaded through the whole
    /// expansion, so a node revisited via a different branch terminates
    /// that branch instead of recursing forever.
    pub async fn get_hierarchy(&self, root_id: &str, max_depth: usize) -> Option<HierarchyNode> {
        let state = self.state.read().await;
        let mut visited = std::collections::HashSet::new();
        build_hierarchy(root_id, &state, max_depth, &mut visited)
    }

    pub async fn find_orphans(&self) -> Vec<String> {
        let state = self.state.read().await;
        let valid = state.valid_ids();
        state
            .link_cache
            .find_orphans()
            .into_iter()
            .filter(|id| valid.contains(*id))
            .map(String::from)
            .collect()
    }

    pub async fn find_broken_links(&self) -> Vec<(String, String)> {
        let state = self.state.read().await;
        let valid = state.valid_ids();
        state.link_cache.find_broken_links(&valid)
    }

    pub async fn get_graph_data(&self) -> GraphData {
        let state = self.state.read().await;
        let nodes = state
            .nodes_by_id
            .values()
            .map(|n| GraphNodeSummary {
                id: n.id.clone(),
                title: n.title.clone(),
                category: n.category.clone(),
                tags: n.tags.clone(),
                created_at: n.created_at,
                updated_at: n.updated_at,
            })
            .collect();
        let edges = state
            .edges_by_id
            .values()
            .map(|e| GraphEdgeSummary {
                source_id: e.source_id.clone(),
                target_id: e.target_id.clone(),
                relation_type: e.relation_type.as_str().to_string(),
                weight: e.weight,
            })
            .collect();
        let stats = compute_statistics(&state);
        GraphData { nodes, edges, stats }
    }

    pub async fn get_statistics(&self) -> GraphStatistics {
        let state = self.state.read().await;
        compute_statistics(&state)
    }

    /// Serialize the current nodes/edges to `enhanced_graph.json`. Used by
    /// the file watcher to persist once per debounced batch instead of
    /// once per file (`spec.md` §5 "Persistence writes hold the writer
    /// lock only for the serialization snapshot, not for the disk write").
    pub async fn persist_snapshot(&self) -> Result<()> {
        let state = self.state.read().await;
        snapshot::save(&self.kb_dir, &state.nodes_by_id, &state.edges_by_id)
    }
}

fn compute_statistics(state: &GraphState) -> GraphStatistics {
    let mut categories = HashMap::new();
    let mut tags = HashMap::new();
    let mut relation_types = HashMap::new();

    for node in state.nodes_by_id.values() {
        *categories.entry(node.category.clone()).or_insert(0) += 1;
        for tag in &node.tags {
            *tags.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    for edge in state.edges_by_id.values() {
        *relation_types.entry(edge.relation_type.as_str().to_string()).or_insert(0) += 1;
    }

    let valid = state.valid_ids();
    let orphan_count = state
        .link_cache
        .find_orphans()
        .into_iter()
        .filter(|id| valid.contains(*id))
        .count();
    let broken_link_count = state.link_cache.find_broken_links(&valid).len();

    GraphStatistics {
        total_nodes: state.nodes_by_id.len(),
        total_edges: state.edges_by_id.len(),
        categories,
        tags,
        relation_types,
        orphan_count,
        broken_link_count,
    }
}

fn build_hierarchy(
    id: &str,
    state: &GraphState,
    remaining_depth: usize,
    visited: &mut std::collections::HashSet<String>,
) -> Option<HierarchyNode> {
    let node = state.nodes_by_id.get(id)?;
    if !visited.insert(id.to_string()) {
        return Some(HierarchyNode {
            id: id.to_string(),
            title: node.title.clone(),
            children: Vec::new(),
        });
    }

    let children = if remaining_depth == 0 {
        Vec::new()
    } else {
        state
            .hierarchy_index
            .get(id)
            .map(|child_ids| {
                child_ids
                    .iter()
                    .filter_map(|cid| build_hierarchy(cid, state, remaining_depth - 1, visited))
                    .collect()
            })
            .unwrap_or_default()
    };

    Some(HierarchyNode {
        id: id.to_string(),
        title: node.title.clone(),
        children,
    })
}

fn unified_from_semantic(hit: SearchResult) -> UnifiedResult {
    UnifiedResult {
        content: hit.snippet.clone(),
        title: hit.title,
        category: hit.category,
        source_type: SourceType::Semantic,
        relevance_score: hit.similarity,
        node_id: hit.node_id,
        file_path: hit.file_path,
        line_number: None,
        context: None,
        snippet: hit.snippet,
        chunk_index: None,
        total_chunks: None,
        metadata: HashMap::new(),
    }
}

fn grep_to_unified(file_match: &FileMatches, query: &str, state: &GraphState) -> Vec<UnifiedResult> {
    let Some(node) = state
        .nodes_by_id
        .values()
        .find(|n| n.file_path.as_deref() == Some(file_match.file_path.as_str()))
    else {
        return Vec::new();
    };
    let score = (file_match.total_matches as f32 * 0.1 + 0.5).min(1.0);

    file_match
        .matches
        .iter()
        .map(|line_match| {
            let raw_line = line_match
                .context
                .lines()
                .find_map(|l| l.strip_prefix(">>> "))
                .unwrap_or(line_match.context.as_str());
            UnifiedResult {
                content: raw_line.to_string(),
                title: node.title.clone(),
                category: node.category.clone(),
                source_type: SourceType::Grep,
                relevance_score: score,
                node_id: node.id.clone(),
                file_path: node.file_path.clone(),
                line_number: Some(line_match.line_number),
                context: Some(line_match.context.clone()),
                snippet: search::grep_snippet(raw_line, query, 200),
                chunk_index: None,
                total_chunks: None,
                metadata: HashMap::new(),
            }
        })
        .collect()
}

fn title_matches(query: &str, state: &GraphState) -> Vec<UnifiedResult> {
    let lower_query = query.to_lowercase();
    state
        .nodes_by_id
        .values()
        .filter_map(|node| {
            let lower_title = node.title.to_lowercase();
            let score = if lower_title == lower_query {
                1.0
            } else if lower_title.starts_with(&lower_query) {
                0.9
            } else if lower_title.contains(&lower_query) {
                0.7
            } else {
                return None;
            };
            Some(UnifiedResult {
                content: node.content.clone(),
                title: node.title.clone(),
                category: node.category.clone(),
                source_type: SourceType::Title,
                relevance_score: score,
                node_id: node.id.clone(),
                file_path: node.file_path.clone(),
                line_number: None,
                context: None,
                snippet: search::semantic_snippet(&node.content, query, 200),
                chunk_index: None,
                total_chunks: None,
                metadata: HashMap::new(),
            })
        })
        .collect()
}

fn tag_matches(query: &str, state: &GraphState) -> Vec<UnifiedResult> {
    let target = query.trim_start_matches('#').to_lowercase();
    let mut results = Vec::new();
    for (tag, ids) in &state.tag_index {
        let lower_tag = tag.to_lowercase();
        let score = if lower_tag == target {
            1.0
        } else if lower_tag.contains(&target) {
            0.8
        } else {
            continue;
        };
        for id in ids {
            let Some(node) = state.nodes_by_id.get(id) else { continue };
            results.push(UnifiedResult {
                content: node.content.clone(),
                title: node.title.clone(),
                category: node.category.clone(),
                source_type: SourceType::Tag,
                relevance_score: score,
                node_id: node.id.clone(),
                file_path: node.file_path.clone(),
                line_number: None,
                context: None,
                snippet: search::semantic_snippet(&node.content, query, 200),
                chunk_index: None,
                total_chunks: None,
                metadata: HashMap::new(),
            });
        }
    }
    results
}

fn merge_result(acc: &mut HashMap<(String, SourceType), UnifiedResult>, candidate: UnifiedResult) {
    let key = (candidate.node_id.clone(), candidate.source_type);
    acc.entry(key)
        .and_modify(|existing| {
            if candidate.relevance_score > existing.relevance_score {
                *existing = candidate.clone();
            }
        })
        .or_insert(candidate);
}

fn frontmatter_extra_metadata(frontmatter: &NoteFrontmatter) -> HashMap<String, String> {
    frontmatter
        .extra
        .iter()
        .filter_map(|(k, v)| serde_yaml::to_string(v).ok().map(|s| (k.clone(), s.trim().to_string())))
        .collect()
}

fn base_node_id(record_id: &str) -> String {
    match record_id.rsplit_once("_chunk_") {
        Some((base, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) => base.to_string(),
        _ => record_id.to_string(),
    }
}

fn is_note_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown") | Some("txt")
    )
}

fn enumerate_note_files(notes_root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(notes_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| is_note_file(p))
        .collect()
}

fn sanitize_for_collection(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// The local provider's output width is encoded in its model name
/// (`bag-of-words-256` -> 256); a remote model name that doesn't end in a
/// number falls back to a conservative default.
fn embedding_dim_for(model: &str) -> usize {
    model.rsplit('-').next().and_then(|s| s.parse::<usize>().ok()).unwrap_or(256)
}

fn build_embedding_provider(config: &Config) -> Result<Box<dyn EmbeddingProvider>> {
    match config.embedding_provider {
        EmbeddingProviderKind::Local => Ok(Box::new(LocalProvider::new(
            config.embedding_model.clone(),
            embedding_dim_for(&config.embedding_model),
        ))),
        EmbeddingProviderKind::Remote => {
            let api_key = std::env::var(&config.embedding_api_key_env).unwrap_or_default();
            let provider = RemoteProvider::new(
                config.embedding_api_base.clone(),
                api_key,
                config.embedding_model.clone(),
                embedding_dim_for(&config.embedding_model),
                Duration::from_millis(config.embedding_timeout_ms),
                config.embedding_max_retries,
            )?;
            Ok(Box::new(provider))
        }
    }
}
