//! Wiki-link and typed-relationship target resolution against the
//! compiled graph (`spec.md` §4.7). Mirrors the strategy order
//! `notes::resolve_wiki_target` uses against a [`crate::notes::NotesIndex`],
//! but resolves against `GraphState`'s own `title_to_id` map and node
//! `file_path`s instead, since the graph has no parallel `NotesIndex` for
//! notes that were loaded from a snapshot rather than freshly parsed.

use std::path::Path;

use super::state::GraphState;
use super::types::{EdgeKind, GraphEdge};
use crate::linkcache::{LinkCache, LinkMetadata};
use crate::note::{relationships_in, wiki_links_in};

fn normalize_separators(s: &str) -> String {
    s.replace(['-', '_'], " ").to_lowercase()
}

/// Resolve a bare wiki-link target to a node id, first match wins:
/// path-shaped targets are matched against `file_path` (with or without
/// a `.md`/`.markdown` extension); everything else is matched against
/// node titles, exact then case-insensitive then substring then
/// separator-normalized.
pub fn resolve_target(target: &str, state: &GraphState, notes_root: &Path) -> Option<String> {
    if target.contains('/') {
        let candidate = notes_root.join(target);
        let with_md = candidate.with_extension("md");
        let with_markdown = candidate.with_extension("markdown");
        return state.nodes_by_id.values().find_map(|node| {
            let path = node.file_path.as_ref()?;
            let path = Path::new(path);
            if path == with_md || path == with_markdown || path == candidate {
                Some(node.id.clone())
            } else {
                None
            }
        });
    }

    if let Some(id) = state.title_to_id.get(target) {
        return Some(id.clone());
    }

    let lower = target.to_lowercase();
    if let Some(id) = state
        .title_to_id
        .iter()
        .find(|(title, _)| title.to_lowercase() == lower)
        .map(|(_, id)| id.clone())
    {
        return Some(id);
    }

    if let Some(id) = state
        .title_to_id
        .iter()
        .find(|(title, _)| title.to_lowercase().contains(&lower))
        .map(|(_, id)| id.clone())
    {
        return Some(id);
    }

    let normalized = normalize_separators(target);
    state
        .title_to_id
        .iter()
        .find(|(title, _)| normalize_separators(title) == normalized)
        .map(|(_, id)| id.clone())
}

/// Rebuild every wiki-link and typed-relationship edge from each node's
/// current body. Called after any batch of nodes changes, since a link's
/// resolution target may itself have just appeared or disappeared.
///
/// Every discovered link is registered in the link cache unconditionally,
/// using the literal link text as a placeholder target when resolution
/// fails — `find_broken_links` relies on that placeholder never matching
/// a real node id. `edges_by_id` only gains an entry when resolution
/// actually succeeds, and a resolved typed relationship also registers
/// its inverse on the target node. The link cache is reset alongside
/// `edges_by_id` so a placeholder from a link that was broken on an
/// earlier pass doesn't linger once its target appears.
pub fn resolve_all_links(state: &mut GraphState, notes_root: &Path) -> (usize, usize) {
    let node_bodies: Vec<(String, String)> = state
        .nodes_by_id
        .values()
        .map(|n| (n.id.clone(), n.content.clone()))
        .collect();

    state.edges_by_id.retain(|_, _| false);
    state.link_cache = LinkCache::new();

    let mut resolved = 0usize;
    let mut broken = 0usize;

    for (node_id, body) in &node_bodies {
        for link in wiki_links_in(body) {
            match resolve_target(&link.target, state, notes_root) {
                Some(target_id) => {
                    resolved += 1;
                    state.register_link(
                        node_id,
                        &target_id,
                        LinkMetadata {
                            relation_type: None,
                            display_text: Some(link.display_text.clone()),
                        },
                    );
                    state.upsert_edge(GraphEdge {
                        source_id: node_id.clone(),
                        target_id,
                        relation_type: EdgeKind::WikiLink,
                        metadata: Default::default(),
                        weight: 1.0,
                        created_at: chrono::Utc::now(),
                    });
                }
                None => {
                    broken += 1;
                    state.register_link(
                        node_id,
                        &link.target,
                        LinkMetadata {
                            relation_type: None,
                            display_text: Some(link.display_text.clone()),
                        },
                    );
                }
            }
        }

        for rel in relationships_in(body) {
            match resolve_target(&rel.target, state, notes_root) {
                Some(target_id) => {
                    resolved += 1;
                    state.register_link(
                        node_id,
                        &target_id,
                        LinkMetadata {
                            relation_type: Some(rel.relation_type),
                            display_text: None,
                        },
                    );
                    state.upsert_edge(GraphEdge {
                        source_id: node_id.clone(),
                        target_id: target_id.clone(),
                        relation_type: EdgeKind::Relation(rel.relation_type),
                        metadata: Default::default(),
                        weight: 1.0,
                        created_at: chrono::Utc::now(),
                    });
                    state.upsert_edge(GraphEdge {
                        source_id: target_id,
                        target_id: node_id.clone(),
                        relation_type: EdgeKind::Relation(rel.relation_type.inverse()),
                        metadata: Default::default(),
                        weight: 1.0,
                        created_at: chrono::Utc::now(),
                    });
                }
                None => {
                    broken += 1;
                    state.register_link(
                        node_id,
                        &rel.target,
                        LinkMetadata {
                            relation_type: Some(rel.relation_type),
                            display_text: None,
                        },
                    );
                }
            }
        }
    }

    (resolved, broken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashTracker;
    use crate::linkcache::LinkCache;
    use crate::notes::NotesIndex;
    use crate::vectorstore::FlatVectorStore;
    use chrono::Utc;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn state(dir: &Path) -> GraphState {
        GraphState {
            nodes_by_id: HashMap::new(),
            edges_by_id: HashMap::new(),
            title_to_id: HashMap::new(),
            category_index: HashMap::new(),
            tag_index: HashMap::new(),
            hierarchy_index: HashMap::new(),
            link_cache: LinkCache::new(),
            hash_tracker: HashTracker::load(dir).unwrap(),
            notes_index: NotesIndex::new(),
            vector_store: Box::new(FlatVectorStore::new(dir)),
            vector_collection: "local__bag-of-words-256".to_string(),
        }
    }

    fn node(id: &str, title: &str, content: &str) -> super::super::types::GraphNode {
        super::super::types::GraphNode {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
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
    fn resolves_wiki_link_by_title_and_registers_edge() {
        let dir = tempdir().unwrap();
        let mut s = state(dir.path());
        s.insert_node(node("note_a", "Source", "See [[Target]]."));
        s.insert_node(node("note_b", "Target", "body"));

        let (resolved, broken) = resolve_all_links(&mut s, dir.path());
        assert_eq!(resolved, 1);
        assert_eq!(broken, 0);
        assert_eq!(s.link_cache.get_outgoing_links("note_a"), vec!["note_b"]);
        assert!(s.edges_by_id.values().any(|e| e.source_id == "note_a" && e.target_id == "note_b"));
    }

    #[test]
    fn unresolved_link_is_flagged_broken_without_an_edge() {
        let dir = tempdir().unwrap();
        let mut s = state(dir.path());
        s.insert_node(node("note_a", "Source", "See [[Nowhere]]."));

        let (resolved, broken) = resolve_all_links(&mut s, dir.path());
        assert_eq!(resolved, 0);
        assert_eq!(broken, 1);
        assert!(s.edges_by_id.is_empty());

        let valid = s.valid_ids();
        let broken_links = s.link_cache.find_broken_links(&valid);
        assert_eq!(broken_links, vec![("note_a".to_string(), "Nowhere".to_string())]);
    }

    #[test]
    fn broken_link_placeholder_does_not_linger_once_target_appears() {
        let dir = tempdir().unwrap();
        let mut s = state(dir.path());
        s.insert_node(node("note_a", "Source", "See [[Nowhere]]."));
        resolve_all_links(&mut s, dir.path());
        assert_eq!(s.link_cache.find_broken_links(&s.valid_ids()).len(), 1);

        s.insert_node(node("note_b", "Nowhere", "body"));
        let (resolved, broken) = resolve_all_links(&mut s, dir.path());
        assert_eq!(resolved, 1);
        assert_eq!(broken, 0);
        assert!(s.link_cache.find_broken_links(&s.valid_ids()).is_empty());
    }

    #[test]
    fn typed_relationship_registers_reciprocal_edge() {
        let dir = tempdir().unwrap();
        let mut s = state(dir.path());
        s.insert_node(node("note_a", "Child", "CHILD_OF:: [[Parent]]"));
        s.insert_node(node("note_b", "Parent", "body"));

        resolve_all_links(&mut s, dir.path());

        assert!(s.edges_by_id.values().any(|e| {
            e.source_id == "note_b" && e.target_id == "note_a" && e.relation_type.as_str() == "parent_of"
        }));
    }
}
