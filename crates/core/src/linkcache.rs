//! In-memory bidirectional link index (C3).
//!
//! Pure in-memory by design — this is not a persisted store. It is rebuilt
//! from the graph snapshot's edges on startup and kept in sync by C7 as
//! notes are added, updated and removed.

use std::collections::{HashMap, HashSet};

use crate::note::RelationType;

/// Metadata recorded alongside a single edge, keyed the same way as the
/// outgoing/incoming maps.
#[derive(Debug, Clone)]
pub struct LinkMetadata {
    pub relation_type: Option<RelationType>,
    pub display_text: Option<String>,
}

/// Bidirectional, in-memory link index with O(1) backlink and
/// orphan/broken-link queries.
#[derive(Debug, Default)]
pub struct LinkCache {
    outgoing: HashMap<String, HashSet<String>>,
    incoming: HashMap<String, HashSet<String>>,
    metadata: HashMap<(String, String), LinkMetadata>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link `from -> to`, overwriting any prior metadata for the
    /// same pair.
    pub fn add_link(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        metadata: LinkMetadata,
    ) {
        let from = from.into();
        let to = to.into();
        self.outgoing
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        self.incoming
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        self.metadata.insert((from, to), metadata);
    }

    pub fn get_outgoing_links(&self, id: &str) -> Vec<&str> {
        self.outgoing
            .get(id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get_incoming_links(&self, id: &str) -> Vec<&str> {
        self.incoming
            .get(id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get_metadata(&self, from: &str, to: &str) -> Option<&LinkMetadata> {
        self.metadata.get(&(from.to_string(), to.to_string()))
    }

    /// Prune every edge touching `id`, in both directions.
    pub fn remove_node(&mut self, id: &str) {
        if let Some(targets) = self.outgoing.remove(id) {
            for target in &targets {
                if let Some(incoming) = self.incoming.get_mut(target) {
                    incoming.remove(id);
                }
                self.metadata.remove(&(id.to_string(), target.clone()));
            }
        }
        if let Some(sources) = self.incoming.remove(id) {
            for source in &sources {
                if let Some(outgoing) = self.outgoing.get_mut(source) {
                    outgoing.remove(id);
                }
                self.metadata.remove(&(source.clone(), id.to_string()));
            }
        }
    }

    /// Nodes that appear in the graph (either direction) but have no
    /// incoming link — nothing else references them.
    pub fn find_orphans(&self) -> Vec<&str> {
        let mut all_nodes: HashSet<&str> = HashSet::new();
        all_nodes.extend(self.outgoing.keys().map(String::as_str));
        all_nodes.extend(self.incoming.keys().map(String::as_str));

        all_nodes
            .into_iter()
            .filter(|id| {
                self.incoming
                    .get(*id)
                    .map(|set| set.is_empty())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// Outgoing edges whose target is not a member of `valid_ids`.
    pub fn find_broken_links(&self, valid_ids: &HashSet<String>) -> Vec<(String, String)> {
        let mut broken = Vec::new();
        for (from, targets) in &self.outgoing {
            for to in targets {
                if !valid_ids.contains(to) {
                    broken.push((from.clone(), to.clone()));
                }
            }
        }
        broken
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> LinkMetadata {
        LinkMetadata {
            relation_type: None,
            display_text: None,
        }
    }

    #[test]
    fn add_and_query_both_directions() {
        let mut cache = LinkCache::new();
        cache.add_link("a", "b", meta());
        assert_eq!(cache.get_outgoing_links("a"), vec!["b"]);
        assert_eq!(cache.get_incoming_links("b"), vec!["a"]);
    }

    #[test]
    fn remove_node_prunes_both_directions() {
        let mut cache = LinkCache::new();
        cache.add_link("a", "b", meta());
        cache.add_link("c", "a", meta());
        cache.remove_node("a");
        assert!(cache.get_outgoing_links("a").is_empty());
        assert!(cache.get_incoming_links("b").is_empty());
        assert!(cache.get_outgoing_links("c").is_empty());
    }

    #[test]
    fn orphans_have_no_incoming_links() {
        let mut cache = LinkCache::new();
        cache.add_link("a", "b", meta());
        let orphans: HashSet<&str> = cache.find_orphans().into_iter().collect();
        assert!(orphans.contains("a"));
        assert!(!orphans.contains("b"));
    }

    #[test]
    fn broken_links_point_outside_valid_set() {
        let mut cache = LinkCache::new();
        cache.add_link("a", "missing", meta());
        let valid: HashSet<String> = ["a".to_string()].into_iter().collect();
        let broken = cache.find_broken_links(&valid);
        assert_eq!(broken, vec![("a".to_string(), "missing".to_string())]);
    }
}
