//! Data model owned by the knowledge graph (C7): nodes, edges, and the
//! result/report shapes every public operation returns.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::note::RelationType;

/// A node's edge kind: either one of the closed typed-relationship
/// variants, or the `wiki_link` kind produced by the link-resolution pass.
/// Kept as its own closed tagged variant (rather than a free-form string)
/// per `spec.md` §9's redesign flag on duck-typed polymorphism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Relation(RelationType),
    WikiLink,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Relation(r) => r.as_str(),
            EdgeKind::WikiLink => "wiki_link",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "wiki_link" {
            return Ok(EdgeKind::WikiLink);
        }
        RelationType::from_str(s).map(EdgeKind::Relation)
    }
}

impl Serialize for EdgeKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EdgeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EdgeKind::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// A compiled note: the unit the graph owns exclusively, derived from a
/// [`crate::note::ParsedNote`] but enriched with graph-only bookkeeping
/// (timestamps, the resolved parent id, persisted front-matter extras).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_path: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children_ids: Vec<String>,
}

/// A directed, typed edge between two nodes. `(source_id, target_id, kind)`
/// is the edge's identity — at most one edge per tuple (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: EdgeKind,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default = "default_weight")]
    pub weight: f32,
    pub created_at: DateTime<Utc>,
}

fn default_weight() -> f32 {
    1.0
}

pub type EdgeKey = (String, String, String);

impl GraphEdge {
    pub fn key(&self) -> EdgeKey {
        (
            self.source_id.clone(),
            self.target_id.clone(),
            self.relation_type.as_str().to_string(),
        )
    }
}

/// A single hit from [`crate::graph::KnowledgeGraph::search_semantic`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub node_id: String,
    pub title: String,
    pub category: String,
    pub snippet: String,
    pub similarity: f32,
    pub file_path: Option<String>,
}

/// One matched line inside a file, for [`FileMatches`].
#[derive(Debug, Clone, Serialize)]
pub struct LineMatch {
    pub line_number: usize,
    pub context: String,
}

/// Grep-style results for a single file, from
/// [`crate::graph::KnowledgeGraph::search_content`].
#[derive(Debug, Clone, Serialize)]
pub struct FileMatches {
    pub file_path: String,
    pub matches: Vec<LineMatch>,
    pub total_matches: usize,
}

/// Which sub-query in [`crate::graph::KnowledgeGraph::unified_search`]
/// produced a given [`UnifiedResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Semantic,
    Grep,
    Title,
    Tag,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Semantic => "semantic",
            SourceType::Grep => "grep",
            SourceType::Title => "title",
            SourceType::Tag => "tag",
        }
    }
}

/// A single ranked hit from the unified search merge (`spec.md` §4.10).
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedResult {
    pub content: String,
    pub title: String,
    pub category: String,
    pub source_type: SourceType,
    pub relevance_score: f32,
    pub node_id: String,
    pub file_path: Option<String>,
    pub line_number: Option<usize>,
    pub context: Option<String>,
    pub snippet: String,
    pub chunk_index: Option<usize>,
    pub total_chunks: Option<usize>,
    pub metadata: HashMap<String, String>,
}

/// Counts and histograms returned by
/// [`crate::graph::KnowledgeGraph::get_statistics`].
#[derive(Debug, Clone, Serialize, Default)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub categories: HashMap<String, usize>,
    pub tags: HashMap<String, usize>,
    pub relation_types: HashMap<String, usize>,
    pub orphan_count: usize,
    pub broken_link_count: usize,
}

/// A node projected for `get_graph_data` — no body, for visualization.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNodeSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdgeSummary {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    pub weight: f32,
}

/// Visualization projection from `get_graph_data`: nodes without body,
/// edges, and the same counts `get_statistics` reports.
#[derive(Debug, Clone, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNodeSummary>,
    pub edges: Vec<GraphEdgeSummary>,
    pub stats: GraphStatistics,
}

/// One node in a [`crate::graph::KnowledgeGraph::get_hierarchy`] expansion.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyNode {
    pub id: String,
    pub title: String,
    pub children: Vec<HierarchyNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_kind_roundtrips_through_display_and_from_str() {
        assert_eq!(EdgeKind::WikiLink.to_string(), "wiki_link");
        assert_eq!(
            EdgeKind::from_str("wiki_link").unwrap(),
            EdgeKind::WikiLink
        );
        assert_eq!(
            EdgeKind::from_str("parent_of").unwrap(),
            EdgeKind::Relation(RelationType::ParentOf)
        );
    }

    #[test]
    fn edge_kind_rejects_unknown() {
        assert!(EdgeKind::from_str("frobnicate").is_err());
    }
}
