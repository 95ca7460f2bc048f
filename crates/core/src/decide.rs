//! Note-action decider (C9).
//!
//! Decides whether new content should become a brand new note or extend
//! an existing one. The heuristic in [`decide_note_action`] is
//! authoritative: an optional LLM-backed decider may be wired in ahead of
//! it, but its output is only trusted when it parses; a malformed
//! response always falls back to the heuristic rather than failing the
//! call.

use serde::Serialize;

use crate::notes::{related, NotesIndex};
use crate::text::tokenize;

/// What the decider recommends doing with a piece of new content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
}

/// A candidate existing note the decider considered.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedNote {
    pub title: String,
    pub file_path: String,
    pub category: String,
}

/// An alternative the decider considered but didn't choose.
#[derive(Debug, Clone, Serialize)]
pub struct Alternative {
    pub title: String,
    pub reason: String,
}

/// The fixed, structured output shape every decider path (heuristic or
/// LLM-backed) must produce.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub action: Action,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub recommended_note: Option<RecommendedNote>,
    pub alternatives: Vec<Alternative>,
}

const UPDATE_JACCARD_THRESHOLD: f64 = 0.7;
const SHORT_CONTENT_WORD_LIMIT: usize = 50;

/// The heuristic decider: no network calls, no LLM — just word-overlap
/// scoring against the existing notes index.
pub fn decide_note_action(content: &str, category: Option<&str>, index: &NotesIndex) -> Decision {
    let candidates = related(content, category, 5, index);
    let word_count = tokenize(content).len();

    let Some(top) = candidates.first() else {
        return Decision {
            action: Action::Create,
            confidence: 1.0,
            reasoning: vec!["no related notes found".to_string()],
            recommended_note: None,
            alternatives: Vec::new(),
        };
    };

    let alternatives: Vec<Alternative> = candidates
        .iter()
        .skip(1)
        .map(|c| Alternative {
            title: c.title.clone(),
            reason: format!("word overlap {}", c.overlap),
        })
        .collect();

    if top.jaccard >= UPDATE_JACCARD_THRESHOLD {
        return Decision {
            action: Action::Update,
            confidence: top.jaccard,
            reasoning: vec![format!(
                "jaccard similarity {:.2} to '{}' meets the update threshold",
                top.jaccard, top.title
            )],
            recommended_note: Some(RecommendedNote {
                title: top.title.clone(),
                file_path: top.path.to_string_lossy().to_string(),
                category: category.unwrap_or("Quick Notes").to_string(),
            }),
            alternatives,
        };
    }

    if word_count < SHORT_CONTENT_WORD_LIMIT {
        return Decision {
            action: Action::Update,
            confidence: 0.5,
            reasoning: vec![format!(
                "content is short ({word_count} words) and at least one related note exists"
            )],
            recommended_note: Some(RecommendedNote {
                title: top.title.clone(),
                file_path: top.path.to_string_lossy().to_string(),
                category: category.unwrap_or("Quick Notes").to_string(),
            }),
            alternatives,
        };
    }

    Decision {
        action: Action::Create,
        confidence: 1.0 - top.jaccard,
        reasoning: vec!["no close enough match; creating a new note".to_string()],
        recommended_note: None,
        alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::IndexedNote;
    use std::path::PathBuf;

    fn index_with(title: &str, body: &str, category: &str) -> NotesIndex {
        let mut index = NotesIndex::new();
        index.insert(IndexedNote {
            path: PathBuf::from(format!("{title}.md")),
            title: title.to_string(),
            body: body.to_string(),
            category: category.to_string(),
            tags: vec![],
        });
        index
    }

    #[test]
    fn creates_when_index_is_empty() {
        let index = NotesIndex::new();
        let decision = decide_note_action("some new content", None, &index);
        assert_eq!(decision.action, Action::Create);
    }

    #[test]
    fn updates_on_high_jaccard_overlap() {
        let index = index_with("Existing", "graph database knowledge system notes", "Research");
        let decision =
            decide_note_action("graph database knowledge system notes", None, &index);
        assert_eq!(decision.action, Action::Update);
        assert!(decision.recommended_note.is_some());
    }

    #[test]
    fn creates_on_long_dissimilar_content() {
        let index = index_with("Existing", "unrelated topic entirely", "Research");
        let long_content = (0..60).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let decision = decide_note_action(&long_content, None, &index);
        assert_eq!(decision.action, Action::Create);
    }
}
