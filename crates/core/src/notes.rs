//! Notes manager (C4): owns the user-facing notes directory.
//!
//! Creates category folders and README placeholders, maintains an
//! in-memory `path -> Note` index, generates safe filenames, appends
//! update sections, and resolves bare `[[Wiki Link]]` text to the note it
//! most plausibly refers to.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::note::{self, NoteFrontmatter};
use crate::text::tokenize;

/// The fixed set of category folders created on init.
pub const CATEGORY_FOLDERS: [&str; 8] = [
    "ideas",
    "personal",
    "research",
    "reading-list",
    "projects",
    "learning",
    "quick-notes",
    "web-content",
];

/// An indexed note: enough to drive related-note scoring and wiki-link
/// resolution without re-reading the file from disk.
#[derive(Debug, Clone, Serialize)]
pub struct IndexedNote {
    pub path: PathBuf,
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// In-memory index of every note under the notes root.
#[derive(Debug, Default)]
pub struct NotesIndex {
    by_path: HashMap<PathBuf, IndexedNote>,
}

impl NotesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, note: IndexedNote) {
        self.by_path.insert(note.path.clone(), note);
    }

    pub fn remove(&mut self, path: &Path) {
        self.by_path.remove(path);
    }

    pub fn get(&self, path: &Path) -> Option<&IndexedNote> {
        self.by_path.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedNote> {
        self.by_path.values()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// Create the category folders (and `README.md` placeholders) under
/// `notes_root` if they don't already exist.
pub fn init_category_folders(notes_root: &Path) -> Result<()> {
    for folder in CATEGORY_FOLDERS {
        let dir = notes_root.join(folder);
        std::fs::create_dir_all(&dir)
            .map_err(|e| crate::error::NoteweaveError::io(dir.clone(), e))?;
        let readme = dir.join("README.md");
        if !readme.exists() {
            let title = folder.replace(['-', '_'], " ");
            crate::fsutil::atomic_write(&readme, &format!("# {title}\n"))?;
        }
    }
    Ok(())
}

/// Turn a free-form title into a filesystem-safe base filename (no
/// extension, no uniqueness suffix yet).
fn slugify_filename(title: &str) -> String {
    let disallowed = Regex::new(r"[^\w\s-]").unwrap();
    let collapse = Regex::new(r"[-\s]+").unwrap();
    let stripped = disallowed.replace_all(title, "");
    collapse.replace_all(stripped.trim(), "-").to_lowercase()
}

/// Pick a filename under `dir` that doesn't collide with an existing file,
/// appending `-2`, `-3`, … as needed.
fn unique_filename(dir: &Path, base: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{base}.md"));
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{base}-{n}.md"));
        n += 1;
    }
    candidate
}

/// Create a new note file under `notes_root/<category-folder>`.
///
/// `category` is the display category (e.g. "Research"); it's mapped back
/// to its folder name on a best-effort basis, falling back to
/// `quick-notes` for categories with no folder mapping (e.g. one a user
/// typed freely in front-matter).
pub fn create_note(
    notes_root: &Path,
    title: &str,
    body: &str,
    category: &str,
    tags: &[String],
    index: &NotesIndex,
) -> Result<PathBuf> {
    let folder = category_to_folder(category);
    let dir = notes_root.join(folder);
    std::fs::create_dir_all(&dir).map_err(|e| crate::error::NoteweaveError::io(dir.clone(), e))?;

    let base = slugify_filename(title);
    let path = unique_filename(&dir, &base);

    let mut frontmatter = NoteFrontmatter::new(title);
    frontmatter.category = Some(category.to_string());
    frontmatter.tags = crate::note::frontmatter::StringList(tags.to_vec());
    frontmatter.updated = frontmatter.created;

    let prefixed_body = format!("# {title}\n\n{body}");
    let rewritten_body = rewrite_wiki_links(&prefixed_body, notes_root, index);
    let content = note::to_markdown(&frontmatter, &rewritten_body)?;

    crate::fsutil::atomic_write(&path, &content)?;
    Ok(path)
}

/// Append an update section to an existing note, unless identical text was
/// already appended (idempotent against retried calls).
pub fn update_note(path: &Path, additional_text: &str, index: &NotesIndex) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| crate::error::NoteweaveError::io(path.to_path_buf(), e))?;

    let timestamp = Utc::now().format("%Y-%m-%d %H:%M").to_string();
    let section = format!("## Update - {timestamp}\n\n{additional_text}");

    if content.contains(additional_text) && content.contains("## Update - ") {
        return Ok(false);
    }

    let (mut frontmatter, body) = note::split_frontmatter(&content);
    frontmatter.updated = Some(Utc::now());

    let notes_root = path
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf());
    let new_body = format!("{}\n\n{section}", body.trim_end());
    let rewritten_body = rewrite_wiki_links(&new_body, &notes_root, index);

    let rewritten = note::to_markdown(&frontmatter, &rewritten_body)?;
    crate::fsutil::atomic_write(path, &rewritten)?;
    Ok(true)
}

fn category_to_folder(category: &str) -> &'static str {
    match category {
        "Ideas to Develop" => "ideas",
        "Personal" => "personal",
        "Research" => "research",
        "Reading List" => "reading-list",
        "Projects" => "projects",
        "Learning" => "learning",
        "Web Content" => "web-content",
        _ => "quick-notes",
    }
}

fn normalize_separators(s: &str) -> String {
    s.replace(['-', '_'], " ").to_lowercase()
}

/// Resolve a bare wiki-link target (no `/` in it) to a path relative to
/// `notes_root`, using the strategies in `spec.md` §4.4, first match wins.
fn resolve_wiki_target(target: &str, notes_root: &Path, index: &NotesIndex) -> Option<PathBuf> {
    if target.contains('/') {
        let candidate = notes_root.join(format!("{target}.md"));
        return if candidate.exists() { Some(candidate) } else { None };
    }

    // exact title match
    if let Some(note) = index.iter().find(|n| n.title == target) {
        return Some(note.path.clone());
    }
    // case-insensitive title match
    let lower = target.to_lowercase();
    if let Some(note) = index.iter().find(|n| n.title.to_lowercase() == lower) {
        return Some(note.path.clone());
    }
    // substring match
    if let Some(note) = index.iter().find(|n| n.title.to_lowercase().contains(&lower)) {
        return Some(note.path.clone());
    }
    // separator-normalized match
    let normalized = normalize_separators(target);
    if let Some(note) = index
        .iter()
        .find(|n| normalize_separators(&n.title) == normalized)
    {
        return Some(note.path.clone());
    }
    None
}

/// Rewrite every bare `[[X]]` in `content` to `[[<relative-path-without-ext>]]`
/// when it resolves against the index; links that don't resolve are left
/// untouched. `|display` suffixes are preserved.
pub fn rewrite_wiki_links(content: &str, notes_root: &Path, index: &NotesIndex) -> String {
    let re = Regex::new(r"\[\[([^\]]+)\]\]").unwrap();
    re.replace_all(content, |caps: &regex::Captures| {
        let inner = &caps[1];
        let (target, display) = match inner.split_once('|') {
            Some((t, d)) => (t, Some(d)),
            None => (inner, None),
        };

        match resolve_wiki_target(target, notes_root, index) {
            Some(resolved) => {
                let relative = resolved
                    .strip_prefix(notes_root)
                    .unwrap_or(&resolved)
                    .with_extension("");
                let rel_str = relative.to_string_lossy().replace('\\', "/");
                match display {
                    Some(d) => format!("[[{rel_str}|{d}]]"),
                    None => format!("[[{rel_str}]]"),
                }
            }
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// A candidate note related to some query content, ranked by token overlap.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedNote {
    pub path: PathBuf,
    pub title: String,
    pub overlap: usize,
    pub jaccard: f64,
}

/// Rank indexed notes by word-overlap with `content`, optionally
/// restricted to `category`.
pub fn related(content: &str, category: Option<&str>, limit: usize, index: &NotesIndex) -> Vec<RelatedNote> {
    let query_tokens: std::collections::HashSet<String> = tokenize(content).into_iter().collect();
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<RelatedNote> = index
        .iter()
        .filter(|note| category.map(|c| note.category == c).unwrap_or(true))
        .filter_map(|note| {
            let note_tokens: std::collections::HashSet<String> =
                tokenize(&note.body).into_iter().collect();
            let overlap = query_tokens.intersection(&note_tokens).count();
            if overlap == 0 {
                return None;
            }
            let union = query_tokens.union(&note_tokens).count();
            let jaccard = overlap as f64 / union.max(1) as f64;
            Some(RelatedNote {
                path: note.path.clone(),
                title: note.title.clone(),
                overlap,
                jaccard,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.overlap.cmp(&a.overlap));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn note(path: &str, title: &str, body: &str, category: &str) -> IndexedNote {
        IndexedNote {
            path: PathBuf::from(path),
            title: title.to_string(),
            body: body.to_string(),
            category: category.to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn slugify_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(slugify_filename("Hello, World!"), "hello-world");
        assert_eq!(slugify_filename("  multi   space "), "multi-space");
    }

    #[test]
    fn unique_filename_appends_suffix_on_collision() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("idea.md"), "x").unwrap();
        let path = unique_filename(dir.path(), "idea");
        assert_eq!(path.file_name().unwrap(), "idea-2.md");
    }

    #[test]
    fn init_category_folders_creates_readmes() {
        let dir = tempdir().unwrap();
        init_category_folders(dir.path()).unwrap();
        for folder in CATEGORY_FOLDERS {
            assert!(dir.path().join(folder).join("README.md").exists());
        }
    }

    #[test]
    fn create_note_writes_title_heading_and_frontmatter() {
        let dir = tempdir().unwrap();
        let index = NotesIndex::new();
        let path = create_note(
            dir.path(),
            "My Note",
            "body text",
            "Research",
            &["tag1".to_string()],
            &index,
        )
        .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("title: My Note"));
        assert!(content.contains("# My Note"));
        assert!(path.starts_with(dir.path().join("research")));
    }

    #[test]
    fn update_note_is_idempotent_on_retry() {
        let dir = tempdir().unwrap();
        let index = NotesIndex::new();
        let path = create_note(dir.path(), "Note", "body", "Personal", &[], &index).unwrap();

        let changed_first = update_note(&path, "new info", &index).unwrap();
        assert!(changed_first);

        let content_after_first = std::fs::read_to_string(&path).unwrap();
        let changed_second = update_note(&path, "new info", &index).unwrap();
        assert!(!changed_second);
        let content_after_second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content_after_first, content_after_second);
    }

    #[test]
    fn wiki_link_resolves_by_exact_title() {
        let mut index = NotesIndex::new();
        index.insert(note("research/target.md", "Target Note", "body", "Research"));
        let rewritten = rewrite_wiki_links("See [[Target Note]].", Path::new(""), &index);
        assert_eq!(rewritten, "See [[research/target]].");
    }

    #[test]
    fn wiki_link_preserves_display_text() {
        let mut index = NotesIndex::new();
        index.insert(note("research/target.md", "Target Note", "body", "Research"));
        let rewritten = rewrite_wiki_links("See [[Target Note|here]].", Path::new(""), &index);
        assert_eq!(rewritten, "See [[research/target|here]].");
    }

    #[test]
    fn unresolved_wiki_link_left_untouched() {
        let index = NotesIndex::new();
        let rewritten = rewrite_wiki_links("See [[Nonexistent]].", Path::new(""), &index);
        assert_eq!(rewritten, "See [[Nonexistent]].");
    }

    #[test]
    fn related_ranks_by_overlap() {
        let mut index = NotesIndex::new();
        index.insert(note("a.md", "A", "graph database knowledge system", "Research"));
        index.insert(note("b.md", "B", "cooking recipe pasta", "Personal"));
        let results = related("graph database knowledge", None, 5, &index);
        assert_eq!(results[0].title, "A");
    }

    #[test]
    fn related_respects_category_filter() {
        let mut index = NotesIndex::new();
        index.insert(note("a.md", "A", "graph database", "Research"));
        index.insert(note("b.md", "B", "graph theory notes", "Personal"));
        let results = related("graph database", Some("Personal"), 5, &index);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "B");
    }
}
