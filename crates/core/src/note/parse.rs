//! Markdown parsing (C2): front-matter split, title/category/tag/hierarchy
//! extraction, wiki-link and typed-relationship extraction.

use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::frontmatter::NoteFrontmatter;
use super::types::{RelationType, Relationship, WikiLink};
use crate::id::NoteId;

/// A fully parsed note, ready to be folded into the graph.
#[derive(Debug, Clone)]
pub struct ParsedNote {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: Vec<String>,
    pub wiki_links: Vec<WikiLink>,
    pub relationships: Vec<Relationship>,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub content_hash: String,
    pub frontmatter: NoteFrontmatter,
}

fn wiki_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap())
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([a-zA-Z0-9_-]+)").unwrap())
}

fn relationship_re(relation: RelationType) -> Regex {
    Regex::new(&format!(
        r"(?i){}::\s*\[\[([^\]]+)\]\]",
        regex::escape(relation.as_str())
    ))
    .expect("static relation pattern is valid")
}

/// Maps the first path segment under the notes root to a display category.
fn category_from_path_segment(segment: &str) -> Option<&'static str> {
    match segment {
        "ideas" => Some("Ideas to Develop"),
        "personal" => Some("Personal"),
        "research" => Some("Research"),
        "reading-list" => Some("Reading List"),
        "projects" => Some("Projects"),
        "learning" => Some("Learning"),
        "quick-notes" => Some("Quick Notes"),
        "web-content" => Some("Web Content"),
        _ => None,
    }
}

/// Split `content` into `(frontmatter, body)`. YAML parse failure degrades
/// to empty front-matter with the whole input treated as body, logged as a
/// warning — never a hard error (see `spec.md` §7 ParseError policy).
pub fn split_frontmatter(content: &str) -> (NoteFrontmatter, String) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (NoteFrontmatter::default(), content.to_string());
    };

    let Some(end) = find_closing_delimiter(rest) else {
        return (NoteFrontmatter::default(), content.to_string());
    };

    let yaml = &rest[..end];
    let body = rest[end..]
        .strip_prefix("---\n")
        .or_else(|| rest[end..].strip_prefix("---"))
        .unwrap_or(&rest[end..])
        .trim_start_matches('\n')
        .to_string();

    match serde_yaml::from_str::<NoteFrontmatter>(yaml) {
        Ok(fm) => (fm, body),
        Err(err) => {
            tracing::warn!(error = %err, "malformed front-matter, treating whole file as body");
            (NoteFrontmatter::default(), content.to_string())
        }
    }
}

fn find_closing_delimiter(rest: &str) -> Option<usize> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        if trimmed == "---" {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn extract_title(frontmatter: &NoteFrontmatter, body: &str, path: &Path) -> String {
    if let Some(title) = &frontmatter.title {
        if !title.trim().is_empty() {
            return title.clone();
        }
    }
    if let Some(caps) = heading_re().captures(body) {
        return caps[1].trim().to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string())
}

fn extract_category(frontmatter: &NoteFrontmatter, path: &Path, notes_root: &Path) -> String {
    if let Some(category) = &frontmatter.category {
        if !category.trim().is_empty() {
            return category.clone();
        }
    }
    if let Ok(relative) = path.strip_prefix(notes_root) {
        if let Some(first) = relative.components().next() {
            if let Some(mapped) = category_from_path_segment(&first.as_os_str().to_string_lossy()) {
                return mapped.to_string();
            }
        }
    }
    "Quick Notes".to_string()
}

fn extract_tags(frontmatter: &NoteFrontmatter, body: &str) -> Vec<String> {
    let mut tags: Vec<String> = frontmatter.tags().to_vec();
    for caps in tag_re().captures_iter(body) {
        tags.push(caps[1].to_string());
    }
    tags.sort();
    tags.dedup();
    tags
}

fn extract_wiki_links(body: &str) -> Vec<WikiLink> {
    let mut links = Vec::new();
    for mat in wiki_link_re().find_iter(body) {
        let line_number = body[..mat.start()].matches('\n').count() + 1;
        let inner = &body[mat.start() + 2..mat.end() - 2];
        let (target, display_text) = match inner.split_once('|') {
            Some((t, d)) => (t.trim().to_string(), d.trim().to_string()),
            None => (inner.trim().to_string(), inner.trim().to_string()),
        };
        let ctx_start = mat.start().saturating_sub(50);
        let ctx_end = (mat.end() + 50).min(body.len());
        let context = safe_slice(body, ctx_start, ctx_end);

        links.push(WikiLink {
            target,
            display_text,
            line_number,
            context,
        });
    }
    links
}

/// Slice `s[start..end]`, nudging both bounds outward to the nearest char
/// boundary so this never panics on multi-byte UTF-8 content.
fn safe_slice(s: &str, mut start: usize, mut end: usize) -> String {
    while start > 0 && !s.is_char_boundary(start) {
        start -= 1;
    }
    while end < s.len() && !s.is_char_boundary(end) {
        end += 1;
    }
    s[start..end].to_string()
}

fn extract_relationships(body: &str) -> Vec<Relationship> {
    let mut relationships = Vec::new();
    for relation_type in RelationType::ALL {
        let re = relationship_re(relation_type);
        for caps in re.captures_iter(body) {
            let mat = caps.get(0).unwrap();
            let line_number = body[..mat.start()].matches('\n').count() + 1;
            let target = caps[1].split('|').next().unwrap_or(&caps[1]).trim().to_string();
            relationships.push(Relationship {
                relation_type,
                target,
                line_number,
            });
        }
    }
    relationships
}

/// Extract the wiki-links in `body` alone, without a full parse. Used by
/// the knowledge graph's link-resolution pass, which re-derives edges from
/// a node's stored body rather than keeping a parallel copy of them.
pub fn wiki_links_in(body: &str) -> Vec<WikiLink> {
    extract_wiki_links(body)
}

/// Extract the typed relationships in `body` alone. See [`wiki_links_in`].
pub fn relationships_in(body: &str) -> Vec<Relationship> {
    extract_relationships(body)
}

/// Parse a note's raw file content into a [`ParsedNote`].
///
/// `path` is the file's absolute path and `notes_root` the configured
/// notes directory, used together to derive a folder-based category when
/// front-matter doesn't specify one.
pub fn parse_note(content: &str, path: &Path, notes_root: &Path) -> ParsedNote {
    let (frontmatter, body) = split_frontmatter(content);

    let title = extract_title(&frontmatter, &body, path);
    let category = extract_category(&frontmatter, path, notes_root);
    let tags = extract_tags(&frontmatter, &body);
    let wiki_links = extract_wiki_links(&body);
    let relationships = extract_relationships(&body);

    let mut children: Vec<String> = frontmatter.children().to_vec();
    for rel in relationships.iter().filter(|r| r.relation_type == RelationType::ParentOf) {
        children.push(rel.target.clone());
    }
    children.sort();
    children.dedup();

    let parent = frontmatter.parent.clone().or_else(|| {
        relationships
            .iter()
            .find(|r| r.relation_type == RelationType::ChildOf)
            .map(|r| r.target.clone())
    });

    let content_hash = crate::id::NoteId::from_content(&title, &body, &category, &tags)
        .as_str()
        .trim_start_matches("note_")
        .to_string();
    let id = NoteId::from_content(&title, &body, &category, &tags);

    ParsedNote {
        id,
        title,
        body,
        category,
        tags,
        wiki_links,
        relationships,
        parent,
        children,
        content_hash,
        frontmatter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn root() -> PathBuf {
        PathBuf::from("/vault/notes")
    }

    #[test]
    fn splits_frontmatter_and_body() {
        let content = "---\ntitle: Hello\n---\nBody text here.\n";
        let (fm, body) = split_frontmatter(content);
        assert_eq!(fm.title.as_deref(), Some("Hello"));
        assert_eq!(body, "Body text here.\n");
    }

    #[test]
    fn content_without_frontmatter_is_all_body() {
        let content = "# Just a heading\n\nSome text.\n";
        let (fm, body) = split_frontmatter(content);
        assert!(fm.title.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn malformed_yaml_degrades_to_whole_body() {
        let content = "---\ntitle: [unterminated\n---\nBody.\n";
        let (fm, body) = split_frontmatter(content);
        assert!(fm.title.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn title_precedence_frontmatter_then_heading_then_filename() {
        let path = root().join("quick-notes/untitled-note.md");

        let with_fm = parse_note("---\ntitle: From FM\n---\nBody\n", &path, &root());
        assert_eq!(with_fm.title, "From FM");

        let with_heading = parse_note("# From Heading\n\nBody\n", &path, &root());
        assert_eq!(with_heading.title, "From Heading");

        let with_neither = parse_note("just some text, no heading\n", &path, &root());
        assert_eq!(with_neither.title, "untitled-note");
    }

    #[test]
    fn category_from_folder_mapping() {
        let path = root().join("research/paper-notes.md");
        let parsed = parse_note("no frontmatter here\n", &path, &root());
        assert_eq!(parsed.category, "Research");
    }

    #[test]
    fn category_defaults_to_quick_notes() {
        let path = root().join("misc/thing.md");
        let parsed = parse_note("content\n", &path, &root());
        assert_eq!(parsed.category, "Quick Notes");
    }

    #[test]
    fn tags_union_frontmatter_and_hashtags() {
        let content = "---\ntags: alpha\n---\nSome #beta and #alpha again.\n";
        let parsed = parse_note(content, &root().join("a.md"), &root());
        assert_eq!(parsed.tags, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn wiki_links_split_on_pipe() {
        let content = "See [[Target Note|shown text]] for more.";
        let parsed = parse_note(content, &root().join("a.md"), &root());
        assert_eq!(parsed.wiki_links.len(), 1);
        assert_eq!(parsed.wiki_links[0].target, "Target Note");
        assert_eq!(parsed.wiki_links[0].display_text, "shown text");
    }

    #[test]
    fn wiki_link_without_pipe_uses_target_as_display() {
        let content = "See [[Target Note]] for more.";
        let parsed = parse_note(content, &root().join("a.md"), &root());
        assert_eq!(parsed.wiki_links[0].display_text, "Target Note");
    }

    #[test]
    fn typed_relationship_extraction_is_case_insensitive() {
        let content = "PARENT_OF:: [[Some Parent]]\n";
        let parsed = parse_note(content, &root().join("a.md"), &root());
        assert_eq!(parsed.relationships.len(), 1);
        assert_eq!(parsed.relationships[0].relation_type, RelationType::ParentOf);
        assert_eq!(parsed.relationships[0].target, "Some Parent");
    }

    #[test]
    fn same_content_yields_same_id() {
        let content = "---\ntitle: Stable\ntags: x, y\n---\nBody.\n";
        let a = parse_note(content, &root().join("a.md"), &root());
        let b = parse_note(content, &root().join("a.md"), &root());
        assert_eq!(a.id, b.id);
    }
}
