//! Note parsing and front-matter types (C2).

pub mod frontmatter;
pub mod parse;
pub mod types;

pub use frontmatter::NoteFrontmatter;
pub use parse::{parse_note, relationships_in, split_frontmatter, wiki_links_in, ParsedNote};
pub use types::{RelationType, Relationship, WikiLink};

use std::path::Path;

use crate::error::{NoteweaveError, Result};

/// Re-serialize a note's front-matter + body into on-disk Markdown.
pub fn to_markdown(frontmatter: &NoteFrontmatter, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n\n{body}"))
}

/// Read a note file and parse it.
pub fn read_and_parse(path: &Path, notes_root: &Path) -> Result<ParsedNote> {
    let content =
        std::fs::read_to_string(path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
    Ok(parse_note(&content, path, notes_root))
}

/// Update a note's `parent`/`children` front-matter fields and rewrite the
/// file, preserving every other front-matter key and the body untouched.
///
/// This is the writeback half of relationship round-tripping described in
/// `spec.md` §4.2: callers pass the relationships just discovered for a
/// node so that e.g. a `parent_of` edge declared on the *other* note gets
/// mirrored back into this note's own `children` list on disk.
pub fn write_relationships(
    path: &Path,
    parent: Option<&str>,
    children: &[String],
) -> Result<()> {
    let content =
        std::fs::read_to_string(path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
    let (mut frontmatter, body) = split_frontmatter(&content);

    frontmatter.parent = parent.map(str::to_string);
    frontmatter.children = frontmatter::StringList(children.to_vec());
    frontmatter.updated = Some(chrono::Utc::now());

    let rewritten = to_markdown(&frontmatter, &body)?;
    crate::fsutil::atomic_write(path, &rewritten)
}
