//! Lexical (grep) search and the ranking/snippet helpers shared by
//! semantic, grep, title and tag sub-queries (`spec.md` §4.7/§4.10).

use std::path::Path;

use regex::{escape, RegexBuilder};
use walkdir::WalkDir;

use super::types::{FileMatches, LineMatch};
use crate::error::Result;

const MAX_MATCHES_PER_FILE: usize = 5;
const CONTEXT_LINES: usize = 2;

/// Literal- or regex-scan every `*.md`/`*.markdown` file under
/// `notes_root` for `query`, ranked by total matches per file descending
/// and capped to `k` files. Falls back to a literal substring search if
/// `query` isn't a valid regex (`spec.md` §8 boundary behavior).
pub fn search_content(notes_root: &Path, query: &str, case_sensitive: bool, k: usize) -> Result<Vec<FileMatches>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let regex = RegexBuilder::new(query)
        .case_insensitive(!case_sensitive)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&escape(query))
                .case_insensitive(!case_sensitive)
                .build()
        });
    let Ok(regex) = regex else {
        return Ok(Vec::new());
    };

    let mut results = Vec::new();
    for entry in WalkDir::new(notes_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_markdown(e.path()))
    {
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();

        let mut matches = Vec::new();
        let mut total_matches = 0usize;
        for (i, line) in lines.iter().enumerate() {
            if regex.is_match(line) {
                total_matches += 1;
                if matches.len() < MAX_MATCHES_PER_FILE {
                    matches.push(LineMatch {
                        line_number: i + 1,
                        context: line_context(&lines, i, CONTEXT_LINES),
                    });
                }
            }
        }

        if total_matches > 0 {
            results.push(FileMatches {
                file_path: entry.path().to_string_lossy().to_string(),
                matches,
                total_matches,
            });
        }
    }

    results.sort_by(|a, b| b.total_matches.cmp(&a.total_matches));
    results.truncate(k);
    Ok(results)
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

/// `±context` lines around `line_index`, with a `>>> ` marker on the hit.
fn line_context(lines: &[&str], line_index: usize, context: usize) -> String {
    let start = line_index.saturating_sub(context);
    let end = (line_index + context + 1).min(lines.len());
    lines[start..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let i = start + offset;
            if i == line_index {
                format!(">>> {line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The sentence in `content` with the most query-word overlap, truncated
/// to `max_length` characters with an ellipsis (`spec.md` §4.10 step 1).
pub fn semantic_snippet(content: &str, query: &str, max_length: usize) -> String {
    let query_words: std::collections::HashSet<String> =
        crate::text::tokenize(query).into_iter().collect();

    let best = content
        .split(['.', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .max_by_key(|sentence| {
            let words: std::collections::HashSet<String> =
                crate::text::tokenize(sentence).into_iter().collect();
            words.intersection(&query_words).count()
        })
        .unwrap_or_else(|| content.trim());

    truncate_with_ellipsis(best, max_length)
}

/// A window of `line` centered on the first occurrence of `query`
/// (case-insensitive), truncated to `max_length` with ellipses at any
/// truncated end (`spec.md` §4.10 step 2).
pub fn grep_snippet(line: &str, query: &str, max_length: usize) -> String {
    let lower_line = line.to_lowercase();
    let lower_query = query.to_lowercase();
    let Some(pos) = lower_line.find(&lower_query) else {
        return truncate_with_ellipsis(line, max_length);
    };

    if line.len() <= max_length {
        return line.to_string();
    }

    let half = max_length / 2;
    let start = pos.saturating_sub(half);
    let end = (pos + query.len() + half).min(line.len());
    let start = nearest_char_boundary(line, start);
    let end = nearest_char_boundary(line, end);

    let mut snippet = line[start..end].to_string();
    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < line.len() {
        snippet = format!("{snippet}...");
    }
    snippet
}

fn truncate_with_ellipsis(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }
    let boundary = nearest_char_boundary(text, max_length.saturating_sub(3));
    format!("{}...", &text[..boundary])
}

fn nearest_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_literal_match_with_context_marker() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "line one\nFollow PEP 8.\nline three\n").unwrap();
        let results = search_content(dir.path(), "PEP 8", false, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches[0].line_number, 2);
        assert!(results[0].matches[0].context.contains(">>> Follow PEP 8."));
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "has (unbalanced paren in text\n").unwrap();
        let results = search_content(dir.path(), "(unbalanced", false, 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn ranks_files_by_total_match_count() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("many.md"), "x\nx\nx\n").unwrap();
        std::fs::write(dir.path().join("one.md"), "x\n").unwrap();
        let results = search_content(dir.path(), "x", false, 10).unwrap();
        assert_eq!(results[0].file_path, dir.path().join("many.md").to_string_lossy());
    }

    #[test]
    fn semantic_snippet_picks_highest_overlap_sentence() {
        let content = "Cooking pasta is fun. Machine learning is a subset of AI. The weather is nice.";
        let snippet = semantic_snippet(content, "machine learning AI", 200);
        assert!(snippet.contains("Machine learning"));
    }

    #[test]
    fn grep_snippet_truncates_long_lines_with_ellipses() {
        let line = format!("{}PEP 8{}", "a".repeat(300), "b".repeat(300));
        let snippet = grep_snippet(&line, "PEP 8", 50);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("PEP 8"));
    }
}
