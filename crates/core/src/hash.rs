//! Content hash tracking (C1).
//!
//! Detects whether a note's content changed since the last time it was
//! seen, without re-parsing or re-embedding unchanged files. Two JSON
//! files persist the tracker's state inside the knowledge-base directory:
//! `hash_cache.json` (identifier -> last-seen hash + metadata) and
//! `note_mapping.json` (file path -> knowledge-graph node id). Both are
//! written atomically (temp file + rename) so a crash mid-write never
//! corrupts either map.
//!
//! Identifiers into the cache are either absolute file paths (one entry
//! per note) or a `processed_content:<hash>` prefixed key used to memoize
//! derived computations (e.g. an expensive embedding keyed by the content
//! hash it was computed from), matching the original implementation's
//! convention.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{NoteweaveError, Result};

/// Prefix for cache keys that memoize a derived computation rather than
/// tracking a file on disk.
pub const PROCESSED_CONTENT_PREFIX: &str = "processed_content:";

/// Compute the SHA-256 hex digest of a note's raw content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    hash: String,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, String>,
}

/// Aggregate counters returned by [`HashTracker::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct HashCacheStats {
    pub total_cached_items: usize,
    pub total_mapped_notes: usize,
    pub last_updated: String,
}

/// Tracks content hashes and path -> node-id mappings across runs.
pub struct HashTracker {
    cache_path: PathBuf,
    mapping_path: PathBuf,
    cache: HashMap<String, CacheEntry>,
    note_mapping: HashMap<String, String>,
}

impl HashTracker {
    /// Load (or initialize) a tracker rooted at `knowledge_base_directory`.
    pub fn load(knowledge_base_directory: &Path) -> Result<Self> {
        let cache_path = knowledge_base_directory.join("hash_cache.json");
        let mapping_path = knowledge_base_directory.join("note_mapping.json");

        let cache = load_json_map(&cache_path)?;
        let note_mapping = load_json_map(&mapping_path)?;

        Ok(HashTracker {
            cache_path,
            mapping_path,
            cache,
            note_mapping,
        })
    }

    /// The hash recorded the last time this identifier was seen, if any.
    pub fn get_cached_hash(&self, identifier: &str) -> Option<&str> {
        self.cache.get(identifier).map(|e| e.hash.as_str())
    }

    /// Returns `true` when `content`'s hash differs from the cached one
    /// (or there is no cached entry yet).
    pub fn has_content_changed(&self, identifier: &str, content: &str) -> bool {
        let current = hash_content(content);
        self.get_cached_hash(identifier) != Some(current.as_str())
    }

    /// Record a new hash for `identifier`, persisting immediately.
    pub fn update_hash(
        &mut self,
        identifier: impl Into<String>,
        hash: impl Into<String>,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        self.cache.insert(
            identifier.into(),
            CacheEntry {
                hash: hash.into(),
                updated_at: Utc::now(),
                metadata,
            },
        );
        self.save_cache()
    }

    /// The knowledge-graph node id a file path was last mapped to.
    pub fn get_knowledge_node_id(&self, path: &str) -> Option<&str> {
        self.note_mapping.get(path).map(|s| s.as_str())
    }

    /// Record (or update) which node id a file path maps to.
    pub fn set_note_mapping(&mut self, path: impl Into<String>, node_id: impl Into<String>) -> Result<()> {
        self.note_mapping.insert(path.into(), node_id.into());
        self.save_mapping()
    }

    /// Forget a path's mapping, e.g. after the underlying file is deleted.
    pub fn remove_note_mapping(&mut self, path: &str) -> Result<()> {
        self.note_mapping.remove(path);
        self.save_mapping()
    }

    /// Drop both the hash and mapping entry for `identifier`/`path`.
    pub fn remove(&mut self, identifier: &str) -> Result<()> {
        self.cache.remove(identifier);
        self.note_mapping.remove(identifier);
        self.save_cache()?;
        self.save_mapping()
    }

    /// Remove cache and mapping entries whose identifier/path is no longer
    /// one of `valid_identifiers` (a note was deleted or moved out from
    /// under the tracker while the process wasn't watching).
    pub fn cleanup_stale_entries(&mut self, valid_identifiers: &[String]) -> Result<usize> {
        let valid: std::collections::HashSet<&str> =
            valid_identifiers.iter().map(String::as_str).collect();

        let before_cache = self.cache.len();
        self.cache.retain(|k, _| {
            k.starts_with(PROCESSED_CONTENT_PREFIX) || valid.contains(k.as_str())
        });
        let before_mapping = self.note_mapping.len();
        self.note_mapping.retain(|k, _| valid.contains(k.as_str()));

        let removed = (before_cache - self.cache.len()) + (before_mapping - self.note_mapping.len());
        if removed > 0 {
            tracing::info!(removed, "cleaned up stale hash tracker entries");
            self.save_cache()?;
            self.save_mapping()?;
        }
        Ok(removed)
    }

    /// Wipe all tracked state.
    pub fn clear(&mut self) -> Result<()> {
        self.cache.clear();
        self.note_mapping.clear();
        self.save_cache()?;
        self.save_mapping()
    }

    pub fn stats(&self) -> HashCacheStats {
        let last_updated = self
            .cache
            .values()
            .map(|e| e.updated_at)
            .max()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "Never".to_string());

        HashCacheStats {
            total_cached_items: self.cache.len(),
            total_mapped_notes: self.note_mapping.len(),
            last_updated,
        }
    }

    fn save_cache(&self) -> Result<()> {
        atomic_write_json(&self.cache_path, &self.cache)
    }

    fn save_mapping(&self) -> Result<()> {
        atomic_write_json(&self.mapping_path, &self.note_mapping)
    }
}

fn load_json_map<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
    match serde_json::from_str(&content) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "discarding unreadable cache file");
            Ok(T::default())
        }
    }
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| NoteweaveError::io(parent.to_path_buf(), e))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, content).map_err(|e| NoteweaveError::io(tmp_path.clone(), e))?;
    fs::rename(&tmp_path, path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash_content("hello"), hash_content("hello"));
        assert_ne!(hash_content("hello"), hash_content("world"));
    }

    #[test]
    fn change_detection_on_fresh_tracker() {
        let dir = tempdir().unwrap();
        let tracker = HashTracker::load(dir.path()).unwrap();
        assert!(tracker.has_content_changed("/notes/a.md", "content"));
    }

    #[test]
    fn update_then_unchanged() {
        let dir = tempdir().unwrap();
        let mut tracker = HashTracker::load(dir.path()).unwrap();
        let h = hash_content("content");
        tracker
            .update_hash("/notes/a.md", h, HashMap::new())
            .unwrap();
        assert!(!tracker.has_content_changed("/notes/a.md", "content"));
        assert!(tracker.has_content_changed("/notes/a.md", "different"));
    }

    #[test]
    fn persists_across_reload() {
        let dir = tempdir().unwrap();
        {
            let mut tracker = HashTracker::load(dir.path()).unwrap();
            tracker
                .update_hash("/notes/a.md", hash_content("content"), HashMap::new())
                .unwrap();
            tracker
                .set_note_mapping("/notes/a.md", "note_0123456789abcdef")
                .unwrap();
        }
        let tracker = HashTracker::load(dir.path()).unwrap();
        assert!(!tracker.has_content_changed("/notes/a.md", "content"));
        assert_eq!(
            tracker.get_knowledge_node_id("/notes/a.md"),
            Some("note_0123456789abcdef")
        );
    }

    #[test]
    fn cleanup_removes_only_stale() {
        let dir = tempdir().unwrap();
        let mut tracker = HashTracker::load(dir.path()).unwrap();
        tracker
            .update_hash("/notes/a.md", hash_content("a"), HashMap::new())
            .unwrap();
        tracker
            .update_hash("/notes/b.md", hash_content("b"), HashMap::new())
            .unwrap();
        let removed = tracker
            .cleanup_stale_entries(&["/notes/a.md".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(tracker.get_cached_hash("/notes/a.md").is_some());
        assert!(tracker.get_cached_hash("/notes/b.md").is_none());
    }

    #[test]
    fn stats_reports_counts() {
        let dir = tempdir().unwrap();
        let mut tracker = HashTracker::load(dir.path()).unwrap();
        assert_eq!(tracker.stats().last_updated, "Never");
        tracker
            .update_hash("/notes/a.md", hash_content("a"), HashMap::new())
            .unwrap();
        let stats = tracker.stats();
        assert_eq!(stats.total_cached_items, 1);
        assert_ne!(stats.last_updated, "Never");
    }
}
