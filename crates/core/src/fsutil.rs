//! Small filesystem helpers shared across the persistence layer.

use std::fs;
use std::path::Path;

use crate::error::{NoteweaveError, Result};

/// Write `content` to `path` atomically: write to a sibling temp file
/// first, then rename over the destination. A crash mid-write leaves the
/// original file (or nothing) rather than a half-written one.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| NoteweaveError::io(parent.to_path_buf(), e))?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")
    ));
    fs::write(&tmp_path, content).map_err(|e| NoteweaveError::io(tmp_path.clone(), e))?;
    fs::rename(&tmp_path, path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/note.md");
        atomic_write(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.md");
        atomic_write(&path, "first").unwrap();
        atomic_write(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
