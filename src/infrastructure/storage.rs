//! Filesystem writing of downloaded data.
//!
//! Output paths mirror the remote folder hierarchy; parent directories are
//! created on demand. Boards are written as compact JSON, collections as
//! raw archive bytes.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::{AppError, Result};

/// Writes a board payload as compact JSON at `path`.
pub fn write_board_json(path: &Path, payload: &serde_json::Value) -> Result<()> {
    let content = serde_json::to_string(payload).map_err(AppError::json_parse)?;

    let mut file = create_file(path)?;
    file.write_all(content.as_bytes())
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote board");

    Ok(())
}

/// Creates a file at `path`, creating parent directories first.
///
/// Archive downloads stream into the returned handle chunk by chunk instead
/// of buffering whole bundles in memory.
pub fn create_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::io(format!("Failed to create directory {}", parent.display()), e)
        })?;
    }

    fs::File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_write_board_json_creates_parents_and_is_compact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Trips/Paris.json");

        let payload = json!({"name": "Paris", "images": [1, 2]});
        write_board_json(&path, &payload).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, r#"{"images":[1,2],"name":"Paris"}"#);
    }

    #[test]
    fn test_create_file_makes_nested_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c/Japan 2023.zip");

        // Write in two chunks, the way a streamed download arrives.
        let mut file = create_file(&path).unwrap();
        file.write_all(b"PK\x03\x04").unwrap();
        file.write_all(b"fake").unwrap();
        drop(file);

        assert_eq!(fs::read(&path).unwrap(), b"PK\x03\x04fake");
    }
}
