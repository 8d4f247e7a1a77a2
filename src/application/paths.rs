//! Folder-path resolution.
//!
//! Computes a deterministic, filesystem-safe full path for every folder and
//! item by walking parent links. Pure functions over the already-fetched
//! folder set; no network access.

use std::collections::{HashMap, HashSet};

use crate::domain::{AppError, Folder, FolderItem, ItemKind, ResolvedItem, Result};

/// Replaces path separators in a display name so it cannot nest directories.
///
/// Idempotent, and never introduces a `/`.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.replace('/', "_")
}

/// Precomputed full paths for a fetched folder set.
#[derive(Debug)]
pub struct PathResolver {
    folder_paths: HashMap<String, String>,
}

impl PathResolver {
    /// Resolves the full path of every folder up front.
    ///
    /// # Errors
    /// Returns `DataIntegrity` if a parent chain is cyclic or references a
    /// folder that was never fetched.
    pub fn new(folders: &HashMap<String, Folder>) -> Result<Self> {
        let mut folder_paths = HashMap::with_capacity(folders.len());
        for id in folders.keys() {
            folder_paths.insert(id.clone(), resolve_folder_path(id, folders)?);
        }
        Ok(Self { folder_paths })
    }

    /// Full path of a folder, if it was part of the fetched set.
    #[must_use]
    pub fn folder_path(&self, folder_id: &str) -> Option<&str> {
        self.folder_paths.get(folder_id).map(String::as_str)
    }

    /// Attaches full paths to items and rejects colliding output paths.
    ///
    /// Two items of the same kind resolving to the same sanitized path would
    /// silently overwrite each other on disk, so that is a hard error.
    pub fn resolve_items(&self, items: &[FolderItem]) -> Result<Vec<ResolvedItem>> {
        let mut seen: HashSet<(String, ItemKind)> = HashSet::new();
        let mut resolved = Vec::with_capacity(items.len());

        for item in items {
            let folder_path = self.folder_path(&item.parent_folder_id).ok_or_else(|| {
                AppError::data_integrity(format!(
                    "Item {} listed under unknown folder {}",
                    item.id, item.parent_folder_id
                ))
            })?;

            let full_path = format!("{folder_path}/{}", sanitize(&item.name));

            if !seen.insert((full_path.clone(), item.kind)) {
                return Err(AppError::data_integrity(format!(
                    "Two {}s resolve to the same output path {full_path:?}",
                    item.kind
                )));
            }

            resolved.push(ResolvedItem {
                id: item.id.clone(),
                kind: item.kind,
                name: item.name.clone(),
                full_path,
            });
        }

        Ok(resolved)
    }
}

/// Walks parent links upward, prepending each sanitized ancestor name.
fn resolve_folder_path(folder_id: &str, folders: &HashMap<String, Folder>) -> Result<String> {
    let mut components = Vec::new();
    let mut visited = HashSet::new();
    let mut current = folder_id;

    loop {
        if !visited.insert(current) {
            return Err(AppError::data_integrity(format!(
                "Cyclic parent chain detected at folder {current}"
            )));
        }

        let folder = folders.get(current).ok_or_else(|| {
            AppError::data_integrity(format!(
                "Folder {folder_id} references missing ancestor {current}"
            ))
        })?;

        components.push(sanitize(&folder.name));
        match &folder.parent_folder_id {
            Some(parent) => current = parent,
            None => break,
        }
    }

    components.reverse();
    Ok(components.join("/"))
}
