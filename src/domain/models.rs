//! Domain models for refern folder, item, and export data.
//!
//! These models represent the core entities fetched from the refern API.
//! They are read-only snapshots; derived data (full paths) lives in
//! [`ResolvedItem`] rather than being patched onto the fetched records.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A hierarchical container in the remote service holding boards and collections.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique identifier for this folder.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name (may contain characters unsafe for filesystem paths).
    pub name: String,
    /// Parent folder, `None` for roots.
    #[serde(default)]
    pub parent_folder_id: Option<String>,
}

/// Kind of item stored inside a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ItemKind {
    /// Exported as a JSON metadata file.
    Board,
    /// Exported as a zipped archive via an asynchronous job.
    Collection,
    /// Anything else the service may add; skipped during takeout.
    Unknown,
}

impl From<String> for ItemKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "board" => Self::Board,
            "collection" => Self::Collection,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Board => write!(f, "board"),
            Self::Collection => write!(f, "collection"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A board or collection as listed inside one folder.
#[derive(Debug, Clone)]
pub struct FolderItem {
    /// Unique identifier for this item.
    pub id: String,
    /// Board or collection.
    pub kind: ItemKind,
    /// Display name.
    pub name: String,
    /// The folder this item was listed under.
    pub parent_folder_id: String,
}

/// An item with its filesystem-safe full path attached.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub id: String,
    pub kind: ItemKind,
    pub name: String,
    /// Slash-joined chain of sanitized folder names plus the item name.
    pub full_path: String,
}

/// Lifecycle state of a collection export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Started,
    Completed,
    Deleted,
}

impl ExportState {
    /// Maps a wire-format status string to a known state.
    ///
    /// Returns `None` for anything outside the documented set; callers must
    /// treat that as a protocol mismatch, not guess.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Completed => write!(f, "completed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Status record of a collection's export job.
///
/// At most one record exists per collection at a time; a 404 from the
/// status endpoint means the collection has never been exported.
#[derive(Debug, Clone)]
pub struct ExportStatus {
    /// Identifier of the export job itself (not the collection).
    pub id: String,
    pub state: ExportState,
    /// Millisecond timestamps of recorded export runs.
    pub export_times: Vec<i64>,
    /// Present once the job reaches `completed`.
    pub download_url: Option<String>,
}

impl ExportStatus {
    /// The most recent recorded export time, if any.
    #[must_use]
    pub fn last_export_time(&self) -> Option<DateTime<Utc>> {
        self.export_times
            .iter()
            .max()
            .and_then(|ms| DateTime::from_timestamp_millis(*ms))
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == ExportState::Completed
    }
}
