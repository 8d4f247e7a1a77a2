//! End-to-end takeout driver.
//!
//! Sequences the whole export: resolve the user, fetch folders and items,
//! compute full paths, dump boards directly, then drive collections through
//! the export job lifecycle and download the archives. Strictly sequential;
//! the first failure aborts the run, leaving already-written files in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::domain::{Folder, ItemKind, ResolvedItem, Result};
use crate::infrastructure::{storage, RefernApi};

use super::exporter::{CollectionExporter, ExportTarget, PollOptions};
use super::paths::PathResolver;

/// Tunables for a takeout run.
#[derive(Debug, Clone)]
pub struct TakeoutOptions {
    /// Root of the local output tree.
    pub output_dir: PathBuf,
    /// Maximum age a prior export may have before it is re-triggered.
    pub max_export_age: chrono::Duration,
    /// Polling behavior while waiting for export jobs.
    pub poll: PollOptions,
}

/// Runs the full takeout for one user account.
pub async fn run_takeout(api: &RefernApi, username: &str, options: &TakeoutOptions) -> Result<()> {
    let user_id = api.resolve_user_id(username).await?;
    tracing::debug!(user_id = %user_id, "Resolved user");

    let folders: HashMap<String, Folder> = api
        .list_folders(&user_id)
        .await?
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();
    tracing::debug!(folders = folders.len(), "Fetched folders");

    let mut items = Vec::new();
    for folder_id in folders.keys() {
        items.extend(api.list_folder_items(folder_id).await?);
    }
    tracing::debug!(items = items.len(), "Fetched folder items");

    let resolver = PathResolver::new(&folders)?;
    let resolved = resolver.resolve_items(&items)?;
    let (boards, collections) = split_items(resolved);

    println!(
        "Exporting {} board(s) and {} collection(s) to {}",
        boards.len(),
        collections.len(),
        options.output_dir.display()
    );

    dump_boards(api, &boards, &options.output_dir).await?;
    dump_collections(api, &collections, &user_id, options).await?;

    println!("{} Takeout complete", "✓".green().bold());

    Ok(())
}

/// Fetches each board's payload and writes it as `<full_path>.json`.
pub async fn dump_boards(api: &RefernApi, boards: &[ResolvedItem], output_dir: &Path) -> Result<()> {
    for board in boards {
        println!("{} board {} ({})", "↓".cyan(), board.full_path, board.id);
        let payload = api.get_board(&board.id).await?;
        let path = output_dir.join(format!("{}.json", board.full_path));
        storage::write_board_json(&path, &payload)?;
    }

    Ok(())
}

/// Drives all collections through export, then downloads each archive as
/// `<full_path>.zip`.
///
/// Triggering every stale export up front and polling the pending set
/// together lets the service process the jobs in parallel instead of this
/// client waiting on them one at a time.
pub async fn dump_collections(
    api: &RefernApi,
    collections: &[ResolvedItem],
    user_id: &str,
    options: &TakeoutOptions,
) -> Result<()> {
    if collections.is_empty() {
        return Ok(());
    }

    let targets = collections
        .iter()
        .map(|c| ExportTarget {
            collection_id: c.id.clone(),
            display_name: c.full_path.clone(),
        })
        .collect();

    let mut exporter = CollectionExporter::new(api, user_id, targets).await?;
    exporter.refresh_if_stale(options.max_export_age).await?;
    exporter.await_all_completed(&options.poll).await?;

    println!("{} All collections ready for download", "✓".green());

    for collection in collections {
        println!(
            "{} collection {} ({})",
            "↓".cyan(),
            collection.full_path,
            collection.id
        );
        let url = exporter.download_url(&collection.id)?;
        let path = options.output_dir.join(format!("{}.zip", collection.full_path));
        api.download_to(url, &path).await?;
    }

    Ok(())
}

/// Splits resolved items into boards and collections, dropping anything else.
fn split_items(resolved: Vec<ResolvedItem>) -> (Vec<ResolvedItem>, Vec<ResolvedItem>) {
    let mut boards = Vec::new();
    let mut collections = Vec::new();

    for item in resolved {
        match item.kind {
            ItemKind::Board => boards.push(item),
            ItemKind::Collection => collections.push(item),
            ItemKind::Unknown => {
                tracing::debug!(item = %item.id, name = %item.name, "Skipping item of unknown kind");
            }
        }
    }

    (boards, collections)
}
