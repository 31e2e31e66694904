use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::bookmark::CreateDetails;
use crate::services::bookmark_store::{BookmarkStore, BOOKMARKS_BAR_ID};

const UNNAMED_FOLDER: &str = "Unnamed Folder";
const UNNAMED_BOOKMARK: &str = "Unnamed Bookmark";
const BLANK_URL: &str = "about:blank";

#[derive(Debug, Deserialize)]
struct ImportedNode {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    children: Option<Vec<ImportedNode>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub folders: usize,
    pub bookmarks: usize,
    /// Titles of the top-level folders that received items.
    pub targets: Vec<String>,
}

pub fn default_export_file_name(date: chrono::NaiveDate) -> String {
    format!("bookmarks_export_{}.json", date.format("%Y-%m-%d"))
}

pub async fn export_json<S: BookmarkStore>(store: &S) -> Result<String, AppError> {
    let tree = store.get_tree().await?;
    Ok(serde_json::to_string_pretty(&tree)?)
}

pub async fn export_to_file<S: BookmarkStore>(store: &S, path: &Path) -> Result<(), AppError> {
    let json = export_json(store).await?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "bookmarks exported");
    Ok(())
}

/// Imports an export file. A full export (first element carrying
/// `children`) is merged folder by folder into the top-level folders with the
/// same title; anything else lands in the bookmarks bar.
pub async fn import_json<S: BookmarkStore>(store: &S, raw: &str) -> Result<ImportReport, AppError> {
    let invalid = || AppError::General("Invalid bookmark file format".to_string());
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| invalid())?;
    if !value.is_array() {
        return Err(invalid());
    }
    let data: Vec<ImportedNode> = serde_json::from_value(value).map_err(|_| invalid())?;

    let mut report = ImportReport::default();
    let full_export = data.first().and_then(|root| root.children.as_ref());

    match full_export {
        Some(imported_roots) => {
            let tree = store.get_tree().await?;
            let existing = tree
                .first()
                .map(|root| root.children())
                .ok_or_else(|| AppError::Store("Could not access existing bookmark structure".to_string()))?;

            for imported in imported_roots {
                let title = imported.title.as_deref().unwrap_or_default();
                let target = existing.iter().find(|f| f.is_folder() && f.title == title);
                match (target, &imported.children) {
                    (Some(target), Some(children)) => {
                        create_items(store, &target.id, children, &mut report).await?;
                        report.targets.push(target.title.clone());
                    }
                    _ => tracing::warn!(title, "no matching top-level folder, skipping"),
                }
            }
        }
        None => {
            create_items(store, BOOKMARKS_BAR_ID, &data, &mut report).await?;
            report.targets.push("Bookmarks bar".to_string());
        }
    }

    tracing::info!(
        folders = report.folders,
        bookmarks = report.bookmarks,
        "bookmarks imported"
    );
    Ok(report)
}

pub async fn import_file<S: BookmarkStore>(store: &S, path: &Path) -> Result<ImportReport, AppError> {
    let raw = std::fs::read_to_string(path)?;
    import_json(store, &raw).await
}

fn non_empty<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
}

async fn create_items<S: BookmarkStore>(
    store: &S,
    parent_id: &str,
    items: &[ImportedNode],
    report: &mut ImportReport,
) -> Result<(), AppError> {
    let mut stack = vec![(parent_id.to_string(), items.iter())];
    while let Some((parent_id, pending)) = stack.last_mut() {
        let Some(item) = pending.next() else {
            stack.pop();
            continue;
        };
        let parent_id = parent_id.clone();

        match &item.children {
            Some(children) => {
                let title = non_empty(&item.title, UNNAMED_FOLDER);
                let folder = store.create(CreateDetails::folder(&parent_id, title)).await?;
                report.folders += 1;
                stack.push((folder.id, children.iter()));
            }
            None => {
                let title = non_empty(&item.title, UNNAMED_BOOKMARK);
                let url = non_empty(&item.url, BLANK_URL);
                store
                    .create(CreateDetails::bookmark(&parent_id, title, url))
                    .await?;
                report.bookmarks += 1;
            }
        }
    }
    Ok(())
}
