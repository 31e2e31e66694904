use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;
use crate::models::bookmark::FolderSummaryEntry;
use crate::services::bookmark_store::{BookmarkStore, BOOKMARKS_BAR_ID};
use crate::services::import_export_service::{self, ImportReport};
use crate::services::tree_service::{collect_bookmarks, flat_folder_structure};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOverview {
    pub folders: Vec<FolderSummaryEntry>,
    pub bookmark_count: usize,
}

/// Folder summary and leaf count of the bookmarks bar, as the organizer sees it.
pub async fn tree_overview<S: BookmarkStore>(store: &S) -> Result<TreeOverview, AppError> {
    let children = store.get_children(BOOKMARKS_BAR_ID).await?;
    Ok(TreeOverview {
        folders: flat_folder_structure(&children),
        bookmark_count: collect_bookmarks(&children).len(),
    })
}

/// Writes the whole tree to `target`, or to a dated file in the current
/// directory. Returns the path written.
pub async fn export_bookmarks<S: BookmarkStore>(
    store: &S,
    target: Option<&Path>,
) -> Result<PathBuf, AppError> {
    let path = match target {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(import_export_service::default_export_file_name(
            chrono::Local::now().date_naive(),
        )),
    };
    import_export_service::export_to_file(store, &path).await?;
    Ok(path)
}

pub async fn import_bookmarks<S: BookmarkStore>(
    store: &S,
    source: &Path,
) -> Result<ImportReport, AppError> {
    import_export_service::import_file(store, source).await
}
