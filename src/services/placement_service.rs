use crate::error::AppError;
use crate::models::bookmark::CreateDetails;
use crate::services::bookmark_store::BookmarkStore;

/// Resolves `path` below `anchor_id`, reusing an existing folder whose title
/// matches a segment case-insensitively and creating the rest with the exact
/// casing given. Blank segments are skipped. Returns the leaf folder id.
pub async fn ensure_folder_path<S: BookmarkStore>(
    store: &S,
    anchor_id: &str,
    path: &[String],
) -> Result<String, AppError> {
    let mut parent_id = anchor_id.to_string();

    for segment in path.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let wanted = segment.to_lowercase();
        let children = store.get_children(&parent_id).await?;
        let existing = children
            .into_iter()
            .find(|child| child.is_folder() && child.title.to_lowercase() == wanted);

        parent_id = match existing {
            Some(folder) => folder.id,
            None => {
                let created = store
                    .create(CreateDetails::folder(&parent_id, segment))
                    .await?;
                tracing::debug!(folder_id = %created.id, title = %segment, "created folder");
                created.id
            }
        };
    }

    Ok(parent_id)
}

/// Moves a bookmark into the folder at `path` below `anchor_id`. An empty
/// path moves it to the top level of the anchor. Returns the target folder id.
pub async fn move_bookmark<S: BookmarkStore>(
    store: &S,
    bookmark_id: &str,
    anchor_id: &str,
    path: &[String],
) -> Result<String, AppError> {
    let folder_id = ensure_folder_path(store, anchor_id, path).await?;
    store.move_node(bookmark_id, &folder_id).await?;
    Ok(folder_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bookmark::BookmarkNode;
    use crate::services::bookmark_store::{JsonBookmarkStore, BOOKMARKS_BAR_ID};
    use crate::services::tree_service::{bookmark_path, find_node};

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    async fn folder_count(store: &JsonBookmarkStore) -> usize {
        fn count(nodes: &[BookmarkNode]) -> usize {
            nodes
                .iter()
                .map(|n| usize::from(n.is_folder()) + count(n.children()))
                .sum()
        }
        count(&store.get_tree().await.unwrap())
    }

    #[tokio::test]
    async fn second_materialization_reuses_folders() {
        let store = JsonBookmarkStore::in_memory();
        let before = folder_count(&store).await;

        let first = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["Work", "2024"]))
            .await
            .unwrap();
        let second = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["Work", "2024"]))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(folder_count(&store).await, before + 2);
    }

    #[tokio::test]
    async fn reuse_is_case_insensitive_and_keeps_original_casing() {
        let store = JsonBookmarkStore::in_memory();
        let first = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["Work", "2024"]))
            .await
            .unwrap();
        let second = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["WORK", "2024"]))
            .await
            .unwrap();
        assert_eq!(first, second);

        let bar = store.get_children(BOOKMARKS_BAR_ID).await.unwrap();
        assert_eq!(bar.len(), 1);
        assert_eq!(bar[0].title, "Work");
    }

    #[tokio::test]
    async fn bookmark_with_matching_title_is_not_reused_as_folder() {
        let store = JsonBookmarkStore::with_bookmarks_bar(vec![BookmarkNode::leaf(
            "10",
            "Work",
            "https://work.example",
        )]);
        let folder = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["work"]))
            .await
            .unwrap();
        assert_ne!(folder, "10");
        assert_eq!(store.get_children(BOOKMARKS_BAR_ID).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_segments_are_skipped() {
        let store = JsonBookmarkStore::in_memory();
        let folder = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["", "Reading", "  "]))
            .await
            .unwrap();
        let bar = store.get_children(BOOKMARKS_BAR_ID).await.unwrap();
        assert_eq!(bar.len(), 1);
        assert_eq!(bar[0].id, folder);
    }

    #[tokio::test]
    async fn move_places_bookmark_under_resolved_folder() {
        let store = JsonBookmarkStore::with_bookmarks_bar(vec![BookmarkNode::leaf(
            "10",
            "Rust",
            "https://rust-lang.org",
        )]);
        let folder = move_bookmark(&store, "10", BOOKMARKS_BAR_ID, &path(&["Dev", "Lang"]))
            .await
            .unwrap();
        assert_ne!(folder, BOOKMARKS_BAR_ID);

        let bar = store.get_children(BOOKMARKS_BAR_ID).await.unwrap();
        assert_eq!(bookmark_path(&bar, "10"), vec!["Dev", "Lang"]);
        let moved = find_node(&bar, "10").unwrap();
        assert_eq!(moved.title, "Rust");
        assert_eq!(moved.url.as_deref(), Some("https://rust-lang.org"));
    }

    #[tokio::test]
    async fn empty_path_moves_bookmark_to_top_level() {
        let store = JsonBookmarkStore::with_bookmarks_bar(vec![BookmarkNode::folder(
            "10",
            "Misc",
            vec![BookmarkNode::leaf("11", "Rust", "https://rust-lang.org")],
        )]);
        let folder = move_bookmark(&store, "11", BOOKMARKS_BAR_ID, &path(&["", " "]))
            .await
            .unwrap();
        assert_eq!(folder, BOOKMARKS_BAR_ID);

        let bar = store.get_children(BOOKMARKS_BAR_ID).await.unwrap();
        assert!(bookmark_path(&bar, "11").is_empty());
        assert_eq!(bar.len(), 2);
        assert!(bar[0].children().is_empty());
    }

    #[tokio::test]
    async fn folder_saved_without_children_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bookmarks.json");
        std::fs::write(
            &file,
            r#"{"id":"0","title":"","children":[
                {"id":"1","title":"Bookmarks bar","children":[
                    {"id":"5","title":"Work"},
                    {"id":"6","title":"X","url":"https://x.example"}
                ]},
                {"id":"2","title":"Other bookmarks","children":[]}
            ]}"#,
        )
        .unwrap();
        let store = JsonBookmarkStore::open(&file).unwrap();

        let folder = ensure_folder_path(&store, BOOKMARKS_BAR_ID, &path(&["work"]))
            .await
            .unwrap();
        assert_eq!(folder, "5");
        move_bookmark(&store, "6", BOOKMARKS_BAR_ID, &path(&["WORK"]))
            .await
            .unwrap();

        let bar = store.get_children(BOOKMARKS_BAR_ID).await.unwrap();
        assert_eq!(bar.len(), 1);
        assert_eq!(bar[0].title, "Work");
        assert_eq!(bookmark_path(&bar, "6"), vec!["Work"]);
    }
}
