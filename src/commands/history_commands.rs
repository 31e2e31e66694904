use serde::Serialize;

use crate::error::AppError;
use crate::events::EventSink;
use crate::models::bookmark::SimplifiedNode;
use crate::models::history::HistoryEntry;
use crate::services::bookmark_store::{BookmarkStore, BOOKMARKS_BAR_ID};
use crate::services::history_service;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: String,
    pub timestamp: String,
    pub bookmarks_before: usize,
    pub bookmarks_after: usize,
}

fn count_bookmarks(nodes: &[SimplifiedNode]) -> usize {
    nodes
        .iter()
        .map(|node| match &node.children {
            _ if node.url.is_some() => 1,
            Some(children) => count_bookmarks(children),
            None => 0,
        })
        .sum()
}

impl From<&HistoryEntry> for HistorySummary {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.timestamp.clone(),
            bookmarks_before: count_bookmarks(&entry.before),
            bookmarks_after: count_bookmarks(&entry.after),
        }
    }
}

/// Newest first.
pub fn list_history(state: &AppState) -> Result<Vec<HistorySummary>, AppError> {
    let conn = state.lock_db()?;
    Ok(history_service::list(&conn)?
        .iter()
        .map(HistorySummary::from)
        .collect())
}

pub fn get_history_entry(state: &AppState, id: &str) -> Result<Option<HistoryEntry>, AppError> {
    let conn = state.lock_db()?;
    history_service::get(&conn, id)
}

pub async fn undo_history<S: BookmarkStore, E: EventSink>(
    state: &AppState,
    store: &S,
    events: &E,
    id: &str,
) -> Result<Option<HistoryEntry>, AppError> {
    history_service::undo(state, store, events, id, BOOKMARKS_BAR_ID).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_nested_bookmarks() {
        let leaf = |title: &str| SimplifiedNode {
            title: title.to_string(),
            url: Some(format!("https://{title}.example")),
            children: None,
        };
        let entry = HistoryEntry {
            id: "h1".into(),
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            before: vec![
                leaf("a"),
                SimplifiedNode {
                    title: "Folder".into(),
                    url: None,
                    children: Some(vec![leaf("b"), leaf("c")]),
                },
            ],
            after: vec![],
        };
        let summary = HistorySummary::from(&entry);
        assert_eq!(summary.bookmarks_before, 3);
        assert_eq!(summary.bookmarks_after, 0);
    }
}
