use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::events::{AppEvent, EventSink};
use crate::models::bookmark::{CreateDetails, SimplifiedNode, Snapshot};
use crate::models::history::HistoryEntry;
use crate::services::bookmark_store::BookmarkStore;
use crate::state::{AppState, RunKind};

pub const HISTORY_CAP: usize = 10;

pub fn record_history<E: EventSink>(
    conn: &Connection,
    events: &E,
    before: Snapshot,
    after: Snapshot,
) -> Result<HistoryEntry, AppError> {
    let entry = HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        before,
        after,
    };
    repository::insert_history_entry(conn, &entry)?;
    let evicted = repository::truncate_history(conn, HISTORY_CAP)?;
    tracing::info!(id = %entry.id, evicted, "history entry recorded");
    events.emit(AppEvent::HistoryChanged);
    Ok(entry)
}

pub fn list(conn: &Connection) -> Result<Vec<HistoryEntry>, AppError> {
    repository::list_history(conn)
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<HistoryEntry>, AppError> {
    repository::get_history_entry(conn, id)
}

/// Replaces everything under `anchor_id` with the entry's `before` snapshot.
///
/// Destructive and non-transactional: a store failure stops the restore where
/// it is and is returned to the caller. Returns `None` when no entry has that id.
pub async fn undo<S: BookmarkStore, E: EventSink>(
    state: &AppState,
    store: &S,
    events: &E,
    entry_id: &str,
    anchor_id: &str,
) -> Result<Option<HistoryEntry>, AppError> {
    let _guard = state.try_begin(RunKind::Undo)?;

    let entry = {
        let conn = state.lock_db()?;
        get(&conn, entry_id)?
    };
    let Some(entry) = entry else {
        tracing::warn!(entry_id, "undo requested for unknown history entry");
        return Ok(None);
    };

    match restore(store, anchor_id, &entry.before).await {
        Ok(created) => {
            tracing::info!(entry_id, created, "history entry restored");
            events.emit(AppEvent::success("Changes undone successfully!"));
            events.emit(AppEvent::HistoryChanged);
            Ok(Some(entry))
        }
        Err(err) => {
            let err = err.capture();
            events.emit(AppEvent::error(format!("Error: {err}")));
            Err(err)
        }
    }
}

async fn restore<S: BookmarkStore>(
    store: &S,
    anchor_id: &str,
    snapshot: &[SimplifiedNode],
) -> Result<usize, AppError> {
    for child in store.get_children(anchor_id).await? {
        store.remove_tree(&child.id).await?;
    }

    // Depth-first with an explicit stack so snapshot depth never grows the
    // async call chain.
    let mut stack = vec![(anchor_id.to_string(), snapshot.iter())];
    let mut created = 0;
    while let Some((parent_id, pending)) = stack.last_mut() {
        let Some(node) = pending.next() else {
            stack.pop();
            continue;
        };
        let parent_id = parent_id.clone();

        match &node.url {
            Some(url) => {
                store
                    .create(CreateDetails::bookmark(&parent_id, &node.title, url))
                    .await?;
            }
            None => {
                let folder = store
                    .create(CreateDetails::folder(&parent_id, &node.title))
                    .await?;
                let children = node.children.as_deref().unwrap_or(&[]);
                stack.push((folder.id, children.iter()));
            }
        }
        created += 1;
    }
    Ok(created)
}
