use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::models::history::HistoryEntry;
use crate::models::preset::Preset;

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        params![key, value],
    )?;
    Ok(())
}

pub fn delete_setting(conn: &Connection, key: &str) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

struct PresetRow {
    id: String,
    name: String,
    instructions: String,
}

/// Presets in their stored order. Rows whose instruction list fails to decode
/// come back with an empty name so callers can treat the set as invalid.
pub fn list_presets(conn: &Connection) -> Result<Vec<Preset>, AppError> {
    let mut stmt =
        conn.prepare("SELECT id, name, instructions FROM presets ORDER BY position ASC, id ASC")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PresetRow {
                id: row.get(0)?,
                name: row.get(1)?,
                instructions: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|row| match serde_json::from_str::<Vec<String>>(&row.instructions) {
            Ok(instructions) => Preset {
                id: row.id,
                name: row.name,
                instructions,
            },
            Err(_) => Preset {
                id: row.id,
                name: String::new(),
                instructions: Vec::new(),
            },
        })
        .collect())
}

pub fn replace_presets(conn: &Connection, presets: &[Preset]) -> Result<(), AppError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM presets", [])?;
    for (position, preset) in presets.iter().enumerate() {
        let instructions = serde_json::to_string(&preset.instructions)?;
        tx.execute(
            "INSERT INTO presets (id, name, instructions, position) VALUES (?1, ?2, ?3, ?4)",
            params![preset.id, preset.name, instructions, position as i64],
        )?;
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

struct HistoryRow {
    id: String,
    created_at: String,
    before_json: String,
    after_json: String,
}

impl HistoryRow {
    fn into_entry(self) -> Result<HistoryEntry, AppError> {
        Ok(HistoryEntry {
            id: self.id,
            timestamp: self.created_at,
            before: serde_json::from_str(&self.before_json)?,
            after: serde_json::from_str(&self.after_json)?,
        })
    }
}

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        before_json: row.get(2)?,
        after_json: row.get(3)?,
    })
}

pub fn insert_history_entry(conn: &Connection, entry: &HistoryEntry) -> Result<i64, AppError> {
    let before_json = serde_json::to_string(&entry.before)?;
    let after_json = serde_json::to_string(&entry.after)?;
    conn.execute(
        "INSERT INTO history_entries (id, created_at, before_json, after_json)
         VALUES (?1, ?2, ?3, ?4)",
        params![entry.id, entry.timestamp, before_json, after_json],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest first.
pub fn list_history(conn: &Connection) -> Result<Vec<HistoryEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, before_json, after_json
         FROM history_entries ORDER BY seq DESC",
    )?;
    let rows = stmt
        .query_map([], map_history_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(HistoryRow::into_entry).collect()
}

pub fn get_history_entry(conn: &Connection, id: &str) -> Result<Option<HistoryEntry>, AppError> {
    let row = conn
        .query_row(
            "SELECT id, created_at, before_json, after_json
             FROM history_entries WHERE id = ?1",
            params![id],
            map_history_row,
        )
        .optional()?;
    row.map(HistoryRow::into_entry).transpose()
}

/// Drops everything but the `keep` most recent entries. Returns the number evicted.
pub fn truncate_history(conn: &Connection, keep: usize) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM history_entries WHERE seq NOT IN (
             SELECT seq FROM history_entries ORDER BY seq DESC LIMIT ?1
         )",
        params![keep as i64],
    )?;
    Ok(count)
}

// Needed for rusqlite optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
