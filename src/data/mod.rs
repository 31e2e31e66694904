pub mod migrations;
pub mod repository;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::AppError;

pub fn open_database(path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
