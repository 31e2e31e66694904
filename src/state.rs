use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizeProgressPhase {
    Idle,
    CapturingBefore,
    Processing,
    CapturingAfter,
    Recording,
    Done,
    Failed,
}

impl OrganizeProgressPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeProgressState {
    pub phase: OrganizeProgressPhase,
    pub processed: usize,
    pub attempted: usize,
    pub total: usize,
    pub percent: usize,
    pub message: String,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Organize,
    Undo,
}

impl RunKind {
    fn label(self) -> &'static str {
        match self {
            Self::Organize => "organization",
            Self::Undo => "undo",
        }
    }
}

pub struct AppState {
    pub db: Mutex<rusqlite::Connection>,
    pub db_path: PathBuf,
    organize_running: AtomicBool,
    undo_running: AtomicBool,
    organize_status: Mutex<Option<OrganizeProgressState>>,
    organize_progress_sequence: AtomicU64,
}

/// Held for the duration of a run; releases the single-flight flag on drop.
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl AppState {
    pub fn new(conn: rusqlite::Connection, db_path: PathBuf) -> Self {
        Self {
            db: Mutex::new(conn),
            db_path,
            organize_running: AtomicBool::new(false),
            undo_running: AtomicBool::new(false),
            organize_status: Mutex::new(None),
            organize_progress_sequence: AtomicU64::new(0),
        }
    }

    pub fn lock_db(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, AppError> {
        self.db
            .lock()
            .map_err(|e| AppError::General(e.to_string()))
    }

    pub fn try_begin(&self, kind: RunKind) -> Result<RunGuard<'_>, AppError> {
        let flag = match kind {
            RunKind::Organize => &self.organize_running,
            RunKind::Undo => &self.undo_running,
        };
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::Busy(format!("{} already in progress", kind.label())))?;
        Ok(RunGuard { flag })
    }

    pub fn is_running(&self, kind: RunKind) -> bool {
        match kind {
            RunKind::Organize => self.organize_running.load(Ordering::Acquire),
            RunKind::Undo => self.undo_running.load(Ordering::Acquire),
        }
    }

    pub fn next_organize_progress_sequence(&self) -> u64 {
        self.organize_progress_sequence
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    pub fn get_organize_status(&self) -> Option<OrganizeProgressState> {
        self.organize_status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_organize_status(&self, status: OrganizeProgressState) {
        let mut guard = self
            .organize_status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(status);
    }

    pub fn clear_organize_status(&self) {
        let mut guard = self
            .organize_status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState::new(
            rusqlite::Connection::open_in_memory().unwrap(),
            PathBuf::new(),
        )
    }

    #[test]
    fn second_run_of_same_kind_is_rejected() {
        let state = test_state();
        let guard = state.try_begin(RunKind::Organize).unwrap();

        let err = state.try_begin(RunKind::Organize).err().unwrap();
        assert!(matches!(err, AppError::Busy(_)));
        assert!(state.is_running(RunKind::Organize));

        drop(guard);
        assert!(!state.is_running(RunKind::Organize));
        assert!(state.try_begin(RunKind::Organize).is_ok());
    }

    #[test]
    fn guards_are_per_run_kind() {
        let state = test_state();
        let _organize = state.try_begin(RunKind::Organize).unwrap();
        assert!(state.try_begin(RunKind::Undo).is_ok());
    }

    #[test]
    fn progress_sequence_increases() {
        let state = test_state();
        let a = state.next_organize_progress_sequence();
        let b = state.next_organize_progress_sequence();
        assert!(b > a);
    }
}
