use serde::Serialize;

use crate::state::OrganizeProgressState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum AppEvent {
    OrganizeProgress(OrganizeProgressState),
    Status { message: String, level: StatusLevel },
    HistoryChanged,
}

impl AppEvent {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            level: StatusLevel::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            level: StatusLevel::Error,
        }
    }
}

/// Receiver for progress, status and history-refresh notifications.
pub trait EventSink {
    fn emit(&self, event: AppEvent);
}

pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: AppEvent) {}
}
