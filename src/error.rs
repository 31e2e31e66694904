use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    General(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Bookmark store error: {0}")]
    Store(String),

    #[error("{0}")]
    Gateway(String),

    #[error("{0}")]
    Busy(String),
}

impl AppError {
    pub fn capture(self) -> Self {
        tracing::error!(error = %self, "operation failed");
        self
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Store("node not found: 42".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Bookmark store error: node not found: 42\"");
    }

    #[test]
    fn precondition_is_detected() {
        assert!(AppError::Precondition("no preset".into()).is_precondition());
        assert!(!AppError::General("x".into()).is_precondition());
    }
}
