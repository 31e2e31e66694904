use serde::{Deserialize, Serialize};

use crate::models::bookmark::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: String,
    pub before: Snapshot,
    pub after: Snapshot,
}
