use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub instructions: Vec<String>,
}

impl Preset {
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.name.trim().is_empty()
    }
}
