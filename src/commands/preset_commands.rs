use serde::Serialize;

use crate::error::AppError;
use crate::models::preset::Preset;
use crate::services::preset_service;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PresetListing {
    #[serde(flatten)]
    pub preset: Preset,
    pub selected: bool,
}

pub fn list_presets(state: &AppState) -> Result<Vec<PresetListing>, AppError> {
    let conn = state.lock_db()?;
    let selected = preset_service::selected_preset(&conn)?.map(|p| p.id);
    Ok(preset_service::load_presets(&conn)?
        .into_iter()
        .map(|preset| PresetListing {
            selected: selected.as_deref() == Some(preset.id.as_str()),
            preset,
        })
        .collect())
}

pub fn select_preset(state: &AppState, id: &str) -> Result<Preset, AppError> {
    let conn = state.lock_db()?;
    preset_service::select_preset(&conn, id)
}

pub fn add_preset(state: &AppState, name: &str, instructions: Vec<String>) -> Result<Preset, AppError> {
    let conn = state.lock_db()?;
    preset_service::add_preset(&conn, name, instructions)
}

pub fn update_preset(
    state: &AppState,
    id: &str,
    name: Option<&str>,
    instructions: Option<Vec<String>>,
) -> Result<Preset, AppError> {
    let conn = state.lock_db()?;
    preset_service::update_preset(&conn, id, name, instructions)
}

pub fn delete_preset(state: &AppState, id: &str) -> Result<(), AppError> {
    let conn = state.lock_db()?;
    preset_service::delete_preset(&conn, id)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::migrations::run_migrations;

    #[test]
    fn listing_marks_exactly_one_selected() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let state = AppState::new(conn, PathBuf::new());

        select_preset(&state, "preset_default2").unwrap();
        let listing = list_presets(&state).unwrap();
        assert_eq!(listing.len(), 3);
        let selected: Vec<&str> = listing
            .iter()
            .filter(|l| l.selected)
            .map(|l| l.preset.id.as_str())
            .collect();
        assert_eq!(selected, vec!["preset_default2"]);

        let json = serde_json::to_value(&listing[1]).unwrap();
        assert_eq!(json["name"], "Stylized with Emojis");
        assert_eq!(json["selected"], true);
    }
}
