use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::preset::Preset;

const SELECTED_PRESET_KEY: &str = "selected_preset_id";

pub fn default_presets() -> Vec<Preset> {
    let preset = |id: &str, name: &str, instructions: &[&str]| Preset {
        id: id.to_string(),
        name: name.to_string(),
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        preset(
            "preset_default1",
            "Minimal Organization",
            &[
                "Use minimal and simple names for new folders",
                "Sort items into as few categories as possible",
                "Utilize subfolders where possible",
            ],
        ),
        preset(
            "preset_default2",
            "Stylized with Emojis",
            &[
                "Use relevant emojis at the start of each folder name",
                "Create descriptive category names",
                "Group similar items together",
                "Use subfolder hierarchy for better organization",
            ],
        ),
        preset(
            "preset_default3",
            "Simple Cleanup",
            &[
                "Maintain existing folder structure where possible",
                "Remove empty folders",
                "Combine similar categories",
                "Sort bookmarks alphabetically within folders",
            ],
        ),
    ]
}

/// Stored presets, replaced by (and persisted as) the defaults when the
/// table is empty or any row is unusable.
pub fn load_presets(conn: &Connection) -> Result<Vec<Preset>, AppError> {
    let stored = repository::list_presets(conn)?;
    if !stored.is_empty() && stored.iter().all(Preset::is_valid) {
        return Ok(stored);
    }

    if !stored.is_empty() {
        tracing::warn!(count = stored.len(), "stored presets are invalid, restoring defaults");
    }
    let defaults = default_presets();
    repository::replace_presets(conn, &defaults)?;
    repository::set_setting(conn, SELECTED_PRESET_KEY, &defaults[0].id)?;
    Ok(defaults)
}

pub fn selected_preset_id(conn: &Connection) -> Result<Option<String>, AppError> {
    repository::get_setting(conn, SELECTED_PRESET_KEY)
}

/// The selected preset, falling back to the first one when the stored
/// selection no longer exists.
pub fn selected_preset(conn: &Connection) -> Result<Option<Preset>, AppError> {
    let presets = load_presets(conn)?;
    let selected = selected_preset_id(conn)?;
    let found = selected
        .as_deref()
        .and_then(|id| presets.iter().find(|p| p.id == id));
    match found {
        Some(preset) => Ok(Some(preset.clone())),
        None => {
            let first = presets.into_iter().next();
            if let Some(preset) = &first {
                repository::set_setting(conn, SELECTED_PRESET_KEY, &preset.id)?;
            }
            Ok(first)
        }
    }
}

pub fn find_preset(conn: &Connection, id: &str) -> Result<Option<Preset>, AppError> {
    Ok(load_presets(conn)?.into_iter().find(|p| p.id == id))
}

pub fn select_preset(conn: &Connection, id: &str) -> Result<Preset, AppError> {
    let preset = find_preset(conn, id)?
        .ok_or_else(|| AppError::General(format!("Preset not found: {id}")))?;
    repository::set_setting(conn, SELECTED_PRESET_KEY, &preset.id)?;
    Ok(preset)
}

fn clean_instructions(instructions: Vec<String>) -> Vec<String> {
    instructions
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn add_preset(
    conn: &Connection,
    name: &str,
    instructions: Vec<String>,
) -> Result<Preset, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::General("Preset name is required".to_string()));
    }
    let mut presets = load_presets(conn)?;
    let preset = Preset {
        id: format!("preset_{}", uuid::Uuid::new_v4().simple()),
        name: name.trim().to_string(),
        instructions: clean_instructions(instructions),
    };
    presets.push(preset.clone());
    repository::replace_presets(conn, &presets)?;
    tracing::info!(id = %preset.id, name = %preset.name, "preset added");
    Ok(preset)
}

pub fn update_preset(
    conn: &Connection,
    id: &str,
    name: Option<&str>,
    instructions: Option<Vec<String>>,
) -> Result<Preset, AppError> {
    let mut presets = load_presets(conn)?;
    let preset = presets
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::General(format!("Preset not found: {id}")))?;

    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(AppError::General("Preset name is required".to_string()));
        }
        preset.name = name.trim().to_string();
    }
    if let Some(instructions) = instructions {
        preset.instructions = clean_instructions(instructions);
    }
    let updated = preset.clone();
    repository::replace_presets(conn, &presets)?;
    Ok(updated)
}

pub fn delete_preset(conn: &Connection, id: &str) -> Result<(), AppError> {
    let mut presets = load_presets(conn)?;
    let Some(pos) = presets.iter().position(|p| p.id == id) else {
        return Err(AppError::General(format!("Preset not found: {id}")));
    };
    if presets.len() == 1 {
        return Err(AppError::General(
            "Cannot delete the last preset".to_string(),
        ));
    }
    presets.remove(pos);
    repository::replace_presets(conn, &presets)?;

    if selected_preset_id(conn)?.as_deref() == Some(id) {
        repository::set_setting(conn, SELECTED_PRESET_KEY, &presets[0].id)?;
    }
    tracing::info!(id, "preset deleted");
    Ok(())
}
