use serde::Deserialize;

use crate::error::AppError;
use crate::services::ai_service::{AiConnector, Provider};
use crate::services::settings_service::{self, AiSettings, BehaviorPreset};
use crate::state::AppState;

/// Partial settings change; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub preferred_api: Option<Provider>,
    pub openai_token: Option<String>,
    pub claude_token: Option<String>,
    pub openai_model: Option<String>,
    pub claude_model: Option<String>,
    pub behavior_preset: Option<BehaviorPreset>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.preferred_api.is_none()
            && self.openai_token.is_none()
            && self.claude_token.is_none()
            && self.openai_model.is_none()
            && self.claude_model.is_none()
            && self.behavior_preset.is_none()
            && self.temperature.is_none()
            && self.max_tokens.is_none()
    }

    pub fn apply_to(&self, settings: &mut AiSettings) {
        if let Some(provider) = self.preferred_api {
            settings.preferred_api = provider;
        }
        if let Some(token) = &self.openai_token {
            settings.openai_token = token.trim().to_string();
        }
        if let Some(token) = &self.claude_token {
            settings.claude_token = token.trim().to_string();
        }
        if let Some(model) = &self.openai_model {
            settings.openai_model = model.clone();
        }
        if let Some(model) = &self.claude_model {
            settings.claude_model = model.clone();
        }
        if let Some(preset) = self.behavior_preset {
            settings.apply_behavior_preset(preset);
        }
        // Applied last so an explicit value wins over the preset's.
        if let Some(temperature) = self.temperature {
            settings.set_custom_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = max_tokens;
        }
    }
}

/// Stored settings with tokens masked, or the defaults when nothing is saved.
pub fn get_settings(state: &AppState) -> Result<(AiSettings, bool), AppError> {
    let conn = state.lock_db()?;
    Ok(match settings_service::load_settings(&conn)? {
        Some(settings) => (settings.redacted(), true),
        None => (AiSettings::default(), false),
    })
}

pub fn update_settings(state: &AppState, update: &SettingsUpdate) -> Result<AiSettings, AppError> {
    let conn = state.lock_db()?;
    let mut settings = settings_service::load_settings(&conn)?.unwrap_or_default();
    update.apply_to(&mut settings);
    settings_service::save_settings(&conn, &settings)?;
    tracing::info!(provider = %settings.preferred_api, "settings saved");
    Ok(settings.redacted())
}

/// Tests the stored settings with `overrides` applied, without saving them.
pub async fn test_connection(
    state: &AppState,
    overrides: &SettingsUpdate,
    api_base_url: Option<&str>,
) -> Result<String, AppError> {
    let mut candidate = {
        let conn = state.lock_db()?;
        settings_service::load_settings(&conn)?.unwrap_or_default()
    };
    overrides.apply_to(&mut candidate);

    let mut connector = AiConnector::new(candidate.preferred_api);
    if let Some(base_url) = api_base_url {
        connector = connector.with_base_url(base_url);
    }
    settings_service::test_connection(state, &connector, &candidate).await
}
