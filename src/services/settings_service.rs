use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::data::repository;
use crate::error::AppError;
use crate::services::ai_service::{AiGateway, AiRequest, Provider};
use crate::state::AppState;

pub const SETTINGS_KEY: &str = "settings";
pub const CONNECTION_TEST_PROMPT: &str = "Hello! Please respond with a simple 'Hello back!'";

const MAX_TEMPERATURE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorPreset {
    Precise,
    Balanced,
    Creative,
    Custom,
}

impl BehaviorPreset {
    /// Temperature pinned by the preset; `None` for `Custom`.
    pub fn temperature(self) -> Option<f32> {
        match self {
            Self::Precise => Some(0.3),
            Self::Balanced => Some(0.6),
            Self::Creative => Some(0.9),
            Self::Custom => None,
        }
    }
}

impl std::fmt::Display for BehaviorPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precise => write!(f, "precise"),
            Self::Balanced => write!(f, "balanced"),
            Self::Creative => write!(f, "creative"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for BehaviorPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "precise" => Ok(Self::Precise),
            "balanced" => Ok(Self::Balanced),
            "creative" => Ok(Self::Creative),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("unknown behavior preset: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub preferred_api: Provider,
    pub openai_token: String,
    pub claude_token: String,
    pub openai_model: String,
    pub claude_model: String,
    pub behavior_preset: BehaviorPreset,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            preferred_api: Provider::OpenAi,
            openai_token: String::new(),
            claude_token: String::new(),
            openai_model: "gpt-4".to_string(),
            claude_model: "claude-3-opus-20240229".to_string(),
            behavior_preset: BehaviorPreset::Precise,
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

/// Everything the gateway needs besides the prompt, resolved from settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub provider: Provider,
    pub credential: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationParams {
    pub fn request(&self, prompt: String) -> AiRequest {
        AiRequest {
            prompt,
            credential: self.credential.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

impl AiSettings {
    pub fn effective_temperature(&self) -> f32 {
        self.behavior_preset
            .temperature()
            .unwrap_or(self.temperature)
            .clamp(0.0, MAX_TEMPERATURE)
    }

    /// Sets the preset and, unless it is `Custom`, the temperature it pins.
    pub fn apply_behavior_preset(&mut self, preset: BehaviorPreset) {
        self.behavior_preset = preset;
        if let Some(temperature) = preset.temperature() {
            self.temperature = temperature;
        }
    }

    /// An explicit temperature switches the preset to `Custom`.
    pub fn set_custom_temperature(&mut self, temperature: f32) {
        self.behavior_preset = BehaviorPreset::Custom;
        self.temperature = temperature.clamp(0.0, MAX_TEMPERATURE);
    }

    pub fn generation_params(&self) -> Result<GenerationParams, AppError> {
        let (credential, model) = match self.preferred_api {
            Provider::OpenAi => (&self.openai_token, &self.openai_model),
            Provider::Anthropic => (&self.claude_token, &self.claude_model),
        };
        if credential.trim().is_empty() {
            let message = match self.preferred_api {
                Provider::OpenAi => "OpenAI API token not configured",
                Provider::Anthropic => "Claude API token not configured",
            };
            return Err(AppError::Precondition(message.to_string()));
        }
        Ok(GenerationParams {
            provider: self.preferred_api,
            credential: credential.trim().to_string(),
            model: model.clone(),
            temperature: Some(self.effective_temperature()),
            max_output_tokens: (self.max_tokens > 0).then_some(self.max_tokens),
        })
    }

    /// Copy safe for display: tokens are masked.
    pub fn redacted(&self) -> Self {
        Self {
            openai_token: mask_token(&self.openai_token),
            claude_token: mask_token(&self.claude_token),
            ..self.clone()
        }
    }
}

pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    match chars.len() {
        0 => String::new(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}****{tail}")
        }
    }
}

pub fn load_settings(conn: &Connection) -> Result<Option<AiSettings>, AppError> {
    match repository::get_setting(conn, SETTINGS_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_settings(conn: &Connection, settings: &AiSettings) -> Result<(), AppError> {
    let raw = serde_json::to_string(settings)?;
    repository::set_setting(conn, SETTINGS_KEY, &raw)
}

/// Swaps candidate settings into the store for its lifetime and puts the
/// previous value back when dropped.
pub struct ScopedSettings<'a> {
    state: &'a AppState,
    original: Option<String>,
}

impl<'a> ScopedSettings<'a> {
    pub fn enter(state: &'a AppState, candidate: &AiSettings) -> Result<Self, AppError> {
        let conn = state.lock_db()?;
        let original = repository::get_setting(&conn, SETTINGS_KEY)?;
        save_settings(&conn, candidate)?;
        Ok(Self { state, original })
    }
}

impl Drop for ScopedSettings<'_> {
    fn drop(&mut self) {
        let restored = self.state.lock_db().and_then(|conn| match &self.original {
            Some(raw) => repository::set_setting(&conn, SETTINGS_KEY, raw),
            None => repository::delete_setting(&conn, SETTINGS_KEY).map(|_| ()),
        });
        if let Err(err) = restored {
            tracing::error!(error = %err, "failed to restore settings after scoped use");
        }
    }
}

/// Sends a fixed greeting with `candidate` settings and returns the reply.
/// Stored settings are left as they were whatever the outcome.
pub async fn test_connection<G: AiGateway>(
    state: &AppState,
    gateway: &G,
    candidate: &AiSettings,
) -> Result<String, AppError> {
    let params = candidate.generation_params()?;
    let _scope = ScopedSettings::enter(state, candidate)?;
    tracing::info!(provider = %params.provider, model = %params.model, "testing AI connection");
    gateway
        .complete(&params.request(CONNECTION_TEST_PROMPT.to_string()))
        .await
}
