use crate::commands::organize_pipeline::{run_organize, OrganizeOptions, OrganizeReport, PipelineCtx};
use crate::error::AppError;
use crate::events::EventSink;
use crate::services::ai_service::{AiConnector, Provider};
use crate::services::bookmark_store::{BookmarkStore, BOOKMARKS_BAR_ID};
use crate::services::settings_service;
use crate::state::AppState;

/// Runs the reorganization against the configured provider's HTTP backend.
pub async fn organize_bookmarks<S: BookmarkStore, E: EventSink>(
    state: &AppState,
    store: &S,
    events: &E,
    preset_id: Option<String>,
    api_base_url: Option<&str>,
) -> Result<OrganizeReport, AppError> {
    // Missing settings are reported by the pipeline itself.
    let provider = {
        let conn = state.lock_db()?;
        settings_service::load_settings(&conn)?
            .map(|settings| settings.preferred_api)
            .unwrap_or(Provider::OpenAi)
    };
    let mut gateway = AiConnector::new(provider);
    if let Some(base_url) = api_base_url {
        gateway = gateway.with_base_url(base_url);
    }

    let ctx = PipelineCtx {
        state,
        store,
        gateway: &gateway,
        events,
        anchor_id: BOOKMARKS_BAR_ID,
    };
    run_organize(&ctx, &OrganizeOptions { preset_id }).await
}
