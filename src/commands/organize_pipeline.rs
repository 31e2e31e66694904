use std::collections::VecDeque;

use serde::Serialize;

use crate::error::AppError;
use crate::events::{AppEvent, EventSink};
use crate::models::bookmark::{BookmarkNode, FolderSummaryEntry};
use crate::models::preset::Preset;
use crate::models::suggestion::RecommendedAction;
use crate::services::ai_service::AiGateway;
use crate::services::bookmark_store::BookmarkStore;
use crate::services::settings_service::{self, GenerationParams};
use crate::services::tree_service::{
    bookmark_path, collect_bookmarks, flat_folder_structure, simplify_structure,
};
use crate::services::{history_service, placement_service, preset_service, suggestion_service};
use crate::state::{AppState, OrganizeProgressPhase, OrganizeProgressState, RunKind};

pub const CONNECTOR_NOT_CONFIGURED: &str =
    "API connector not configured. Please set up API settings first.";
pub const PRESET_NOT_FOUND: &str = "Selected preset not found";

// ---------------------------------------------------------------------------
// Pipeline context
// ---------------------------------------------------------------------------

pub struct PipelineCtx<'a, S, G, E> {
    pub state: &'a AppState,
    pub store: &'a S,
    pub gateway: &'a G,
    pub events: &'a E,
    /// Folder whose contents are reorganized; suggested paths start here.
    pub anchor_id: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizeOptions {
    /// Overrides the stored preset selection for this run.
    pub preset_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeReport {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub moved: usize,
    pub kept: usize,
    pub style_updates: usize,
    pub history_id: String,
}

struct RunInputs {
    params: GenerationParams,
    preset: Preset,
}

/// Leaf bookmarks waiting to be organized, handed out one at a time.
pub struct BookmarkQueue {
    pending: VecDeque<BookmarkNode>,
}

impl BookmarkQueue {
    pub fn from_forest(nodes: &[BookmarkNode]) -> Self {
        Self {
            pending: collect_bookmarks(nodes).into(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Iterator for BookmarkQueue {
    type Item = BookmarkNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Progress helpers
// ---------------------------------------------------------------------------

fn phase_percent(processed: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    ((processed as f64 / total as f64) * 100.0)
        .round()
        .clamp(0.0, 100.0) as usize
}

/// Stores the new progress snapshot on `state`. Returns `None` once the run
/// has reached a terminal phase.
pub fn record_organize_progress(
    state: &AppState,
    phase: OrganizeProgressPhase,
    processed: usize,
    attempted: usize,
    total: usize,
    message: String,
) -> Option<OrganizeProgressState> {
    if state
        .get_organize_status()
        .is_some_and(|progress| progress.phase.is_terminal())
    {
        return None;
    }

    let percent = match phase {
        OrganizeProgressPhase::Done => 100,
        _ => phase_percent(processed, total),
    };
    let payload = OrganizeProgressState {
        phase,
        processed,
        attempted,
        total,
        percent,
        message,
        sequence: state.next_organize_progress_sequence(),
    };
    state.set_organize_status(payload.clone());
    Some(payload)
}

fn emit_progress<S, G, E: EventSink>(
    ctx: &PipelineCtx<'_, S, G, E>,
    phase: OrganizeProgressPhase,
    processed: usize,
    attempted: usize,
    total: usize,
    message: impl Into<String>,
) {
    if let Some(payload) =
        record_organize_progress(ctx.state, phase, processed, attempted, total, message.into())
    {
        ctx.events.emit(AppEvent::OrganizeProgress(payload));
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

fn load_run_inputs(state: &AppState, options: &OrganizeOptions) -> Result<RunInputs, AppError> {
    let conn = state.lock_db()?;
    let settings = settings_service::load_settings(&conn)?
        .ok_or_else(|| AppError::Precondition(CONNECTOR_NOT_CONFIGURED.to_string()))?;
    let preset = match &options.preset_id {
        Some(id) => preset_service::find_preset(&conn, id)?,
        None => preset_service::selected_preset(&conn)?,
    }
    .ok_or_else(|| AppError::Precondition(PRESET_NOT_FOUND.to_string()))?;
    let params = settings.generation_params()?;
    Ok(RunInputs { params, preset })
}

/// Reorganizes every bookmark under the anchor folder, one at a time, and
/// records a before/after history entry.
///
/// Only precondition and store-wide failures end the run with an error;
/// a bookmark whose suggestion or move fails is logged and skipped.
pub async fn run_organize<S, G, E>(
    ctx: &PipelineCtx<'_, S, G, E>,
    options: &OrganizeOptions,
) -> Result<OrganizeReport, AppError>
where
    S: BookmarkStore,
    G: AiGateway,
    E: EventSink,
{
    let _guard = match ctx.state.try_begin(RunKind::Organize) {
        Ok(guard) => guard,
        Err(err) => {
            ctx.events.emit(AppEvent::error(format!("Error: {err}")));
            return Err(err);
        }
    };
    ctx.state.clear_organize_status();

    let result = match load_run_inputs(ctx.state, options) {
        Ok(inputs) => run_pipeline(ctx, &inputs).await,
        Err(err) => Err(err),
    };

    result.map_err(|err| {
        let err = err.capture();
        emit_progress(ctx, OrganizeProgressPhase::Failed, 0, 0, 0, err.to_string());
        ctx.events.emit(AppEvent::error(format!("Error: {err}")));
        err
    })
}

async fn run_pipeline<S, G, E>(
    ctx: &PipelineCtx<'_, S, G, E>,
    inputs: &RunInputs,
) -> Result<OrganizeReport, AppError>
where
    S: BookmarkStore,
    G: AiGateway,
    E: EventSink,
{
    tracing::info!(preset = %inputs.preset.name, model = %inputs.params.model, "starting organization");
    emit_progress(
        ctx,
        OrganizeProgressPhase::CapturingBefore,
        0,
        0,
        0,
        "Capturing current bookmark structure...",
    );
    let anchor_children = ctx.store.get_children(ctx.anchor_id).await?;
    let before = simplify_structure(&anchor_children);
    let summary = flat_folder_structure(&anchor_children);
    let queue = BookmarkQueue::from_forest(&anchor_children);
    drop(anchor_children);

    let total = queue.len();
    let mut report = OrganizeReport {
        total,
        ..OrganizeReport::default()
    };
    let mut attempted = 0;
    emit_progress(
        ctx,
        OrganizeProgressPhase::Processing,
        0,
        0,
        total,
        format!("Organizing {total} bookmarks..."),
    );

    for bookmark in queue {
        attempted += 1;
        match organize_one(ctx, inputs, &summary, &bookmark).await {
            Ok(action) => {
                report.processed += 1;
                match action {
                    RecommendedAction::Move => report.moved += 1,
                    RecommendedAction::Keep => report.kept += 1,
                    RecommendedAction::StyleUpdate => report.style_updates += 1,
                }
            }
            Err(err) => {
                report.failed += 1;
                tracing::error!(
                    bookmark_id = %bookmark.id,
                    title = %bookmark.title,
                    error = %err,
                    "failed to organize bookmark, skipping"
                );
            }
        }
        emit_progress(
            ctx,
            OrganizeProgressPhase::Processing,
            report.processed,
            attempted,
            total,
            format!("Processed {attempted} of {total} bookmarks"),
        );
    }

    emit_progress(
        ctx,
        OrganizeProgressPhase::CapturingAfter,
        report.processed,
        attempted,
        total,
        "Capturing new bookmark structure...",
    );
    let after = simplify_structure(&ctx.store.get_children(ctx.anchor_id).await?);

    emit_progress(
        ctx,
        OrganizeProgressPhase::Recording,
        report.processed,
        attempted,
        total,
        "Saving history...",
    );
    let entry = {
        let conn = ctx.state.lock_db()?;
        history_service::record_history(&conn, ctx.events, before, after)?
    };
    report.history_id = entry.id;

    let message = format!(
        "Organization complete! Processed {} bookmarks.",
        report.processed
    );
    emit_progress(
        ctx,
        OrganizeProgressPhase::Done,
        report.processed,
        attempted,
        total,
        message.clone(),
    );
    ctx.events.emit(AppEvent::success(message));
    tracing::info!(
        total = report.total,
        processed = report.processed,
        failed = report.failed,
        moved = report.moved,
        "organization finished"
    );
    Ok(report)
}

async fn organize_one<S, G, E>(
    ctx: &PipelineCtx<'_, S, G, E>,
    inputs: &RunInputs,
    summary: &[FolderSummaryEntry],
    bookmark: &BookmarkNode,
) -> Result<RecommendedAction, AppError>
where
    S: BookmarkStore,
    G: AiGateway,
{
    // Earlier moves in this run may have created folders, so resolve the
    // path against the live tree.
    let live = ctx.store.get_children(ctx.anchor_id).await?;
    let current_path = bookmark_path(&live, &bookmark.id);

    let suggestion = suggestion_service::request_suggestion(
        ctx.gateway,
        &inputs.params,
        bookmark,
        &current_path,
        summary,
        &inputs.preset,
    )
    .await?;

    match suggestion.recommended_action {
        RecommendedAction::Move => {
            placement_service::move_bookmark(
                ctx.store,
                &bookmark.id,
                ctx.anchor_id,
                &suggestion.suggested_path,
            )
            .await?;
            tracing::info!(
                bookmark_id = %bookmark.id,
                to = ?suggestion.suggested_path,
                "moved bookmark"
            );
        }
        RecommendedAction::Keep => {
            tracing::debug!(bookmark_id = %bookmark.id, "keeping bookmark in place");
        }
        RecommendedAction::StyleUpdate => {
            tracing::debug!(bookmark_id = %bookmark.id, "style update suggested, no structural change");
        }
    }
    Ok(suggestion.recommended_action)
}
