use indicatif::{ProgressBar, ProgressStyle};

use crate::events::{AppEvent, EventSink, StatusLevel};
use crate::state::OrganizeProgressPhase;

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {prefix:.bold}▕{bar:.blue}▏{percent}% {wide_msg}";

fn phase_label(phase: OrganizeProgressPhase) -> &'static str {
    match phase {
        OrganizeProgressPhase::Idle => "idle",
        OrganizeProgressPhase::CapturingBefore => "snapshot",
        OrganizeProgressPhase::Processing => "organize",
        OrganizeProgressPhase::CapturingAfter => "snapshot",
        OrganizeProgressPhase::Recording => "history",
        OrganizeProgressPhase::Done => "done",
        OrganizeProgressPhase::Failed => "failed",
    }
}

/// Terminal renderer for run events.
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(PROGRESS_TEMPLATE)
                .map(|style| style.progress_chars("█▓▒░  "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressBarSink {
    fn emit(&self, event: AppEvent) {
        match event {
            AppEvent::OrganizeProgress(progress) => {
                self.bar.set_length(progress.total as u64);
                self.bar.set_position(progress.attempted as u64);
                self.bar.set_prefix(phase_label(progress.phase));
                if progress.phase.is_terminal() {
                    self.bar.finish_with_message(progress.message);
                } else {
                    self.bar.set_message(progress.message);
                }
            }
            AppEvent::Status { message, level } => {
                self.bar.suspend(|| match level {
                    StatusLevel::Success => println!("{message}"),
                    StatusLevel::Error => eprintln!("{message}"),
                });
            }
            AppEvent::HistoryChanged => tracing::debug!("history updated"),
        }
    }
}

/// Prints status lines only; used by commands without a progress bar.
pub struct StatusPrinter;

impl EventSink for StatusPrinter {
    fn emit(&self, event: AppEvent) {
        match event {
            AppEvent::Status {
                message,
                level: StatusLevel::Success,
            } => println!("{message}"),
            AppEvent::Status {
                message,
                level: StatusLevel::Error,
            } => eprintln!("{message}"),
            AppEvent::OrganizeProgress(_) | AppEvent::HistoryChanged => {}
        }
    }
}
