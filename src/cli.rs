use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;

use crate::commands::settings_commands::SettingsUpdate;
use crate::commands::{
    bookmark_commands, history_commands, organize_commands, preset_commands, settings_commands,
};
use crate::data;
use crate::progress::{ProgressBarSink, StatusPrinter};
use crate::services::ai_service::Provider;
use crate::services::bookmark_store::JsonBookmarkStore;
use crate::services::settings_service::BehaviorPreset;
use crate::state::AppState;

const DB_FILE_NAME: &str = "shelfmark.db";
const BOOKMARKS_FILE_NAME: &str = "bookmarks.json";

#[derive(Debug, Parser)]
#[command(
    name = "shelfmark",
    about = "Reorganize a bookmark collection with an AI model, with undoable history",
    version
)]
pub struct Cli {
    /// Enable debug logging (overridden by SHELFMARK_LOG).
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// SQLite file holding settings, presets and history.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// JSON bookmark store to operate on.
    #[arg(long, global = true)]
    pub bookmarks: Option<PathBuf>,
    /// Base URL for the AI provider, e.g. a local proxy.
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ask the AI where every bookmark belongs and move it there.
    Organize {
        /// Preset id to use instead of the selected one.
        #[arg(long)]
        preset: Option<String>,
    },
    /// Inspect past organization runs.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Restore the bookmarks bar to the state before a run.
    Undo {
        /// History entry id.
        id: String,
    },
    /// Manage organization presets.
    #[command(subcommand)]
    Preset(PresetCommand),
    /// Show, change or test AI settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Print the folder summary of the bookmarks bar.
    Tree,
    /// Export all bookmarks as JSON.
    Export {
        /// Output file (defaults to bookmarks_export_<date>.json).
        path: Option<PathBuf>,
    },
    /// Import bookmarks from an exported JSON file.
    Import { path: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List entries, newest first.
    List,
    /// Print an entry's before/after snapshots as JSON.
    Show { id: String },
}

#[derive(Debug, Subcommand)]
pub enum PresetCommand {
    List,
    Select {
        id: String,
    },
    Add {
        name: String,
        /// One instruction per flag, in order.
        #[arg(long = "instruction", short = 'i')]
        instructions: Vec<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Replaces the whole instruction list.
        #[arg(long = "instruction", short = 'i')]
        instructions: Vec<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print settings with tokens masked.
    Show,
    /// Change and save settings.
    Set(SettingsArgs),
    /// Send a greeting to the provider without saving anything.
    Test(SettingsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// openai or claude.
    #[arg(long)]
    pub provider: Option<Provider>,
    #[arg(long)]
    pub openai_token: Option<String>,
    #[arg(long)]
    pub claude_token: Option<String>,
    #[arg(long)]
    pub openai_model: Option<String>,
    #[arg(long)]
    pub claude_model: Option<String>,
    /// precise, balanced, creative or custom.
    #[arg(long)]
    pub behavior: Option<BehaviorPreset>,
    /// Explicit temperature; switches the behavior to custom.
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl From<SettingsArgs> for SettingsUpdate {
    fn from(args: SettingsArgs) -> Self {
        Self {
            preferred_api: args.provider,
            openai_token: args.openai_token,
            claude_token: args.claude_token,
            openai_model: args.openai_model,
            claude_model: args.claude_model,
            behavior_preset: args.behavior,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
        }
    }
}

fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "shelfmark", "shelfmark")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("could not resolve a data directory; pass --db and --bookmarks")
}

fn resolve_paths(cli: &Cli) -> Result<(PathBuf, PathBuf)> {
    let db = match &cli.db {
        Some(path) => path.clone(),
        None => default_data_dir()?.join(DB_FILE_NAME),
    };
    let bookmarks = match &cli.bookmarks {
        Some(path) => path.clone(),
        None => default_data_dir()?.join(BOOKMARKS_FILE_NAME),
    };
    Ok((db, bookmarks))
}

pub async fn execute(cli: Cli) -> Result<()> {
    let (db_path, bookmarks_path) = resolve_paths(&cli)?;
    let conn = data::open_database(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    let state = AppState::new(conn, db_path);
    let store = JsonBookmarkStore::open(&bookmarks_path)
        .with_context(|| format!("opening bookmarks {}", bookmarks_path.display()))?;
    tracing::debug!(db = %state.db_path.display(), bookmarks = %bookmarks_path.display(), "opened workspace");

    let api_base_url = cli.api_base_url.as_deref();

    match cli.command {
        Commands::Organize { preset } => {
            let sink = ProgressBarSink::new();
            let report =
                organize_commands::organize_bookmarks(&state, &store, &sink, preset, api_base_url)
                    .await
                    .context("organization did not complete")?;
            println!(
                "moved {}, kept {}, style updates {}, failed {} (history {})",
                report.moved, report.kept, report.style_updates, report.failed, report.history_id
            );
        }
        Commands::History(HistoryCommand::List) => {
            let entries = history_commands::list_history(&state)?;
            if entries.is_empty() {
                println!("No history yet.");
            }
            for entry in entries {
                println!(
                    "{}  {}  {} -> {} bookmarks",
                    entry.id, entry.timestamp, entry.bookmarks_before, entry.bookmarks_after
                );
            }
        }
        Commands::History(HistoryCommand::Show { id }) => {
            match history_commands::get_history_entry(&state, &id)? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => bail!("no history entry {id}"),
            }
        }
        Commands::Undo { id } => {
            let restored = history_commands::undo_history(&state, &store, &StatusPrinter, &id)
                .await
                .context("undo did not complete; the bookmarks bar may be partially restored")?;
            if restored.is_none() {
                println!("No history entry {id}; nothing changed.");
            }
        }
        Commands::Preset(command) => run_preset_command(&state, command)?,
        Commands::Settings(SettingsCommand::Show) => {
            let (settings, saved) = settings_commands::get_settings(&state)?;
            if !saved {
                println!("# not configured yet, showing defaults");
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Commands::Settings(SettingsCommand::Set(args)) => {
            let update = SettingsUpdate::from(args);
            if update.is_empty() {
                bail!("nothing to change; see `shelfmark settings set --help`");
            }
            let settings = settings_commands::update_settings(&state, &update)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Commands::Settings(SettingsCommand::Test(args)) => {
            let reply =
                settings_commands::test_connection(&state, &SettingsUpdate::from(args), api_base_url)
                    .await?;
            println!("Connection OK: {}", reply.trim());
        }
        Commands::Tree => {
            let overview = bookmark_commands::tree_overview(&store).await?;
            for folder in &overview.folders {
                println!(
                    "{}  ({} bookmarks, {} folders)",
                    folder.path, folder.bookmark_count, folder.folder_count
                );
            }
            println!("{} bookmarks in total", overview.bookmark_count);
        }
        Commands::Export { path } => {
            let written = bookmark_commands::export_bookmarks(&store, path.as_deref()).await?;
            println!("Bookmarks exported to {}", written.display());
        }
        Commands::Import { path } => {
            let report = bookmark_commands::import_bookmarks(&store, &path).await?;
            println!(
                "Imported {} bookmarks and {} folders into {}",
                report.bookmarks,
                report.folders,
                report.targets.join(", ")
            );
        }
    }
    Ok(())
}

fn run_preset_command(state: &AppState, command: PresetCommand) -> Result<()> {
    match command {
        PresetCommand::List => {
            for listing in preset_commands::list_presets(state)? {
                let marker = if listing.selected { "*" } else { " " };
                println!("{marker} {}  {}", listing.preset.id, listing.preset.name);
                for instruction in &listing.preset.instructions {
                    println!("      - {instruction}");
                }
            }
        }
        PresetCommand::Select { id } => {
            let preset = preset_commands::select_preset(state, &id)?;
            println!("Selected {}", preset.name);
        }
        PresetCommand::Add { name, instructions } => {
            let preset = preset_commands::add_preset(state, &name, instructions)?;
            println!("Added {} ({})", preset.name, preset.id);
        }
        PresetCommand::Update {
            id,
            name,
            instructions,
        } => {
            let instructions = (!instructions.is_empty()).then_some(instructions);
            let preset = preset_commands::update_preset(state, &id, name.as_deref(), instructions)?;
            println!("Updated {}", preset.name);
        }
        PresetCommand::Delete { id } => {
            preset_commands::delete_preset(state, &id)?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
