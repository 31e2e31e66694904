pub mod bookmark_commands;
pub mod history_commands;
pub mod organize_commands;
pub mod organize_pipeline;
pub mod preset_commands;
pub mod settings_commands;
