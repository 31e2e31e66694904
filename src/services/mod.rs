pub mod ai_service;
pub mod bookmark_store;
pub mod history_service;
pub mod import_export_service;
pub mod placement_service;
pub mod preset_service;
pub mod settings_service;
pub mod suggestion_service;
pub mod tree_service;
