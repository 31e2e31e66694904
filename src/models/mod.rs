pub mod bookmark;
pub mod history;
pub mod preset;
pub mod suggestion;
