mod database;
mod save_store;
pub mod schema;
mod settings_repository;

pub use database::{Connection, Database, SETTINGS_SCHEMA_VERSION};
pub use save_store::SaveFileStore;
pub use schema::{SaveFile, CURRENT_VERSION};
pub use settings_repository::{Setting, SettingsRepository};
