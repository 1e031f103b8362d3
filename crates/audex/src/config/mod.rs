pub mod loader;
pub mod schema;

pub use loader::{load_settings, load_settings_from_env, load_settings_from_str, validate_settings};
pub use schema::{Settings, ToolPaths};
