//! Layered configuration for the exam service.
//!
//! Compiled defaults, then `~/.mentora/settings.json`, then environment
//! variables. The result is validated once and passed around explicitly.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
