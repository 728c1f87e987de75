//! # modelform-core
//!
//! Core types, settings, and error types for the modelform workspace.
//! This crate has no dependency on the model layer or the forms layer and
//! provides the foundation for both.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`utils`] - Utility types (`MultiValueDict`, `QueryDict`, HTML helpers)
//! - [`settings`] - Settings and the process-wide configuration slot
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{ModelFormError, ModelFormResult, ValidationError};
pub use settings::{FormSettings, Settings, SETTINGS};
pub use utils::QueryDict;
