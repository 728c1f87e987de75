//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (deep-merged over the defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `MODELFORM_DEBUG` | `debug` |
//! | `MODELFORM_LOG_LEVEL` | `log_level` |
//! | `MODELFORM_CHECKBOX_LIST_CLASS` | `forms.checkbox_list_class` |
//! | `MODELFORM_AUTO_ID` | `forms.auto_id` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use modelform_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/forms.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::ModelFormError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any settings not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, ModelFormError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| ModelFormError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value)?, "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, ModelFormError> {
    let content = read_config(path.as_ref())?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, ModelFormError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, ModelFormError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ModelFormError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, ModelFormError> {
    let content = read_config(path.as_ref())?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `MODELFORM_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("MODELFORM_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Ok(val) = std::env::var("MODELFORM_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("MODELFORM_CHECKBOX_LIST_CLASS") {
        settings.forms.checkbox_list_class = if val.is_empty() { None } else { Some(val) };
    }

    if let Ok(val) = std::env::var("MODELFORM_AUTO_ID") {
        if val.contains("{name}") {
            settings.forms.auto_id = val;
        } else {
            tracing::warn!("Ignoring MODELFORM_AUTO_ID without a {{name}} placeholder");
        }
    }
}

fn read_config(path: &Path) -> Result<String, ModelFormError> {
    std::fs::read_to_string(path).map_err(|e| {
        ModelFormError::ConfigurationError(format!("cannot read {}: {e}", path.display()))
    })
}

fn toml_to_json(value: toml::Value) -> Result<serde_json::Value, ModelFormError> {
    serde_json::to_value(value)
        .map_err(|e| ModelFormError::ConfigurationError(format!("unrepresentable TOML value: {e}")))
}

fn merge_over_defaults(
    overlay: serde_json::Value,
    source: &str,
) -> Result<Settings, ModelFormError> {
    let mut doc = serde_json::to_value(Settings::default())
        .map_err(|e| ModelFormError::ConfigurationError(format!("default settings: {e}")))?;
    overlay_json(&mut doc, overlay);
    serde_json::from_value(doc)
        .map_err(|e| ModelFormError::ConfigurationError(format!("invalid {source} settings: {e}")))
}

/// Recursively writes `overlay` into `doc`; objects merge key by key, anything else replaces.
fn overlay_json(doc: &mut serde_json::Value, overlay: serde_json::Value) {
    match (doc, overlay) {
        (serde_json::Value::Object(target), serde_json::Value::Object(entries)) => {
            for (key, incoming) in entries {
                match target.get_mut(&key) {
                    Some(slot) => overlay_json(slot, incoming),
                    None => {
                        target.insert(key, incoming);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}
