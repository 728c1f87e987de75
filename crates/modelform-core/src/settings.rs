//! Settings for the modelform workspace.
//!
//! [`Settings`] holds the configuration read at startup (logging and the
//! default form messages and markup options). [`LazySettings`] is a
//! process-wide slot that can be configured once; forms fall back to
//! [`Settings::default`] when it is left empty.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ModelFormError, ModelFormResult};

/// Default messages and markup options used by generated form fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSettings {
    /// Message for a required field that was submitted empty.
    pub required_message: String,
    /// Message for a collection value outside the candidate set.
    /// `{value}` is replaced by the offending value.
    pub invalid_choice_message: String,
    /// Message for a token that cannot be parsed into the field's value type.
    pub coercion_message: String,
    /// Message for a single-select collection field given several values.
    pub single_choice_message: String,
    /// Optional CSS class placed on the `<ul>` of a checkbox group.
    pub checkbox_list_class: Option<String>,
    /// Pattern for the HTML `id` of a field; `{name}` is replaced by the field name.
    pub auto_id: String,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            required_message: "This field is required.".to_string(),
            invalid_choice_message: "`{value}` not a valid choice".to_string(),
            coercion_message: "Invalid choice(s): one or more data inputs could not be coerced"
                .to_string(),
            single_choice_message: "Select only one choice.".to_string(),
            checkbox_list_class: None,
            auto_id: "id_{name}".to_string(),
        }
    }
}

impl FormSettings {
    /// Renders the invalid-choice message for the given value.
    pub fn invalid_choice(&self, value: &str) -> String {
        self.invalid_choice_message.replace("{value}", value)
    }

    /// Renders the HTML `id` for a field name.
    pub fn auto_id_for(&self, name: &str) -> String {
        self.auto_id.replace("{name}", name)
    }
}

/// The complete set of settings.
///
/// # Examples
///
/// ```
/// use modelform_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.log_level, "info");
/// assert_eq!(settings.forms.auto_id_for("users"), "id_users");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log level or `EnvFilter` directive (e.g. "info", "modelform_forms=debug").
    pub log_level: String,
    /// Form messages and markup options.
    pub forms: FormSettings,
    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            forms: FormSettings::default(),
            extra: HashMap::new(),
        }
    }
}

/// A lazily configured, process-wide settings slot.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the settings. May succeed only once per slot.
    pub fn configure(&self, settings: Settings) -> ModelFormResult<()> {
        self.inner.set(settings).map_err(|_| {
            ModelFormError::ConfigurationError("Settings have already been configured".to_string())
        })
    }

    /// Returns the configured settings, if any.
    pub fn get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns the configured form settings, or the defaults.
    pub fn forms(&self) -> FormSettings {
        self.get()
            .map_or_else(FormSettings::default, |s| s.forms.clone())
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings slot.
///
/// Call `SETTINGS.configure(settings)` once at application startup.
pub static SETTINGS: LazySettings = LazySettings::new();
