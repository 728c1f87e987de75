//! Form field definitions and type-level cleaning.
//!
//! Each [`FormFieldDef`] describes a single form field: its type, whether it
//! is required, its initial value, label, and widget. [`clean_field_value`]
//! parses the raw submitted string of a scalar field into a [`Value`].
//! Collection fields (`SetMultiple`, `RelationMultiple`) receive many tokens
//! and are cleaned by their [`CollectionField`](crate::collection::CollectionField)
//! adapter instead.

use std::collections::HashMap;

use modelform_core::{FormSettings, ModelFormError, ModelFormResult};
use modelform_db::Value;

use crate::widgets::WidgetType;

/// Error-message key for an empty required field.
pub const REQUIRED: &str = "required";
/// Error-message key for a value outside the allowed choices.
pub const INVALID_CHOICE: &str = "invalid_choice";
/// Error-message key for a value that does not parse as the field's type.
pub const INVALID: &str = "invalid";

/// The type of a form field, including type-specific parameters.
#[derive(Debug, Clone)]
pub enum FormFieldType {
    /// A string field.
    Char {
        /// Whether to strip leading/trailing whitespace.
        strip: bool,
    },
    /// An integer field.
    Integer,
    /// A date field (YYYY-MM-DD).
    Date,
    /// A date-time field (YYYY-MM-DDTHH:MM:SS).
    DateTime,
    /// A single choice from a fixed list, coerced after the membership check.
    TypedChoice {
        /// Available choices as `(value, display_label)` pairs.
        choices: Vec<(Value, String)>,
        /// Turns the submitted token into a `Value`.
        coerce: fn(&str) -> ModelFormResult<Value>,
    },
    /// Any number of members of an unordered set.
    SetMultiple,
    /// Any number of primary keys of rows of the related model.
    RelationMultiple {
        /// The related model name.
        related_model: String,
    },
}

impl FormFieldType {
    /// Returns `true` for types that take many submitted values.
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::SetMultiple | Self::RelationMultiple { .. })
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name (HTML name attribute).
    pub name: String,
    /// The field type, controlling parsing and coercion.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default/initial value.
    pub initial: Option<Value>,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Human-readable label.
    pub label: String,
    /// The widget type used for rendering.
    pub widget: WidgetType,
    /// Custom error messages keyed by error code.
    pub error_messages: HashMap<String, String>,
}

impl FormFieldDef {
    /// Creates a required `FormFieldDef` using the default widget for its type.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let widget = default_widget_for_field_type(&field_type);
        let label = name.clone();
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            help_text: String::new(),
            label,
            widget,
            error_messages: HashMap::new(),
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the widget type.
    #[must_use]
    pub fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = widget;
        self
    }

    /// Sets a custom error message for a given code.
    #[must_use]
    pub fn error_message(mut self, code: impl Into<String>, msg: impl Into<String>) -> Self {
        self.error_messages.insert(code.into(), msg.into());
        self
    }

    /// Fills in the `required` and `invalid_choice` messages from settings
    /// unless the field already carries its own.
    #[must_use]
    pub fn with_default_messages(mut self, settings: &FormSettings) -> Self {
        self.error_messages
            .entry(REQUIRED.to_string())
            .or_insert_with(|| settings.required_message.clone());
        self.error_messages
            .entry(INVALID_CHOICE.to_string())
            .or_insert_with(|| settings.invalid_choice_message.clone());
        self
    }

    /// Returns the message for `code`, falling back to `default`.
    pub fn message(&self, code: &str, default: &str) -> String {
        self.error_messages
            .get(code)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Returns the default widget type for a given form field type.
pub const fn default_widget_for_field_type(field_type: &FormFieldType) -> WidgetType {
    match field_type {
        FormFieldType::Char { .. } => WidgetType::TextInput,
        FormFieldType::Integer => WidgetType::NumberInput,
        FormFieldType::Date => WidgetType::DateInput,
        FormFieldType::DateTime => WidgetType::DateTimeInput,
        FormFieldType::TypedChoice { .. } => WidgetType::Select,
        FormFieldType::SetMultiple | FormFieldType::RelationMultiple { .. } => {
            WidgetType::CheckboxSelectMultiple
        }
    }
}

/// Coerces a submitted token into `Value::Int`.
pub fn coerce_int(raw: &str) -> ModelFormResult<Value> {
    raw.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| ModelFormError::Coercion(format!("'{raw}' is not an integer")))
}

/// Keeps a submitted token as `Value::String`.
#[allow(clippy::unnecessary_wraps)]
pub fn coerce_string(raw: &str) -> ModelFormResult<Value> {
    Ok(Value::String(raw.to_string()))
}

/// Cleans (validates and coerces) a raw form input string into a typed `Value`.
///
/// 1. Required check (if `required` and the value is empty or missing)
/// 2. Empty optional fields yield the initial value, or `Null`
/// 3. Type coercion (string -> i64, date, etc.) and choice membership
///
/// Returns the cleaned `Value` or a list of error messages.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    let raw_str = raw.unwrap_or("");
    let is_empty = raw_str.is_empty();

    if field.required && is_empty {
        return Err(vec![field.message(REQUIRED, "This field is required.")]);
    }

    if is_empty {
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    match &field.field_type {
        FormFieldType::Char { strip } => {
            let s = if *strip { raw_str.trim() } else { raw_str };
            if !s.is_empty() {
                Ok(Value::String(s.to_string()))
            } else if field.required {
                Err(vec![field.message(REQUIRED, "This field is required.")])
            } else {
                Ok(field.initial.clone().unwrap_or(Value::Null))
            }
        }

        FormFieldType::Integer => raw_str
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| vec![field.message(INVALID, "Enter a whole number.")]),

        FormFieldType::Date => chrono::NaiveDate::parse_from_str(raw_str, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| vec![field.message(INVALID, "Enter a valid date (YYYY-MM-DD).")]),

        FormFieldType::DateTime => {
            chrono::NaiveDateTime::parse_from_str(raw_str, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw_str, "%Y-%m-%dT%H:%M"))
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw_str, "%Y-%m-%d %H:%M:%S"))
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw_str, "%Y-%m-%d %H:%M"))
                .map(Value::DateTime)
                .map_err(|_| vec![field.message(INVALID, "Enter a valid date/time.")])
        }

        FormFieldType::TypedChoice { choices, coerce } => {
            if !choices.iter().any(|(v, _)| v.to_string() == raw_str) {
                let template = field.message(INVALID_CHOICE, "`{value}` not a valid choice");
                return Err(vec![template.replace("{value}", raw_str)]);
            }
            coerce(raw_str).map_err(|_| vec![field.message(INVALID, "Invalid value.")])
        }

        FormFieldType::SetMultiple | FormFieldType::RelationMultiple { .. } => Err(vec![format!(
            "{} takes several values and is cleaned by its collection adapter.",
            field.name
        )]),
    }
}
