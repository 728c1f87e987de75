//! Model-backed form configuration and field generation.
//!
//! [`ModelFormConfig`] says how to build form fields from a model's
//! [`ModelMeta`]: which fields to take, and the widget, label, and help-text
//! overrides. [`generate_form_fields`] turns the chosen
//! [`FieldDescriptor`]s into [`FormFieldDef`]s with a kind-keyed table,
//! then merges in any explicitly declared fields.

use std::collections::HashMap;
use std::sync::Arc;

use modelform_core::{FormSettings, ModelFormError, ModelFormResult, SETTINGS};
use modelform_db::{FieldDescriptor, FieldKind, ModelMeta, ScalarKind, Value};

use crate::collection::sorted_set_unsupported;
use crate::fields::{coerce_int, coerce_string, FormFieldDef, FormFieldType};
use crate::widgets::WidgetType;

/// Configuration for generating a model-backed form.
#[derive(Debug, Clone)]
pub struct ModelFormConfig {
    /// The model metadata to generate fields from.
    pub model_meta: Arc<ModelMeta>,
    /// Which model fields to include in the form.
    pub fields: ModelFormFields,
    /// Widget overrides keyed by field name.
    pub widgets: HashMap<String, WidgetType>,
    /// Label overrides keyed by field name.
    pub labels: HashMap<String, String>,
    /// Help text overrides keyed by field name.
    pub help_texts: HashMap<String, String>,
    /// Explicitly declared fields; each replaces the generated field of the
    /// same name or is appended.
    pub declared: Vec<FormFieldDef>,
    /// Messages and markup options.
    pub settings: FormSettings,
}

/// Specifies which model fields to include in a `ModelForm`.
#[derive(Debug, Clone)]
pub enum ModelFormFields {
    /// Include all declared fields.
    All,
    /// Include only the specified fields.
    Include(Vec<String>),
    /// Include all fields except the specified ones.
    Exclude(Vec<String>),
}

impl ModelFormFields {
    fn admits(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(include) => include.iter().any(|f| f == name),
            Self::Exclude(exclude) => !exclude.iter().any(|f| f == name),
        }
    }
}

impl ModelFormConfig {
    /// Creates a new `ModelFormConfig` with all fields included and the
    /// globally configured form settings.
    pub fn new(model_meta: Arc<ModelMeta>) -> Self {
        Self {
            model_meta,
            fields: ModelFormFields::All,
            widgets: HashMap::new(),
            labels: HashMap::new(),
            help_texts: HashMap::new(),
            declared: Vec::new(),
            settings: SETTINGS.forms(),
        }
    }

    /// Sets which fields to include.
    #[must_use]
    pub fn with_fields(mut self, fields: ModelFormFields) -> Self {
        self.fields = fields;
        self
    }

    /// Adds a widget override for a specific field.
    #[must_use]
    pub fn with_widget(mut self, field_name: impl Into<String>, widget: WidgetType) -> Self {
        self.widgets.insert(field_name.into(), widget);
        self
    }

    /// Adds a label override for a specific field.
    #[must_use]
    pub fn with_label(mut self, field_name: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field_name.into(), label.into());
        self
    }

    /// Adds a help text override for a specific field.
    #[must_use]
    pub fn with_help_text(
        mut self,
        field_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.help_texts.insert(field_name.into(), text.into());
        self
    }

    /// Declares a field explicitly.
    #[must_use]
    pub fn with_field(mut self, field: FormFieldDef) -> Self {
        self.declared.retain(|f| f.name != field.name);
        self.declared.push(field);
        self
    }

    /// Replaces the form settings.
    #[must_use]
    pub fn with_settings(mut self, settings: FormSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &'static str {
        self.model_meta.name
    }

    fn declared(&self, name: &str) -> Option<&FormFieldDef> {
        self.declared.iter().find(|f| f.name == name)
    }
}

/// Generates form field definitions from a model form configuration.
///
/// Model fields are visited in declaration order. The primary key is always
/// skipped, as is anything the include/exclude list rules out. A declared
/// field replaces the generated one of the same name; declared fields with
/// no model counterpart come last.
///
/// Fails with `Unsupported` when a sorted-set field would have to be
/// generated, and with `ConfigurationError` when a set or relation field is
/// overridden by a single-value field type.
pub fn generate_form_fields(config: &ModelFormConfig) -> ModelFormResult<Vec<FormFieldDef>> {
    let mut form_fields = Vec::new();

    for model_field in config.model_meta.declared_fields() {
        if model_field.primary_key || !config.fields.admits(model_field.name) {
            continue;
        }

        if let Some(declared) = config.declared(model_field.name) {
            check_override(config.model_meta.name, model_field, declared)?;
            form_fields.push(declared.clone().with_default_messages(&config.settings));
            continue;
        }

        form_fields.push(form_field_for(config, model_field)?);
    }

    for declared in &config.declared {
        if config.model_meta.field(&declared.name).is_none() {
            form_fields.push(declared.clone().with_default_messages(&config.settings));
        }
    }

    Ok(form_fields)
}

/// Set and relation fields only accept members through a collection adapter,
/// which checks every value against the candidates.
fn check_override(
    model: &str,
    model_field: &FieldDescriptor,
    declared: &FormFieldDef,
) -> ModelFormResult<()> {
    let membership_checked = matches!(model_field.kind, FieldKind::Set | FieldKind::Relation { .. });
    if membership_checked && !declared.field_type.is_collection() {
        return Err(ModelFormError::ConfigurationError(format!(
            "field '{}' of {} is a {} and cannot be declared as a single-value field",
            model_field.name, model, model_field.kind
        )));
    }
    Ok(())
}

fn form_field_for(
    config: &ModelFormConfig,
    model_field: &FieldDescriptor,
) -> ModelFormResult<FormFieldDef> {
    let name = model_field.name;
    let mut form_field = FormFieldDef::new(name, form_field_type(model_field)?);

    // Optional when there is a default, nulls are allowed, or it is a collection.
    form_field.required =
        !(model_field.default.is_some() || model_field.null || model_field.is_collection());

    if let Some(widget) = config.widgets.get(name) {
        form_field.widget = widget.clone();
    }
    form_field.label = config
        .labels
        .get(name)
        .cloned()
        .unwrap_or_else(|| model_field.label().to_string());
    form_field.help_text = config
        .help_texts
        .get(name)
        .cloned()
        .unwrap_or_else(|| model_field.help_text.clone());
    form_field.initial.clone_from(&model_field.default);

    Ok(form_field.with_default_messages(&config.settings))
}

/// Maps a model field to its form field type.
fn form_field_type(field: &FieldDescriptor) -> ModelFormResult<FormFieldType> {
    if let Some(choices) = &field.choices {
        let coerce: fn(&str) -> ModelFormResult<Value> = match field.kind {
            FieldKind::Scalar(ScalarKind::Integer | ScalarKind::ForeignKey { .. }) => coerce_int,
            _ => coerce_string,
        };
        return Ok(FormFieldType::TypedChoice {
            choices: choices.clone(),
            coerce,
        });
    }

    Ok(match &field.kind {
        FieldKind::Scalar(ScalarKind::Char) => FormFieldType::Char { strip: true },
        FieldKind::Scalar(ScalarKind::Integer | ScalarKind::ForeignKey { .. }) => {
            FormFieldType::Integer
        }
        FieldKind::Scalar(ScalarKind::Date) => FormFieldType::Date,
        FieldKind::Scalar(ScalarKind::DateTime) => FormFieldType::DateTime,
        FieldKind::Set => FormFieldType::SetMultiple,
        FieldKind::SortedSet => return Err(sorted_set_unsupported(field.name)),
        FieldKind::Relation { to } => FormFieldType::RelationMultiple {
            related_model: to.clone(),
        },
    })
}
