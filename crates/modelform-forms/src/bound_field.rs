//! Bound fields: form fields paired with their current data and errors.
//!
//! A [`BoundField`] is what a page template iterates over to render one
//! form row. Scalar fields render through their widget with the current
//! value; collection fields render their adapter's choices through the
//! checkbox group, or a single select when the field was overridden to
//! use one.

use std::collections::HashMap;

use modelform_core::utils::escape_html;
use modelform_core::FormSettings;

use crate::choices::ChoiceEntry;
use crate::collection::CollectionField;
use crate::fields::{FormFieldDef, FormFieldType};
use crate::widgets::{self, CheckboxSelectMultiple, Select, Widget, WidgetType};

/// A form field bound to data and validation state.
#[derive(Debug)]
pub struct BoundField {
    /// The field's HTML name attribute.
    pub name: String,
    /// Snapshot of the field definition.
    pub field: BoundFieldDef,
    /// The current value for scalar widgets and single selects.
    pub data: Option<String>,
    /// Validation error messages for this field.
    pub errors: Vec<String>,
    /// The widget instance used for rendering.
    pub widget: Box<dyn Widget>,
    auto_id: String,
}

/// Minimal field definition snapshot stored in a `BoundField`.
#[derive(Debug, Clone)]
pub struct BoundFieldDef {
    /// The field name.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Help text.
    pub help_text: String,
    /// Whether the field is required.
    pub required: bool,
}

impl BoundFieldDef {
    fn from_def(def: &FormFieldDef) -> Self {
        Self {
            name: def.name.clone(),
            label: def.label.clone(),
            help_text: def.help_text.clone(),
            required: def.required,
        }
    }
}

impl BoundField {
    /// Creates a `BoundField` for a scalar field.
    pub fn new(
        field_def: &FormFieldDef,
        data: Option<String>,
        errors: Vec<String>,
        settings: &FormSettings,
    ) -> Self {
        let widget: Box<dyn Widget> = match &field_def.field_type {
            FormFieldType::TypedChoice { choices, .. } if field_def.widget == WidgetType::Select => {
                let mut options: Vec<(String, String)> = Vec::with_capacity(choices.len() + 1);
                if !field_def.required {
                    options.push((String::new(), "---------".to_string()));
                }
                options.extend(choices.iter().map(|(v, l)| (v.to_string(), l.clone())));
                Box::new(Select::new(options))
            }
            _ => widgets::create_widget(&field_def.widget),
        };

        Self {
            name: field_def.name.clone(),
            field: BoundFieldDef::from_def(field_def),
            data,
            errors,
            widget,
            auto_id: settings.auto_id_for(&field_def.name),
        }
    }

    /// Creates a `BoundField` for a collection field from its adapter.
    pub fn for_collection(
        field_def: &FormFieldDef,
        collection: &CollectionField,
        errors: Vec<String>,
        settings: &FormSettings,
    ) -> Self {
        let entries: Vec<ChoiceEntry> = collection.iter_choices().collect();
        let (widget, data): (Box<dyn Widget>, Option<String>) =
            if field_def.widget == WidgetType::Select {
                let (select, current) = Select::from_entries(&entries, !field_def.required);
                (Box::new(select), current)
            } else {
                let group = CheckboxSelectMultiple::new(entries)
                    .list_class(settings.checkbox_list_class.clone())
                    .auto_id(settings.auto_id.clone());
                (Box::new(group), None)
            };

        Self {
            name: field_def.name.clone(),
            field: BoundFieldDef::from_def(field_def),
            data,
            errors,
            widget,
            auto_id: settings.auto_id_for(&field_def.name),
        }
    }

    /// Renders the widget HTML for this bound field.
    pub fn render(&self, extra_attrs: &HashMap<String, String>) -> String {
        let mut attrs = extra_attrs.clone();
        if !self.auto_id.is_empty() {
            attrs
                .entry("id".to_string())
                .or_insert_with(|| self.auto_id.clone());
        }
        self.widget.render(&self.name, self.data.as_deref(), &attrs)
    }

    /// Renders a `<label>` element for this field.
    pub fn label_tag(&self) -> String {
        let label = escape_html(&self.field.label);
        let label_id = self.widget.id_for_label(&self.auto_id);
        if label_id.is_empty() {
            format!("<label>{label}</label>")
        } else {
            format!(r#"<label for="{}">{label}</label>"#, escape_html(&label_id))
        }
    }

    /// Returns the HTML `id` for this field.
    pub fn auto_id(&self) -> &str {
        &self.auto_id
    }

    /// Returns `true` if this field has any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Renders the error list as an HTML `<ul>` element.
    pub fn errors_as_ul(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        let items: String = self
            .errors
            .iter()
            .map(|e| format!("<li>{}</li>", escape_html(e)))
            .collect();
        format!(r#"<ul class="errorlist">{items}</ul>"#)
    }
}
