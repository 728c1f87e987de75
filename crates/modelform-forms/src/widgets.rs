//! Widget system for rendering HTML form elements.
//!
//! Widgets are the bridge between form fields and their HTML representation.
//! Scalar widgets render one control for one value. Collection fields render
//! through [`CheckboxSelectMultiple`] (the checkbox group, one labelled
//! checkbox per [`ChoiceEntry`]) or, when overridden, a single [`Select`].
//!
//! All output escapes values and labels; attributes are emitted sorted by name.

use std::collections::HashMap;
use std::fmt;

use modelform_core::utils::{escape_html, html_params};
use modelform_core::QueryDict;

use crate::choices::ChoiceEntry;

/// The `value` of the "no selection" option of an optional single select.
pub const NONE_TOKEN: &str = "__None";

/// Enumerates all built-in widget types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetType {
    /// `<input type="text">`.
    TextInput,
    /// `<input type="number">`.
    NumberInput,
    /// `<input type="date">`.
    DateInput,
    /// `<input type="datetime-local">`.
    DateTimeInput,
    /// `<select>`.
    Select,
    /// A list of `<input type="checkbox">` elements.
    CheckboxSelectMultiple,
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextInput => "TextInput",
            Self::NumberInput => "NumberInput",
            Self::DateInput => "DateInput",
            Self::DateTimeInput => "DateTimeInput",
            Self::Select => "Select",
            Self::CheckboxSelectMultiple => "CheckboxSelectMultiple",
        };
        write!(f, "{name}")
    }
}

/// A trait for HTML form widgets.
pub trait Widget: Send + Sync + fmt::Debug {
    /// Returns the widget type enum variant.
    fn widget_type(&self) -> WidgetType;

    /// Renders the widget as an HTML string.
    ///
    /// # Arguments
    /// - `name` - The HTML `name` attribute
    /// - `value` - The current value to display (if any)
    /// - `attrs` - Additional HTML attributes
    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String;

    /// Extracts every submitted value for `name`, in submission order.
    fn value_from_data(&self, data: &QueryDict, name: &str) -> Vec<String> {
        data.get_list(name).cloned().unwrap_or_default()
    }

    /// Returns the HTML `id` attribute value for a label targeting this widget.
    fn id_for_label(&self, id: &str) -> String {
        id.to_string()
    }
}

fn render_attrs(attrs: &HashMap<String, String>, skip: &[&str]) -> String {
    let pairs: Vec<(&str, Option<&str>)> = attrs
        .iter()
        .filter(|(k, _)| !skip.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), Some(v.as_str())))
        .collect();
    html_params(&pairs)
}

// ---------------------------------------------------------------------------
// Scalar widgets
// ---------------------------------------------------------------------------

fn render_input(
    input_type: &str,
    name: &str,
    value: Option<&str>,
    attrs: &HashMap<String, String>,
) -> String {
    let mut pairs: Vec<(&str, Option<&str>)> = vec![("name", Some(name)), ("type", Some(input_type))];
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        pairs.push(("value", Some(v)));
    }
    for (k, v) in attrs {
        if !matches!(k.as_str(), "name" | "type" | "value") {
            pairs.push((k.as_str(), Some(v.as_str())));
        }
    }
    format!("<input{} />", html_params(&pairs))
}

/// A basic `<input type="text">` widget.
#[derive(Debug, Clone)]
pub struct TextInput;

impl Widget for TextInput {
    fn widget_type(&self) -> WidgetType {
        WidgetType::TextInput
    }

    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        render_input("text", name, value, attrs)
    }
}

/// A `<input type="number">` widget.
#[derive(Debug, Clone)]
pub struct NumberInput;

impl Widget for NumberInput {
    fn widget_type(&self) -> WidgetType {
        WidgetType::NumberInput
    }

    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        render_input("number", name, value, attrs)
    }
}

/// A `<input type="date">` widget.
#[derive(Debug, Clone)]
pub struct DateInput;

impl Widget for DateInput {
    fn widget_type(&self) -> WidgetType {
        WidgetType::DateInput
    }

    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        render_input("date", name, value, attrs)
    }
}

/// A `<input type="datetime-local">` widget.
#[derive(Debug, Clone)]
pub struct DateTimeInput;

impl Widget for DateTimeInput {
    fn widget_type(&self) -> WidgetType {
        WidgetType::DateTimeInput
    }

    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        render_input("datetime-local", name, value, attrs)
    }
}

// ---------------------------------------------------------------------------
// Choice widgets
// ---------------------------------------------------------------------------

/// A `<select>` widget.
///
/// Used for fixed-choice scalar fields and for collection fields rendered as
/// a single select. The option whose value equals the current value is
/// marked `selected`.
#[derive(Debug, Clone)]
pub struct Select {
    /// The available choices as `(value, display_label)` pairs.
    pub choices: Vec<(String, String)>,
}

impl Select {
    /// Creates a new `Select` widget with the given choices.
    pub const fn new(choices: Vec<(String, String)>) -> Self {
        Self { choices }
    }

    /// Builds a select from resolved choice entries, with a leading
    /// [`NONE_TOKEN`] option when `nil` is set. Returns the widget and the
    /// value to pass to `render`.
    pub fn from_entries(entries: &[ChoiceEntry], nil: bool) -> (Self, Option<String>) {
        let mut choices = Vec::with_capacity(entries.len() + 1);
        if nil {
            choices.push((NONE_TOKEN.to_string(), String::new()));
        }
        choices.extend(entries.iter().map(|e| (e.value.to_string(), e.label.clone())));
        let current = entries
            .iter()
            .find(|e| e.selected)
            .map(|e| e.value.to_string())
            .or_else(|| nil.then(|| NONE_TOKEN.to_string()));
        (Self::new(choices), current)
    }
}

impl Widget for Select {
    fn widget_type(&self) -> WidgetType {
        WidgetType::Select
    }

    fn render(&self, name: &str, value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        let current = value.unwrap_or("");
        let mut options = String::new();
        for (val, label) in &self.choices {
            let mut params = vec![("value", Some(val.as_str()))];
            if val == current {
                params.push(("selected", None));
            }
            options.push_str(&format!(
                "<option{}>{}</option>",
                html_params(&params),
                escape_html(label)
            ));
        }
        format!(
            r#"<select name="{}"{}>{options}</select>"#,
            escape_html(name),
            render_attrs(attrs, &["name"])
        )
    }
}

/// A list of labelled `<input type="checkbox">` elements.
///
/// Output for a field `users` with entries `a` (selected) and `b`:
///
/// ```text
/// <ul><li><label for="id_users_0"><input checked id="id_users_0" name="users" type="checkbox" value="a"> a</label></li>
/// <li><label for="id_users_1"><input id="id_users_1" name="users" type="checkbox" value="b"> b</label></li></ul>
/// ```
///
/// (shown wrapped; the real output has no newlines). Each checkbox id is the
/// field's auto id followed by `_<index>`.
#[derive(Debug, Clone)]
pub struct CheckboxSelectMultiple {
    /// The entries to render, in order.
    pub choices: Vec<ChoiceEntry>,
    /// Optional CSS class of the `<ul>`.
    pub list_class: Option<String>,
    /// Pattern for the id prefix; `{name}` is replaced by the field name.
    pub auto_id: String,
}

impl CheckboxSelectMultiple {
    /// Creates a checkbox group with the default `id_{name}` id pattern.
    pub fn new(choices: Vec<ChoiceEntry>) -> Self {
        Self {
            choices,
            list_class: None,
            auto_id: "id_{name}".to_string(),
        }
    }

    /// Sets the CSS class of the `<ul>`.
    #[must_use]
    pub fn list_class(mut self, class: Option<String>) -> Self {
        self.list_class = class;
        self
    }

    /// Sets the id pattern.
    #[must_use]
    pub fn auto_id(mut self, pattern: impl Into<String>) -> Self {
        self.auto_id = pattern.into();
        self
    }

    /// Renders any sequence of choice entries as a checkbox group.
    ///
    /// Extra `attrs` are copied onto every `<input>`; they cannot replace
    /// `id`, `name`, `value`, or `checked`. `type` defaults to `checkbox`.
    pub fn render_choices<I>(&self, name: &str, choices: I, attrs: &HashMap<String, String>) -> String
    where
        I: IntoIterator<Item = ChoiceEntry>,
    {
        let id_prefix = self.auto_id.replace("{name}", name);
        let mut html = match &self.list_class {
            Some(class) => format!("<ul{}>", html_params(&[("class", Some(class.as_str()))])),
            None => String::from("<ul>"),
        };

        for (i, entry) in choices.into_iter().enumerate() {
            let id = format!("{id_prefix}_{i}");
            let value = entry.value.to_string();

            let mut options: Vec<(&str, Option<&str>)> = vec![
                ("id", Some(id.as_str())),
                ("name", Some(name)),
                ("value", Some(value.as_str())),
            ];
            if !attrs.contains_key("type") {
                options.push(("type", Some("checkbox")));
            }
            for (k, v) in attrs {
                if !matches!(k.as_str(), "id" | "name" | "value" | "checked") {
                    options.push((k.as_str(), Some(v.as_str())));
                }
            }
            if entry.selected {
                options.push(("checked", None));
            }

            html.push_str(&format!(
                "<li><label{}><input{}> {}</label></li>",
                html_params(&[("for", Some(id.as_str()))]),
                html_params(&options),
                escape_html(&entry.label)
            ));
        }

        html.push_str("</ul>");
        html
    }
}

impl Widget for CheckboxSelectMultiple {
    fn widget_type(&self) -> WidgetType {
        WidgetType::CheckboxSelectMultiple
    }

    fn render(&self, name: &str, _value: Option<&str>, attrs: &HashMap<String, String>) -> String {
        self.render_choices(name, self.choices.iter().cloned(), attrs)
    }

    fn id_for_label(&self, id: &str) -> String {
        format!("{id}_0")
    }
}

/// Creates a boxed scalar widget from a `WidgetType`.
///
/// Choice widgets are created without choices; use
/// [`Select::new`]/[`Select::from_entries`] or [`CheckboxSelectMultiple::new`]
/// to populate them.
pub fn create_widget(widget_type: &WidgetType) -> Box<dyn Widget> {
    match widget_type {
        WidgetType::TextInput => Box::new(TextInput),
        WidgetType::NumberInput => Box::new(NumberInput),
        WidgetType::DateInput => Box::new(DateInput),
        WidgetType::DateTimeInput => Box::new(DateTimeInput),
        WidgetType::Select => Box::new(Select::new(vec![])),
        WidgetType::CheckboxSelectMultiple => Box::new(CheckboxSelectMultiple::new(vec![])),
    }
}
