//! # modelform-forms
//!
//! Forms generated from model metadata, with set and relation fields that
//! stay in sync with the store.
//!
//! ## Modules
//!
//! - [`choices`] - Resolving the candidates of a collection field
//! - [`collection`] - Collection field adapters
//! - [`fields`] - Form field definitions and scalar cleaning
//! - [`widgets`] - HTML widgets, including the checkbox group
//! - [`bound_field`] - Fields paired with data and errors for rendering
//! - [`model_form`] - Configuration and field generation from a model
//! - [`validation`] - The validation pipeline
//! - [`form`] - The `ModelForm` lifecycle

pub mod bound_field;
pub mod choices;
pub mod collection;
pub mod fields;
pub mod form;
pub mod model_form;
pub mod validation;
pub mod widgets;

pub use bound_field::BoundField;
pub use choices::{resolve_choices, ChoiceEntry};
pub use collection::{CollectionField, FieldData};
pub use fields::{FormFieldDef, FormFieldType};
pub use form::{FormState, ModelForm};
pub use model_form::{generate_form_fields, ModelFormConfig, ModelFormFields};
pub use validation::NON_FIELD_ERRORS;
pub use widgets::{CheckboxSelectMultiple, Select, Widget, WidgetType};
