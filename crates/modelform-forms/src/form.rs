//! The model form: binding, validation, and save.
//!
//! [`ModelForm`] drives one submission through its lifecycle:
//!
//! ```text
//! Unbound --bind--> Bound --validate--> Validated --save--> Saved
//!                     ^                  \-> Failed
//!                     \------ bind ------/
//! ```
//!
//! Field-level validation finishes before anything is written to the
//! instance. Scalars are then assigned directly and collection selections
//! are staged as pending edits; the store's integrity check runs last.
//! Collection members in the store change only inside [`ModelForm::save`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use modelform_core::logging::form_span;
use modelform_core::{FormSettings, ModelFormError, ModelFormResult, QueryDict};
use modelform_db::{commit_pending, FieldKind, Instance, ModelMeta, ModelStore, Value};

use crate::bound_field::BoundField;
use crate::collection::CollectionField;
use crate::fields::FormFieldDef;
use crate::model_form::{generate_form_fields, ModelFormConfig};
use crate::validation::{self, NON_FIELD_ERRORS};
use crate::widgets;

/// The lifecycle state of a [`ModelForm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// No data has been bound.
    Unbound,
    /// Data is bound but not validated.
    Bound,
    /// Validation passed; `save()` may be called once.
    Validated,
    /// Validation failed.
    Failed,
    /// The instance was saved.
    Saved,
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unbound => "unbound",
            Self::Bound => "bound",
            Self::Validated => "validated",
            Self::Failed => "failed",
            Self::Saved => "saved",
        };
        f.write_str(name)
    }
}

/// A form generated from a model, bound to one optional instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use modelform_core::{FormSettings, QueryDict};
/// use modelform_db::{FieldDescriptor, FieldKind, MemoryStore, ModelMeta, ScalarKind, Value};
/// use modelform_forms::{ModelForm, ModelFormConfig};
///
/// let store = Arc::new(MemoryStore::new());
/// let foo = store.register(ModelMeta::new(
///     "Foo",
///     vec![FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char))],
/// ));
///
/// let config = ModelFormConfig::new(foo).with_settings(FormSettings::default());
/// let mut form = ModelForm::new(&config, store, None).unwrap();
/// form.bind(&QueryDict::parse("username=foo")).unwrap();
/// assert!(form.validate().unwrap());
///
/// let saved = form.save().unwrap();
/// assert_eq!(saved.get("username"), Some(Value::from("foo")));
/// assert!(saved.pk().is_some());
/// ```
pub struct ModelForm {
    meta: Arc<ModelMeta>,
    settings: FormSettings,
    fields: Vec<FormFieldDef>,
    collections: Vec<CollectionField>,
    store: Arc<dyn ModelStore>,
    instance: Option<Instance>,
    data: QueryDict,
    state: FormState,
    errors: HashMap<String, Vec<String>>,
    cleaned_data: HashMap<String, Value>,
    span: tracing::Span,
}

impl fmt::Debug for ModelForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelForm")
            .field("model", &self.meta.name)
            .field("state", &self.state)
            .field("fields", &self.fields.len())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl ModelForm {
    /// Builds the form fields for `config` and resolves the collection
    /// choices against `instance`.
    ///
    /// Fails when a field cannot be generated (a sorted-set field that was
    /// neither excluded nor overridden, or a set or relation field declared
    /// as a single-value field) or when `instance` belongs to another model.
    pub fn new(
        config: &ModelFormConfig,
        store: Arc<dyn ModelStore>,
        instance: Option<Instance>,
    ) -> ModelFormResult<Self> {
        let meta = Arc::clone(&config.model_meta);
        if let Some(other) = instance.as_ref().filter(|i| i.model_name() != meta.name) {
            return Err(ModelFormError::ConfigurationError(format!(
                "a {} form cannot edit a {} instance",
                meta.name,
                other.model_name()
            )));
        }

        let span = form_span(meta.name);
        let fields = generate_form_fields(config)?;
        let mut collections = Vec::new();
        for def in fields.iter().filter(|f| f.field_type.is_collection()) {
            let mut field = CollectionField::from_def(def, &meta, &config.settings)?;
            field.resolve(store.as_ref(), instance.as_ref())?;
            collections.push(field);
        }

        span.in_scope(|| {
            tracing::debug!(
                fields = fields.len(),
                collections = collections.len(),
                existing = instance.as_ref().is_some_and(|i| !i.is_new()),
                "form created"
            );
        });

        Ok(Self {
            meta,
            settings: config.settings.clone(),
            fields,
            collections,
            store,
            instance,
            data: QueryDict::new(),
            state: FormState::Unbound,
            errors: HashMap::new(),
            cleaned_data: HashMap::new(),
            span,
        })
    }

    /// Binds submitted data.
    ///
    /// Collection choices are resolved afresh, and any previous errors,
    /// cleaned data, and collection parse state are discarded.
    pub fn bind(&mut self, data: &QueryDict) -> ModelFormResult<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        for def in self.fields.iter().filter(|f| f.field_type.is_collection()) {
            let Some(field) = self.collections.iter_mut().find(|c| c.name() == def.name) else {
                continue;
            };
            field.resolve(self.store.as_ref(), self.instance.as_ref())?;
            field.reset();
            let raw = widgets::create_widget(&def.widget).value_from_data(data, &def.name);
            field.accept_submission(&raw);
        }

        self.data = data.clone();
        self.errors.clear();
        self.cleaned_data.clear();
        self.transition(FormState::Bound);
        Ok(())
    }

    /// Validates the bound data.
    ///
    /// Returns `Ok(false)` for an unbound form and for any input problem;
    /// the messages are then available from [`errors`](Self::errors).
    /// `Err` is reserved for failures of the model layer.
    pub fn validate(&mut self) -> ModelFormResult<bool> {
        if self.state == FormState::Unbound {
            return Ok(false);
        }
        let span = self.span.clone();
        let _enter = span.enter();

        self.errors.clear();
        self.cleaned_data.clear();
        validation::clean_fields(&self.fields, &self.data, &mut self.cleaned_data, &mut self.errors);
        validation::validate_collections(&mut self.collections, &mut self.errors)?;

        if !self.errors.is_empty() {
            self.fail("field validation failed");
            return Ok(false);
        }

        self.copy_to_instance()?;

        let Some(instance) = self.instance.as_ref() else {
            return Err(ModelFormError::State("no instance after copying form data".into()));
        };
        let report = self.store.check_integrity(instance);
        if !report.is_ok() {
            let names: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
            validation::distribute_integrity_errors(&report, &names, &mut self.errors);
            self.fail("integrity check failed");
            return Ok(false);
        }

        self.transition(FormState::Validated);
        Ok(true)
    }

    /// Persists the validated instance and commits its collection edits.
    ///
    /// Sets are replaced, sorted sets and relations only gain members.
    /// Fails with a state error unless the last `validate()` succeeded, so a
    /// second `save()` without validating again is an error too. A relation
    /// key with no related row fails with `NotFound`.
    pub fn save(&mut self) -> ModelFormResult<Instance> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.state != FormState::Validated {
            return Err(ModelFormError::State(format!(
                "save() called on a {} form; call validate() first",
                self.state
            )));
        }
        let Some(instance) = self.instance.as_mut() else {
            return Err(ModelFormError::State("validated form has no instance".into()));
        };

        if let Err(err) = Self::persist(self.store.as_ref(), instance) {
            self.state = FormState::Failed;
            tracing::warn!(error = %err, "save failed");
            return Err(err);
        }

        let saved = instance.clone();
        self.transition(FormState::Saved);
        Ok(saved)
    }

    fn persist(store: &dyn ModelStore, instance: &mut Instance) -> ModelFormResult<()> {
        store.save(instance)?;
        let pending = instance.take_pending();
        commit_pending(store, instance, &pending)
    }

    fn copy_to_instance(&mut self) -> ModelFormResult<()> {
        let instance = self
            .instance
            .get_or_insert_with(|| Instance::new(Arc::clone(&self.meta)));

        for def in &self.fields {
            if let Some(field) = self.collections.iter().find(|c| c.name() == def.name) {
                instance.stage_collection(&def.name, field.extract_for_commit()?)?;
                continue;
            }
            let Some(value) = self.cleaned_data.get(&def.name) else {
                continue;
            };
            match self.meta.field(&def.name) {
                // A declared single-value stand-in for a sorted set; sets and
                // relations always go through their adapter.
                Some(model_field) if matches!(model_field.kind, FieldKind::SortedSet) => {
                    let values = if value.is_null() {
                        Vec::new()
                    } else {
                        vec![value.clone()]
                    };
                    instance.stage_collection(&def.name, values)?;
                }
                Some(model_field) if !model_field.is_collection() => {
                    instance.set(&def.name, value.clone())?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn transition(&mut self, state: FormState) {
        tracing::debug!(from = %self.state, to = %state, "form state");
        self.state = state;
    }

    fn fail(&mut self, reason: &str) {
        let mut fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        fields.sort_unstable();
        tracing::info!(?fields, "{reason}");
        self.transition(FormState::Failed);
    }

    /// Returns the lifecycle state.
    pub const fn state(&self) -> FormState {
        self.state
    }

    /// Returns `true` once data has been bound.
    pub fn is_bound(&self) -> bool {
        self.state != FormState::Unbound
    }

    /// Returns the form field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    /// Returns per-field error messages; form-level messages are keyed by
    /// `__all__`.
    pub const fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    /// Returns the form-level error messages.
    pub fn non_field_errors(&self) -> &[String] {
        self.errors
            .get(NON_FIELD_ERRORS)
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the cleaned scalar data.
    pub const fn cleaned_data(&self) -> &HashMap<String, Value> {
        &self.cleaned_data
    }

    /// Returns the collection adapter of a field.
    pub fn collection_field(&self, name: &str) -> Option<&CollectionField> {
        self.collections.iter().find(|c| c.name() == name)
    }

    /// Returns the bound or created instance.
    pub const fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// Returns one bound field per form field, in order.
    pub fn bound_fields(&self) -> Vec<BoundField> {
        self.fields
            .iter()
            .map(|def| {
                let errors = self.errors.get(&def.name).cloned().unwrap_or_default();
                match self.collection_field(&def.name) {
                    Some(field) => BoundField::for_collection(def, field, errors, &self.settings),
                    None => BoundField::new(def, self.display_value(def), errors, &self.settings),
                }
            })
            .collect()
    }

    fn display_value(&self, def: &FormFieldDef) -> Option<String> {
        if self.is_bound() {
            return self.data.get(&def.name).map(str::to_string);
        }
        self.instance
            .as_ref()
            .and_then(|i| i.get(&def.name))
            .or_else(|| def.initial.clone())
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
    }
}
