//! Form-side adapters for collection fields.
//!
//! A [`CollectionField`] owns everything one set or relation field needs
//! during a request: the resolved candidates, the submitted tokens, and the
//! parsed data. Its data moves through [`FieldData`] exactly once per
//! binding:
//!
//! ```text
//! accept_submission -> Unparsed(tokens) --validate--> Parsed(values)
//!                                                  \-> Invalid(reason)
//! ```
//!
//! Validation is the only gate keeping non-candidate values out of a
//! collection. It runs for every non-empty submission, required or not.

use modelform_core::{FormSettings, ModelFormError, ModelFormResult, ValidationError};
use modelform_db::{FieldDescriptor, FieldKind, Instance, ModelMeta, ModelStore, Value};

use crate::choices::{resolve_choices, ChoiceEntry};
use crate::fields::{FormFieldDef, INVALID_CHOICE, REQUIRED};
use crate::widgets::{WidgetType, NONE_TOKEN};

/// The error for a sorted-set field reaching the forms layer.
pub fn sorted_set_unsupported(name: &str) -> ModelFormError {
    ModelFormError::Unsupported(format!(
        "sorted set field '{name}' cannot be edited through a form; \
         exclude it or declare an override"
    ))
}

/// The data of a collection field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldData {
    /// Submitted tokens, not yet parsed.
    Unparsed(Vec<String>),
    /// Parsed values, in submission order without duplicates.
    Parsed(Vec<Value>),
    /// At least one token could not be parsed.
    Invalid(String),
}

/// A collection field adapter (unordered set or relation).
#[derive(Debug, Clone)]
pub struct CollectionField {
    descriptor: FieldDescriptor,
    required: bool,
    single: bool,
    candidates: Vec<ChoiceEntry>,
    data: Option<FieldData>,
    tokens: Vec<String>,
    required_message: String,
    invalid_choice_message: String,
    coercion_message: String,
    single_choice_message: String,
}

impl CollectionField {
    /// Creates an adapter for an unordered set field.
    pub fn set(name: &'static str) -> Self {
        Self::with_descriptor(FieldDescriptor::new(name, FieldKind::Set))
    }

    /// Creates an adapter for a relation field; submitted tokens must be
    /// primary keys of `related_model`.
    pub fn relation(name: &'static str, related_model: impl Into<String>) -> Self {
        Self::with_descriptor(FieldDescriptor::new(
            name,
            FieldKind::Relation {
                to: related_model.into(),
            },
        ))
    }

    /// Sorted-set fields cannot be edited through a form.
    pub fn sorted_set(name: &str) -> ModelFormResult<Self> {
        Err(sorted_set_unsupported(name))
    }

    /// Creates the adapter for a collection form field definition.
    ///
    /// The definition must name a collection field of `meta`; a declared
    /// field without model storage has nothing to commit to.
    pub fn from_def(
        def: &FormFieldDef,
        meta: &ModelMeta,
        settings: &FormSettings,
    ) -> ModelFormResult<Self> {
        let descriptor = meta
            .field(&def.name)
            .filter(|f| f.is_collection())
            .ok_or_else(|| {
                ModelFormError::ConfigurationError(format!(
                    "{} has no collection field '{}'",
                    meta.name, def.name
                ))
            })?;
        if descriptor.kind == FieldKind::SortedSet {
            return Self::sorted_set(&def.name);
        }
        Ok(Self::with_descriptor(descriptor.clone())
            .required(def.required)
            .single(def.widget == WidgetType::Select)
            .messages(settings, def))
    }

    fn with_descriptor(descriptor: FieldDescriptor) -> Self {
        let defaults = FormSettings::default();
        Self {
            descriptor,
            required: false,
            single: false,
            candidates: Vec::new(),
            data: None,
            tokens: Vec::new(),
            required_message: defaults.required_message,
            invalid_choice_message: defaults.invalid_choice_message,
            coercion_message: defaults.coercion_message,
            single_choice_message: defaults.single_choice_message,
        }
    }

    /// Makes an empty submission fail.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Accepts at most one value (single-select rendering).
    #[must_use]
    pub const fn single(mut self, single: bool) -> Self {
        self.single = single;
        self
    }

    fn messages(mut self, settings: &FormSettings, def: &FormFieldDef) -> Self {
        self.required_message = def.message(REQUIRED, &settings.required_message);
        self.invalid_choice_message =
            def.message(INVALID_CHOICE, &settings.invalid_choice_message);
        self.coercion_message = settings.coercion_message.clone();
        self.single_choice_message = settings.single_choice_message.clone();
        self
    }

    /// Returns the field name.
    pub const fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Returns the collection kind.
    pub const fn kind(&self) -> &FieldKind {
        &self.descriptor.kind
    }

    /// Returns `true` if an empty submission fails.
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns `true` if the field renders as a single select.
    pub const fn is_single(&self) -> bool {
        self.single
    }

    /// Returns the current data, `None` before any submission.
    pub const fn data(&self) -> Option<&FieldData> {
        self.data.as_ref()
    }

    /// Recomputes the candidates from the store for the given instance.
    pub fn resolve(
        &mut self,
        store: &dyn ModelStore,
        instance: Option<&Instance>,
    ) -> ModelFormResult<()> {
        self.candidates = resolve_choices(store, &self.descriptor, instance)?;
        Ok(())
    }

    /// Records submitted tokens.
    ///
    /// Empty and [`NONE_TOKEN`] tokens are dropped and duplicates collapse to
    /// their first occurrence. Parsing happens once, in [`validate`](Self::validate).
    pub fn accept_submission<S: AsRef<str>>(&mut self, raw: &[S]) {
        let mut tokens: Vec<String> = Vec::with_capacity(raw.len());
        for token in raw.iter().map(AsRef::as_ref) {
            if token.is_empty() || token == NONE_TOKEN {
                continue;
            }
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        self.data = Some(FieldData::Unparsed(tokens.clone()));
        self.tokens = tokens;
    }

    fn coerce(&self, token: &str) -> Option<Value> {
        match self.descriptor.kind {
            FieldKind::Relation { .. } => token.trim().parse::<i64>().ok().map(Value::Int),
            _ => Some(Value::String(token.to_string())),
        }
    }

    fn parse(&mut self) {
        if let Some(FieldData::Unparsed(tokens)) = &self.data {
            let parsed: Option<Vec<Value>> = tokens.iter().map(|t| self.coerce(t)).collect();
            let parsed = parsed.map(|values| {
                // "3" and "03" name the same row.
                let mut unique: Vec<Value> = Vec::with_capacity(values.len());
                for value in values {
                    if !unique.contains(&value) {
                        unique.push(value);
                    }
                }
                unique
            });
            self.data = Some(parsed.map_or_else(
                || FieldData::Invalid(self.coercion_message.clone()),
                FieldData::Parsed,
            ));
        }
    }

    /// Validates the submitted data against the resolved candidates.
    ///
    /// Failures are recoverable errors: `Coercion` for unparseable tokens,
    /// `ValidationError` for an empty required field or several values in a
    /// single select, and `InvalidChoice` for the first value that is not a
    /// candidate. A field that received no submission validates as empty.
    pub fn validate(&mut self) -> ModelFormResult<()> {
        if self.data.is_none() {
            self.data = Some(FieldData::Parsed(Vec::new()));
        }
        self.parse();

        let values = match &self.data {
            Some(FieldData::Parsed(values)) => values,
            Some(FieldData::Invalid(reason)) => return Err(ModelFormError::Coercion(reason.clone())),
            _ => return Ok(()),
        };

        if values.is_empty() {
            if self.required {
                return Err(ValidationError::new(self.required_message.clone(), REQUIRED).into());
            }
            return Ok(());
        }

        if self.single && values.len() > 1 {
            return Err(
                ValidationError::new(self.single_choice_message.clone(), "single_choice").into(),
            );
        }

        for value in values {
            if !self.candidates.iter().any(|c| &c.value == value) {
                let token = value.to_string();
                return Err(ModelFormError::InvalidChoice(
                    self.invalid_choice_message.replace("{value}", &token),
                ));
            }
        }
        Ok(())
    }

    /// Returns the validated values to commit.
    ///
    /// Fails with a state error unless [`validate`](Self::validate) parsed
    /// the data successfully.
    pub fn extract_for_commit(&self) -> ModelFormResult<Vec<Value>> {
        match &self.data {
            Some(FieldData::Parsed(values)) => Ok(values.clone()),
            _ => Err(ModelFormError::State(format!(
                "{} has no validated data to commit",
                self.name()
            ))),
        }
    }

    /// Iterates the candidates for rendering.
    ///
    /// Once a submission is recorded, an entry is selected iff its value was
    /// submitted; before that, the resolver's selection is used. Submitted
    /// values that are not candidates never appear.
    pub fn iter_choices(&self) -> impl Iterator<Item = ChoiceEntry> + '_ {
        let bound = self.data.is_some();
        self.candidates.iter().map(move |c| {
            let selected = if bound {
                self.was_submitted(&c.value)
            } else {
                c.selected
            };
            ChoiceEntry {
                value: c.value.clone(),
                label: c.label.clone(),
                selected,
            }
        })
    }

    /// Compares coerced tokens, so `03` selects key 3 just as it commits it.
    fn was_submitted(&self, value: &Value) -> bool {
        match &self.data {
            Some(FieldData::Parsed(values)) => values.contains(value),
            _ => self
                .tokens
                .iter()
                .any(|t| self.coerce(t).as_ref() == Some(value)),
        }
    }

    /// Clears submitted data, keeping the candidates.
    pub fn reset(&mut self) {
        self.data = None;
        self.tokens.clear();
    }
}
