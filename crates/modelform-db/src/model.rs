//! Model metadata and instances.
//!
//! A [`ModelMeta`] is declared once per model and shared as `Arc<ModelMeta>`.
//! Every model gets an implicit integer primary key named `pk` as its first
//! field. An [`Instance`] is a row of a model: new (no primary key) or
//! existing. Scalar values live on the instance; collection members live in
//! the store and are reached through a
//! [`Collection`](crate::store::Collection) handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use modelform_core::{ModelFormError, ModelFormResult};

use crate::fields::{FieldDescriptor, FieldKind, ScalarKind};
use crate::integrity::IntegrityViolation;
use crate::value::Value;

/// The name of the implicit primary-key field.
pub const PK_FIELD: &str = "pk";

/// A model-level check run by the integrity pass after field data is copied on.
pub type ModelCheck = fn(&Instance) -> Result<(), IntegrityViolation>;

/// Metadata describing a model.
///
/// # Examples
///
/// ```
/// use modelform_db::fields::{FieldDescriptor, FieldKind, ScalarKind};
/// use modelform_db::model::ModelMeta;
///
/// let meta = ModelMeta::new("Foo", vec![
///     FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char)),
/// ]);
/// assert_eq!(meta.fields[0].name, "pk");
/// assert_eq!(meta.declared_fields().count(), 1);
/// ```
#[derive(Clone)]
pub struct ModelMeta {
    /// The model name (e.g. "Foo").
    pub name: &'static str,
    /// The primary key followed by the declared fields, in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Field whose value is used as the display string of an instance.
    pub display_field: Option<&'static str>,
    /// Model-level checks run during the integrity pass.
    pub checks: Vec<ModelCheck>,
}

impl fmt::Debug for ModelMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMeta")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("display_field", &self.display_field)
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl ModelMeta {
    /// Creates metadata with the implicit `pk` field prepended.
    pub fn new(name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        let mut all = Vec::with_capacity(fields.len() + 1);
        all.push(
            FieldDescriptor::new(PK_FIELD, FieldKind::Scalar(ScalarKind::Integer))
                .primary_key()
                .nullable(),
        );
        all.extend(fields);
        Self {
            name,
            fields: all,
            display_field: None,
            checks: Vec::new(),
        }
    }

    /// Sets the field used to display instances.
    #[must_use]
    pub const fn display_field(mut self, field: &'static str) -> Self {
        self.display_field = Some(field);
        self
    }

    /// Adds a model-level check.
    #[must_use]
    pub fn check(mut self, check: ModelCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterates the declared fields, skipping the primary key.
    pub fn declared_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.primary_key)
    }

    /// Iterates the collection fields in declaration order.
    pub fn collection_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_collection())
    }
}

/// The desired member set of a collection field, staged on an instance by a
/// successful validation and consumed by the commit after `save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCollectionEdit {
    /// The collection field name.
    pub field: String,
    /// The kind of the collection field, which picks the commit semantics.
    pub kind: FieldKind,
    /// The desired members.
    pub values: Vec<Value>,
}

/// A row of a model.
#[derive(Debug, Clone)]
pub struct Instance {
    meta: Arc<ModelMeta>,
    pk: Option<i64>,
    values: HashMap<String, Value>,
    pending: Vec<PendingCollectionEdit>,
}

impl Instance {
    /// Creates a new, unsaved instance with every scalar field set to its
    /// default (or `Null` when it has none).
    pub fn new(meta: Arc<ModelMeta>) -> Self {
        let values = meta
            .declared_fields()
            .filter(|f| !f.is_collection())
            .map(|f| (f.name.to_string(), f.default.clone().unwrap_or(Value::Null)))
            .collect();
        Self {
            meta,
            pk: None,
            values,
            pending: Vec::new(),
        }
    }

    /// Returns the model metadata.
    pub fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &'static str {
        self.meta.name
    }

    /// Returns the primary key, or `None` when the instance was never saved.
    pub const fn pk(&self) -> Option<i64> {
        self.pk
    }

    /// Assigns the primary key. Called by stores on first save.
    pub fn set_pk(&mut self, pk: i64) {
        self.pk = Some(pk);
    }

    /// Returns `true` if the instance has never been saved.
    pub const fn is_new(&self) -> bool {
        self.pk.is_none()
    }

    /// Returns the value of a scalar field. `pk` reads the primary key.
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == PK_FIELD {
            return Some(self.pk.map_or(Value::Null, Value::Int));
        }
        self.values.get(field).cloned()
    }

    /// Sets the value of a scalar field.
    ///
    /// Fails for unknown fields, for the primary key, and for collection
    /// fields, whose members are only changed through the store.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> ModelFormResult<()> {
        let descriptor = self.meta.field(field).ok_or_else(|| {
            ModelFormError::DatabaseError(format!(
                "{} has no field named '{field}'",
                self.meta.name
            ))
        })?;
        if descriptor.primary_key || descriptor.is_collection() {
            return Err(ModelFormError::DatabaseError(format!(
                "{}.{field} cannot be assigned directly",
                self.meta.name
            )));
        }
        self.values.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Iterates `(field, value)` pairs of the scalar fields in declaration order.
    pub fn scalar_values(&self) -> impl Iterator<Item = (&'static str, Value)> + '_ {
        self.meta
            .declared_fields()
            .filter(|f| !f.is_collection())
            .map(|f| (f.name, self.values.get(f.name).cloned().unwrap_or(Value::Null)))
    }

    /// Stages the desired members of a collection field, replacing any edit
    /// already staged for it.
    pub fn stage_collection(
        &mut self,
        field: &str,
        values: Vec<Value>,
    ) -> ModelFormResult<()> {
        let kind = match self.meta.field(field) {
            Some(f) if f.is_collection() => f.kind.clone(),
            _ => {
                return Err(ModelFormError::DatabaseError(format!(
                    "{}.{field} is not a collection field",
                    self.meta.name
                )))
            }
        };
        self.pending.retain(|e| e.field != field);
        self.pending.push(PendingCollectionEdit {
            field: field.to_string(),
            kind,
            values,
        });
        Ok(())
    }

    /// Returns the edit staged for a collection field, if any.
    pub fn pending(&self, field: &str) -> Option<&PendingCollectionEdit> {
        self.pending.iter().find(|e| e.field == field)
    }

    /// Removes and returns all staged edits, in staging order.
    pub fn take_pending(&mut self) -> Vec<PendingCollectionEdit> {
        std::mem::take(&mut self.pending)
    }

    /// Returns the display string: the display field's value when declared,
    /// otherwise `<model> <pk>`.
    pub fn display(&self) -> String {
        if let Some(value) = self.meta.display_field.and_then(|f| self.get(f)) {
            if !value.is_null() {
                return value.to_string();
            }
        }
        match self.pk {
            Some(pk) => format!("{} {pk}", self.meta.name),
            None => format!("{} (unsaved)", self.meta.name),
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baz_meta() -> Arc<ModelMeta> {
        Arc::new(
            ModelMeta::new(
                "Baz",
                vec![
                    FieldDescriptor::new("title", FieldKind::Scalar(ScalarKind::Char))
                        .default("untitled"),
                    FieldDescriptor::new("rank", FieldKind::Scalar(ScalarKind::Integer))
                        .nullable(),
                    FieldDescriptor::new("users", FieldKind::Set),
                ],
            )
            .display_field("title"),
        )
    }

    #[test]
    fn test_meta_prepends_pk() {
        let meta = baz_meta();
        assert_eq!(meta.fields.len(), 4);
        assert!(meta.fields[0].primary_key);
        assert_eq!(
            meta.declared_fields().map(|f| f.name).collect::<Vec<_>>(),
            vec!["title", "rank", "users"]
        );
        assert_eq!(
            meta.collection_fields().map(|f| f.name).collect::<Vec<_>>(),
            vec!["users"]
        );
    }

    #[test]
    fn test_new_instance_uses_defaults() {
        let inst = Instance::new(baz_meta());
        assert!(inst.is_new());
        assert_eq!(inst.get("title"), Some(Value::from("untitled")));
        assert_eq!(inst.get("rank"), Some(Value::Null));
        assert_eq!(inst.get("pk"), Some(Value::Null));
        assert_eq!(inst.get("users"), None);
    }

    #[test]
    fn test_set_rejects_collections_and_unknown() {
        let mut inst = Instance::new(baz_meta());
        inst.set("title", "hello").unwrap();
        assert_eq!(inst.get("title"), Some(Value::from("hello")));
        assert!(inst.set("users", "a").is_err());
        assert!(inst.set("pk", 3).is_err());
        assert!(inst.set("nope", 1).is_err());
    }

    #[test]
    fn test_stage_collection_replaces_previous_edit() {
        let mut inst = Instance::new(baz_meta());
        inst.stage_collection("users", vec!["a".into()]).unwrap();
        inst.stage_collection("users", vec!["b".into()]).unwrap();
        assert_eq!(inst.pending("users").unwrap().values, vec![Value::from("b")]);
        assert!(inst.stage_collection("title", vec![]).is_err());

        let edits = inst.take_pending();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, FieldKind::Set);
        assert!(inst.pending("users").is_none());
    }

    #[test]
    fn test_display() {
        let mut inst = Instance::new(baz_meta());
        assert_eq!(inst.to_string(), "untitled");
        inst.set("title", Value::Null).unwrap();
        assert_eq!(inst.to_string(), "Baz (unsaved)");
        inst.set_pk(9);
        assert_eq!(inst.to_string(), "Baz 9");
    }

    #[test]
    fn test_scalar_values_in_order() {
        let inst = Instance::new(baz_meta());
        let names: Vec<_> = inst.scalar_values().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["title", "rank"]);
    }
}
