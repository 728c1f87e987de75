//! The model-store capability trait and collection handles.
//!
//! Forms never reach persistence through globals: a [`ModelStore`] is
//! injected as `Arc<dyn ModelStore>` and every read or write of rows and
//! collection members goes through it.

use std::sync::Arc;

use modelform_core::{ModelFormError, ModelFormResult};

use crate::fields::{FieldDescriptor, FieldKind};
use crate::integrity::IntegrityReport;
use crate::model::{Instance, ModelMeta, PendingCollectionEdit};
use crate::value::Value;

/// Persistence operations consumed by the forms layer.
///
/// Collection members are plain [`Value`]s: strings for `Set` and
/// `SortedSet` fields, `Value::Int` primary keys for `Relation` fields.
/// Member operations on an unsaved instance fail with a state error, except
/// reads, which see an empty collection.
pub trait ModelStore: Send + Sync {
    /// Returns the metadata of a registered model.
    fn meta(&self, model: &str) -> ModelFormResult<Arc<ModelMeta>>;

    /// Returns every row of a model in the store's natural order.
    fn all(&self, model: &str) -> ModelFormResult<Vec<Instance>>;

    /// Fetches one row by primary key, failing with `NotFound`.
    fn get(&self, model: &str, pk: i64) -> ModelFormResult<Instance>;

    /// Inserts or updates a row, assigning a primary key on first save.
    /// Staged collection edits are left on the instance.
    fn save(&self, instance: &mut Instance) -> ModelFormResult<()>;

    /// Runs every integrity check for the instance.
    fn check_integrity(&self, instance: &Instance) -> IntegrityReport;

    /// Returns the members of a collection field in the store's natural order.
    fn members(&self, instance: &Instance, field: &str) -> ModelFormResult<Vec<Value>>;

    /// Replaces the members of a collection field.
    fn replace_members(
        &self,
        instance: &Instance,
        field: &str,
        values: &[Value],
    ) -> ModelFormResult<()>;

    /// Adds members to a collection field, keeping existing ones.
    fn add_members(&self, instance: &Instance, field: &str, values: &[Value])
        -> ModelFormResult<()>;

    /// Tests membership of one value.
    fn contains_member(
        &self,
        instance: &Instance,
        field: &str,
        value: &Value,
    ) -> ModelFormResult<bool> {
        Ok(self.members(instance, field)?.contains(value))
    }
}

/// A live handle on one collection field of one instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use modelform_db::{Collection, FieldDescriptor, FieldKind, Instance, MemoryStore, ModelMeta, ModelStore};
///
/// let store = MemoryStore::new();
/// let meta = store.register(ModelMeta::new("Baz", vec![FieldDescriptor::new("users", FieldKind::Set)]));
/// let mut baz = Instance::new(meta);
/// store.save(&mut baz).unwrap();
///
/// let users = Collection::new(&store, &baz, "users").unwrap();
/// users.replace_all(&["a".into(), "b".into()]).unwrap();
/// assert_eq!(users.iter_members().unwrap().len(), 2);
/// ```
pub struct Collection<'a> {
    store: &'a dyn ModelStore,
    instance: &'a Instance,
    field: &'a FieldDescriptor,
}

impl<'a> Collection<'a> {
    /// Opens the collection `field` of `instance`.
    pub fn new(
        store: &'a dyn ModelStore,
        instance: &'a Instance,
        field: &str,
    ) -> ModelFormResult<Self> {
        let descriptor = instance
            .meta()
            .field(field)
            .filter(|f| f.is_collection())
            .ok_or_else(|| {
                ModelFormError::DatabaseError(format!(
                    "{}.{field} is not a collection field",
                    instance.model_name()
                ))
            })?;
        Ok(Self {
            store,
            instance,
            field: descriptor,
        })
    }

    /// Returns the field descriptor.
    pub const fn descriptor(&self) -> &FieldDescriptor {
        self.field
    }

    /// Returns the current members; empty for an unsaved instance.
    pub fn iter_members(&self) -> ModelFormResult<Vec<Value>> {
        if self.instance.is_new() {
            return Ok(Vec::new());
        }
        self.store.members(self.instance, self.field.name)
    }

    /// Replaces all members.
    pub fn replace_all(&self, values: &[Value]) -> ModelFormResult<()> {
        self.require_saved("replace")?;
        self.store
            .replace_members(self.instance, self.field.name, values)
    }

    /// Adds members, keeping the existing ones.
    pub fn add(&self, values: &[Value]) -> ModelFormResult<()> {
        self.require_saved("add to")?;
        self.store.add_members(self.instance, self.field.name, values)
    }

    /// Tests membership of one value; always `false` for an unsaved instance.
    pub fn contains(&self, value: &Value) -> ModelFormResult<bool> {
        if self.instance.is_new() {
            return Ok(false);
        }
        self.store
            .contains_member(self.instance, self.field.name, value)
    }

    /// Fetches the related row with the given key.
    ///
    /// Only relation collections have related rows; the lookup fails with
    /// `NotFound` when no row has that key.
    pub fn fetch_by_key(&self, key: i64) -> ModelFormResult<Instance> {
        match &self.field.kind {
            FieldKind::Relation { to } => self.store.get(to, key),
            other => Err(ModelFormError::DatabaseError(format!(
                "{}.{} is a {other} field and has no related rows",
                self.instance.model_name(),
                self.field.name
            ))),
        }
    }

    fn require_saved(&self, action: &str) -> ModelFormResult<()> {
        if self.instance.is_new() {
            return Err(ModelFormError::State(format!(
                "cannot {action} {}.{} before the instance is saved",
                self.instance.model_name(),
                self.field.name
            )));
        }
        Ok(())
    }
}

/// Commits staged collection edits of a saved instance.
///
/// - `Set`: the stored members are replaced with exactly the staged values.
/// - `SortedSet`: staged values are added; existing members and their
///   scores are kept.
/// - `Relation`: every staged key is resolved to an existing related row
///   first (failing with `NotFound` before anything is written), then the
///   keys are added. Related rows are never created.
pub fn commit_pending(
    store: &dyn ModelStore,
    instance: &Instance,
    edits: &[PendingCollectionEdit],
) -> ModelFormResult<()> {
    for edit in edits {
        let collection = Collection::new(store, instance, &edit.field)?;
        match &edit.kind {
            FieldKind::Set => collection.replace_all(&edit.values)?,
            FieldKind::SortedSet => collection.add(&edit.values)?,
            FieldKind::Relation { .. } => {
                let mut keys = Vec::with_capacity(edit.values.len());
                for value in &edit.values {
                    let key = value.as_int().ok_or_else(|| {
                        ModelFormError::DatabaseError(format!(
                            "relation key for {}.{} must be an integer, got '{value}'",
                            instance.model_name(),
                            edit.field
                        ))
                    })?;
                    let related = collection.fetch_by_key(key)?;
                    keys.push(related.pk().map_or(Value::Null, Value::Int));
                }
                collection.add(&keys)?;
            }
            FieldKind::Scalar(_) => {
                return Err(ModelFormError::DatabaseError(format!(
                    "{}.{} is not a collection field",
                    instance.model_name(),
                    edit.field
                )))
            }
        }
        tracing::debug!(
            model = instance.model_name(),
            field = %edit.field,
            kind = %edit.kind,
            count = edit.values.len(),
            "committed collection edit"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ScalarKind;
    use crate::memory::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        foo: Arc<ModelMeta>,
        qux: Arc<ModelMeta>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let foo = store.register(ModelMeta::new(
            "Foo",
            vec![FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char))],
        ));
        let qux = store.register(ModelMeta::new(
            "Qux",
            vec![
                FieldDescriptor::new("users", FieldKind::Relation { to: "Foo".into() }),
                FieldDescriptor::new("tags", FieldKind::Set),
                FieldDescriptor::new("ranking", FieldKind::SortedSet),
            ],
        ));
        for name in ["a", "b", "c", "d"] {
            let mut row = Instance::new(Arc::clone(&foo));
            row.set("username", name).unwrap();
            store.save(&mut row).unwrap();
        }
        Fixture { store, foo, qux }
    }

    fn saved_qux(fx: &Fixture) -> Instance {
        let mut qux = Instance::new(Arc::clone(&fx.qux));
        fx.store.save(&mut qux).unwrap();
        qux
    }

    #[test]
    fn test_collection_rejects_scalar_field() {
        let fx = fixture();
        let foo = Instance::new(Arc::clone(&fx.foo));
        assert!(Collection::new(&fx.store, &foo, "username").is_err());
        assert!(Collection::new(&fx.store, &foo, "missing").is_err());
    }

    #[test]
    fn test_collection_on_unsaved_instance() {
        let fx = fixture();
        let qux = Instance::new(Arc::clone(&fx.qux));
        let tags = Collection::new(&fx.store, &qux, "tags").unwrap();
        assert!(tags.iter_members().unwrap().is_empty());
        assert!(!tags.contains(&"a".into()).unwrap());
        assert!(matches!(
            tags.replace_all(&["a".into()]),
            Err(ModelFormError::State(_))
        ));
    }

    #[test]
    fn test_fetch_by_key() {
        let fx = fixture();
        let qux = saved_qux(&fx);
        let users = Collection::new(&fx.store, &qux, "users").unwrap();
        assert_eq!(users.fetch_by_key(2).unwrap().get("username"), Some(Value::from("b")));
        assert!(matches!(users.fetch_by_key(9), Err(ModelFormError::NotFound(_))));

        let tags = Collection::new(&fx.store, &qux, "tags").unwrap();
        assert!(matches!(tags.fetch_by_key(1), Err(ModelFormError::DatabaseError(_))));
    }

    #[test]
    fn test_commit_set_replaces() {
        let fx = fixture();
        let mut qux = saved_qux(&fx);
        let tags = Collection::new(&fx.store, &qux, "tags").unwrap();
        tags.replace_all(&["a".into(), "b".into()]).unwrap();

        qux.stage_collection("tags", vec!["b".into()]).unwrap();
        let edits = qux.take_pending();
        commit_pending(&fx.store, &qux, &edits).unwrap();
        assert_eq!(fx.store.members(&qux, "tags").unwrap(), vec![Value::from("b")]);
    }

    #[test]
    fn test_commit_sorted_set_is_add_only() {
        let fx = fixture();
        let mut qux = saved_qux(&fx);
        fx.store.add_members(&qux, "ranking", &["first".into()]).unwrap();

        qux.stage_collection("ranking", vec!["second".into(), "first".into()])
            .unwrap();
        let edits = qux.take_pending();
        commit_pending(&fx.store, &qux, &edits).unwrap();
        assert_eq!(
            fx.store.members(&qux, "ranking").unwrap(),
            vec![Value::from("first"), Value::from("second")]
        );
    }

    #[test]
    fn test_commit_relation_is_add_only() {
        let fx = fixture();
        let mut qux = saved_qux(&fx);
        qux.stage_collection("users", vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        let edits = qux.take_pending();
        commit_pending(&fx.store, &qux, &edits).unwrap();

        qux.stage_collection("users", vec![Value::Int(1)]).unwrap();
        let edits = qux.take_pending();
        commit_pending(&fx.store, &qux, &edits).unwrap();
        assert_eq!(
            fx.store.members(&qux, "users").unwrap(),
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn test_commit_relation_missing_key_writes_nothing() {
        let fx = fixture();
        let mut qux = saved_qux(&fx);
        qux.stage_collection("users", vec![Value::Int(1), Value::Int(5)])
            .unwrap();
        let edits = qux.take_pending();
        let err = commit_pending(&fx.store, &qux, &edits).unwrap_err();
        assert!(matches!(err, ModelFormError::NotFound(_)));
        assert!(fx.store.members(&qux, "users").unwrap().is_empty());
        assert_eq!(fx.store.all("Foo").unwrap().len(), 4);
    }

    #[test]
    fn test_commit_relation_rejects_non_integer_key() {
        let fx = fixture();
        let mut qux = saved_qux(&fx);
        qux.stage_collection("users", vec!["one".into()]).unwrap();
        let edits = qux.take_pending();
        assert!(matches!(
            commit_pending(&fx.store, &qux, &edits),
            Err(ModelFormError::DatabaseError(_))
        ));
    }
}
