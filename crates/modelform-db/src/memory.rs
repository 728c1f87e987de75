//! An in-memory [`ModelStore`].
//!
//! Rows are kept per model in primary-key order, which is the natural
//! iteration order seen by `all`. Collection members keep insertion order;
//! sorted-set members are ordered by score, a newly added member scoring one
//! above the current maximum.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use modelform_core::{ModelFormError, ModelFormResult};

use crate::fields::{FieldKind, ScalarKind};
use crate::integrity::{check_instance, IntegrityReport, IntegrityViolation};
use crate::model::{Instance, ModelMeta};
use crate::store::ModelStore;
use crate::value::Value;

type MemberKey = (String, i64, String);

#[derive(Debug, Default)]
struct Tables {
    metas: HashMap<String, Arc<ModelMeta>>,
    rows: HashMap<String, BTreeMap<i64, Instance>>,
    next_pk: HashMap<String, i64>,
    members: HashMap<MemberKey, Vec<(Value, i64)>>,
}

/// A thread-safe, in-memory model store.
///
/// # Examples
///
/// ```
/// use modelform_db::{FieldDescriptor, FieldKind, Instance, MemoryStore, ModelMeta, ModelStore, ScalarKind};
///
/// let store = MemoryStore::new();
/// let meta = store.register(ModelMeta::new("Foo", vec![
///     FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char)),
/// ]));
///
/// let mut foo = Instance::new(meta);
/// foo.set("username", "foo").unwrap();
/// store.save(&mut foo).unwrap();
/// assert_eq!(foo.pk(), Some(1));
/// assert_eq!(store.all("Foo").unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model and returns its shared metadata. Registering a
    /// model name again replaces its metadata and keeps its rows.
    pub fn register(&self, meta: ModelMeta) -> Arc<ModelMeta> {
        let meta = Arc::new(meta);
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tables.metas.insert(meta.name.to_string(), Arc::clone(&meta));
        tables.rows.entry(meta.name.to_string()).or_default();
        tracing::debug!(model = meta.name, "registered model");
        meta
    }

    /// Deletes a row and its collection members.
    pub fn delete(&self, model: &str, pk: i64) -> ModelFormResult<()> {
        let mut tables = self.write()?;
        let removed = tables
            .rows
            .get_mut(model)
            .and_then(|rows| rows.remove(&pk));
        if removed.is_none() {
            return Err(not_found(model, pk));
        }
        tables
            .members
            .retain(|(m, owner, _), _| !(m == model && *owner == pk));
        tracing::debug!(model, pk, "deleted row");
        Ok(())
    }

    fn read(&self) -> ModelFormResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| ModelFormError::DatabaseError("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> ModelFormResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| ModelFormError::DatabaseError("memory store lock poisoned".to_string()))
    }

    fn member_key(instance: &Instance, field: &str) -> ModelFormResult<(MemberKey, FieldKind)> {
        let kind = instance
            .meta()
            .field(field)
            .filter(|f| f.is_collection())
            .map(|f| f.kind.clone())
            .ok_or_else(|| {
                ModelFormError::DatabaseError(format!(
                    "{}.{field} is not a collection field",
                    instance.model_name()
                ))
            })?;
        let pk = instance.pk().ok_or_else(|| {
            ModelFormError::State(format!(
                "{} must be saved before its collections are written",
                instance.model_name()
            ))
        })?;
        Ok(((instance.model_name().to_string(), pk, field.to_string()), kind))
    }
}

fn not_found(model: &str, pk: i64) -> ModelFormError {
    ModelFormError::NotFound(format!("{model} with pk {pk}"))
}

fn dedup(values: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

impl ModelStore for MemoryStore {
    fn meta(&self, model: &str) -> ModelFormResult<Arc<ModelMeta>> {
        self.read()?
            .metas
            .get(model)
            .cloned()
            .ok_or_else(|| ModelFormError::DatabaseError(format!("unknown model '{model}'")))
    }

    fn all(&self, model: &str) -> ModelFormResult<Vec<Instance>> {
        let tables = self.read()?;
        let rows = tables
            .rows
            .get(model)
            .ok_or_else(|| ModelFormError::DatabaseError(format!("unknown model '{model}'")))?;
        Ok(rows.values().cloned().collect())
    }

    fn get(&self, model: &str, pk: i64) -> ModelFormResult<Instance> {
        self.read()?
            .rows
            .get(model)
            .and_then(|rows| rows.get(&pk))
            .cloned()
            .ok_or_else(|| not_found(model, pk))
    }

    fn save(&self, instance: &mut Instance) -> ModelFormResult<()> {
        let mut tables = self.write()?;
        let model = instance.model_name();
        if !tables.metas.contains_key(model) {
            return Err(ModelFormError::DatabaseError(format!(
                "unknown model '{model}'"
            )));
        }

        let pk = if let Some(pk) = instance.pk() {
            pk
        } else {
            let next = tables.next_pk.entry(model.to_string()).or_insert(0);
            *next += 1;
            let pk = *next;
            instance.set_pk(pk);
            pk
        };
        if let Some(next) = tables.next_pk.get_mut(model) {
            *next = (*next).max(pk);
        } else {
            tables.next_pk.insert(model.to_string(), pk);
        }

        let mut row = instance.clone();
        row.take_pending();
        tables.rows.entry(model.to_string()).or_default().insert(pk, row);
        tracing::debug!(model, pk, "saved row");
        Ok(())
    }

    fn check_integrity(&self, instance: &Instance) -> IntegrityReport {
        let mut report = check_instance(instance);
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let meta = instance.meta();

        for (name, value) in instance.scalar_values() {
            if value.is_null() {
                continue;
            }
            let Some(field) = meta.field(name) else {
                continue;
            };

            if field.unique {
                let taken = tables.rows.get(meta.name).is_some_and(|rows| {
                    rows.iter().any(|(pk, row)| {
                        Some(*pk) != instance.pk() && row.get(name).as_ref() == Some(&value)
                    })
                });
                if taken {
                    report.push(IntegrityViolation::field(
                        name,
                        format!("{} with this {} already exists.", meta.name, field.label()),
                    ));
                }
            }

            if let FieldKind::Scalar(ScalarKind::ForeignKey { to }) = &field.kind {
                let exists = value.as_int().is_some_and(|key| {
                    tables.rows.get(to).is_some_and(|rows| rows.contains_key(&key))
                });
                if !exists {
                    report.push(IntegrityViolation::field(
                        name,
                        format!("{to} instance with pk {value} does not exist."),
                    ));
                }
            }
        }

        report
    }

    fn members(&self, instance: &Instance, field: &str) -> ModelFormResult<Vec<Value>> {
        if instance.is_new() {
            return Ok(Vec::new());
        }
        let (key, kind) = Self::member_key(instance, field)?;
        let tables = self.read()?;
        let mut entries = tables.members.get(&key).cloned().unwrap_or_default();
        if kind == FieldKind::SortedSet {
            entries.sort_by_key(|(_, score)| *score);
        }
        Ok(entries.into_iter().map(|(v, _)| v).collect())
    }

    fn replace_members(
        &self,
        instance: &Instance,
        field: &str,
        values: &[Value],
    ) -> ModelFormResult<()> {
        let (key, _) = Self::member_key(instance, field)?;
        let entries: Vec<(Value, i64)> = dedup(values).into_iter().zip(1..).collect();
        tracing::debug!(
            model = instance.model_name(),
            field,
            count = entries.len(),
            "replaced collection members"
        );
        self.write()?.members.insert(key, entries);
        Ok(())
    }

    fn add_members(
        &self,
        instance: &Instance,
        field: &str,
        values: &[Value],
    ) -> ModelFormResult<()> {
        let (key, _) = Self::member_key(instance, field)?;
        let mut tables = self.write()?;
        let entries = tables.members.entry(key).or_default();
        let mut added = 0_usize;
        for value in dedup(values) {
            if entries.iter().any(|(v, _)| *v == value) {
                continue;
            }
            let score = entries.iter().map(|(_, s)| *s).max().unwrap_or(0) + 1;
            entries.push((value, score));
            added += 1;
        }
        tracing::debug!(
            model = instance.model_name(),
            field,
            added,
            "added collection members"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDescriptor;

    fn setup() -> (MemoryStore, Arc<ModelMeta>, Arc<ModelMeta>) {
        let store = MemoryStore::new();
        let foo = store.register(ModelMeta::new(
            "Foo",
            vec![FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char)).unique()],
        ));
        let baz = store.register(ModelMeta::new(
            "Baz",
            vec![
                FieldDescriptor::new("users", FieldKind::Set),
                FieldDescriptor::new("ranking", FieldKind::SortedSet),
                FieldDescriptor::new("owner", FieldKind::Scalar(ScalarKind::ForeignKey { to: "Foo".into() }))
                    .nullable(),
            ],
        ));
        (store, foo, baz)
    }

    fn saved(store: &MemoryStore, meta: &Arc<ModelMeta>) -> Instance {
        let mut inst = Instance::new(Arc::clone(meta));
        store.save(&mut inst).unwrap();
        inst
    }

    #[test]
    fn test_save_assigns_sequential_pks() {
        let (store, foo, _) = setup();
        for name in ["a", "b", "c"] {
            let mut inst = Instance::new(Arc::clone(&foo));
            inst.set("username", name).unwrap();
            store.save(&mut inst).unwrap();
        }
        let pks: Vec<_> = store.all("Foo").unwrap().iter().filter_map(Instance::pk).collect();
        assert_eq!(pks, vec![1, 2, 3]);
    }

    #[test]
    fn test_save_updates_existing_row() {
        let (store, foo, _) = setup();
        let mut inst = Instance::new(foo);
        inst.set("username", "a").unwrap();
        store.save(&mut inst).unwrap();
        inst.set("username", "z").unwrap();
        store.save(&mut inst).unwrap();
        assert_eq!(store.all("Foo").unwrap().len(), 1);
        assert_eq!(store.get("Foo", 1).unwrap().get("username"), Some(Value::from("z")));
    }

    #[test]
    fn test_save_does_not_persist_pending_edits() {
        let (store, _, baz) = setup();
        let mut inst = Instance::new(baz);
        inst.stage_collection("users", vec!["a".into()]).unwrap();
        store.save(&mut inst).unwrap();
        assert!(inst.pending("users").is_some());
        let stored = store.get("Baz", inst.pk().unwrap()).unwrap();
        assert!(stored.pending("users").is_none());
    }

    #[test]
    fn test_save_unknown_model() {
        let store = MemoryStore::new();
        let mut inst = Instance::new(Arc::new(ModelMeta::new("Ghost", vec![])));
        assert!(matches!(
            store.save(&mut inst),
            Err(ModelFormError::DatabaseError(_))
        ));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (store, _, _) = setup();
        assert!(matches!(store.get("Foo", 42), Err(ModelFormError::NotFound(_))));
    }

    #[test]
    fn test_set_replace_and_add() {
        let (store, _, baz) = setup();
        let inst = saved(&store, &baz);
        store
            .replace_members(&inst, "users", &["a".into(), "b".into(), "a".into()])
            .unwrap();
        assert_eq!(store.members(&inst, "users").unwrap(), vec![Value::from("a"), Value::from("b")]);
        store.add_members(&inst, "users", &["b".into(), "c".into()]).unwrap();
        assert_eq!(
            store.members(&inst, "users").unwrap(),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
        store.replace_members(&inst, "users", &["c".into()]).unwrap();
        assert_eq!(store.members(&inst, "users").unwrap(), vec![Value::from("c")]);
        assert!(store.contains_member(&inst, "users", &"c".into()).unwrap());
        assert!(!store.contains_member(&inst, "users", &"a".into()).unwrap());
    }

    #[test]
    fn test_sorted_set_add_keeps_existing_scores() {
        let (store, _, baz) = setup();
        let inst = saved(&store, &baz);
        store.add_members(&inst, "ranking", &["x".into(), "y".into()]).unwrap();
        store.add_members(&inst, "ranking", &["z".into(), "x".into()]).unwrap();
        assert_eq!(
            store.members(&inst, "ranking").unwrap(),
            vec![Value::from("x"), Value::from("y"), Value::from("z")]
        );
    }

    #[test]
    fn test_members_of_unsaved_instance_are_empty() {
        let (store, _, baz) = setup();
        let inst = Instance::new(baz);
        assert!(store.members(&inst, "users").unwrap().is_empty());
        assert!(matches!(
            store.add_members(&inst, "users", &["a".into()]),
            Err(ModelFormError::State(_))
        ));
    }

    #[test]
    fn test_members_of_scalar_field_fails() {
        let (store, _, baz) = setup();
        let inst = saved(&store, &baz);
        assert!(store.members(&inst, "owner").is_err());
    }

    #[test]
    fn test_unique_violation() {
        let (store, foo, _) = setup();
        let mut first = Instance::new(Arc::clone(&foo));
        first.set("username", "taken").unwrap();
        store.save(&mut first).unwrap();
        assert!(store.check_integrity(&first).is_ok());

        let mut second = Instance::new(foo);
        second.set("username", "taken").unwrap();
        let report = store.check_integrity(&second);
        assert_eq!(
            report.violations,
            vec![IntegrityViolation::field("username", "Foo with this username already exists.")]
        );
    }

    #[test]
    fn test_foreign_key_must_exist() {
        let (store, foo, baz) = setup();
        let mut inst = Instance::new(baz);
        inst.set("owner", 7).unwrap();
        assert!(!store.check_integrity(&inst).is_ok());

        let mut owner = Instance::new(foo);
        owner.set("username", "o").unwrap();
        store.save(&mut owner).unwrap();
        inst.set("owner", owner.pk().unwrap()).unwrap();
        assert!(store.check_integrity(&inst).is_ok());
    }

    #[test]
    fn test_delete_removes_row_and_members() {
        let (store, _, baz) = setup();
        let inst = saved(&store, &baz);
        store.replace_members(&inst, "users", &["a".into()]).unwrap();
        store.delete("Baz", inst.pk().unwrap()).unwrap();
        assert!(matches!(store.get("Baz", 1), Err(ModelFormError::NotFound(_))));
        assert!(matches!(store.delete("Baz", 1), Err(ModelFormError::NotFound(_))));
    }

    #[test]
    fn test_pks_not_reused_after_delete() {
        let (store, _, baz) = setup();
        let first = saved(&store, &baz);
        store.delete("Baz", first.pk().unwrap()).unwrap();
        let second = saved(&store, &baz);
        assert_eq!(second.pk(), Some(2));
    }
}
