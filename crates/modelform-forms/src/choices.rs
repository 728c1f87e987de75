//! Candidate resolution for collection fields.
//!
//! [`resolve_choices`] computes, for one collection field and an optional
//! bound instance, the ordered candidates a user may pick from and which of
//! them are currently selected.
//!
//! - Set and sorted-set fields: with no saved instance there are no
//!   candidates. With a saved instance the candidates are exactly its current
//!   members, all selected; an arbitrary-value set offers no way to discover
//!   other valid members.
//! - Relation fields: the candidates are every row of the related model,
//!   whether or not an instance is bound. A candidate is selected when its
//!   key is in the bound instance's collection.
//!
//! Order is the store's natural iteration order. Nothing is cached; every
//! call reads the store again.

use modelform_core::{ModelFormError, ModelFormResult};
use modelform_db::{Collection, FieldDescriptor, FieldKind, Instance, ModelStore, Value};

/// One candidate of a collection field: the contract between resolvers,
/// adapters, and renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceEntry {
    /// The value submitted back when the entry is picked.
    pub value: Value,
    /// The display label (escaped by renderers).
    pub label: String,
    /// Whether the entry is currently selected.
    pub selected: bool,
}

impl ChoiceEntry {
    /// Creates an entry.
    pub fn new(value: impl Into<Value>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// Resolves the candidates of a collection field.
///
/// An instance that has not been saved yet resolves like no instance for
/// sets, and with nothing selected for relations.
pub fn resolve_choices(
    store: &dyn ModelStore,
    field: &FieldDescriptor,
    instance: Option<&Instance>,
) -> ModelFormResult<Vec<ChoiceEntry>> {
    let saved = instance.filter(|i| !i.is_new());

    match &field.kind {
        FieldKind::Set | FieldKind::SortedSet => {
            let Some(instance) = saved else {
                return Ok(Vec::new());
            };
            let members = Collection::new(store, instance, field.name)?.iter_members()?;
            Ok(members
                .into_iter()
                .map(|m| {
                    let label = m.to_string();
                    ChoiceEntry::new(m, label, true)
                })
                .collect())
        }
        FieldKind::Relation { to } => {
            let related = store.all(to)?;
            let selected_keys = match saved {
                Some(instance) => Collection::new(store, instance, field.name)?.iter_members()?,
                None => Vec::new(),
            };
            Ok(related
                .iter()
                .filter_map(|row| {
                    let pk = row.pk()?;
                    let value = Value::Int(pk);
                    let selected = selected_keys.contains(&value);
                    Some(ChoiceEntry::new(value, row.display(), selected))
                })
                .collect())
        }
        FieldKind::Scalar(_) => Err(ModelFormError::DatabaseError(format!(
            "{} is a {} field and has no collection choices",
            field.name, field.kind
        ))),
    }
}
