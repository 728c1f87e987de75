//! Integration tests for the submission -> form -> store pipeline.
//!
//! Covers scalar binding, set and relation synchronization, rendering
//! round-trips, single-select overrides, integrity error distribution, and
//! the save lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use modelform_core::{FormSettings, ModelFormError, QueryDict};
use modelform_db::{
    FieldDescriptor, FieldKind, Instance, IntegrityViolation, MemoryStore, ModelMeta, ModelStore,
    ScalarKind, Value,
};
use modelform_forms::{
    FormFieldDef, FormFieldType, FormState, ModelForm, ModelFormConfig, ModelFormFields,
    WidgetType,
};

// ============================================================================
// Shared helpers
// ============================================================================

struct Fixture {
    store: Arc<MemoryStore>,
    foo: Arc<ModelMeta>,
    baz: Arc<ModelMeta>,
    qux: Arc<ModelMeta>,
}

fn no_reserved_names(instance: &Instance) -> Result<(), IntegrityViolation> {
    if instance.get("username") == Some(Value::from("root")) {
        return Err(IntegrityViolation::model("That name is reserved."));
    }
    Ok(())
}

/// `Foo{username}` with four rows (ann, bob, cid, dee), `Baz{users: set}`,
/// and `Qux{users: relation(Foo)}`.
fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let foo = store.register(
        ModelMeta::new(
            "Foo",
            vec![FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char)).unique()],
        )
        .display_field("username")
        .check(no_reserved_names),
    );
    let baz = store.register(ModelMeta::new(
        "Baz",
        vec![FieldDescriptor::new("users", FieldKind::Set)],
    ));
    let qux = store.register(ModelMeta::new(
        "Qux",
        vec![FieldDescriptor::new("users", FieldKind::Relation { to: "Foo".into() })],
    ));
    for name in ["ann", "bob", "cid", "dee"] {
        let mut row = Instance::new(Arc::clone(&foo));
        row.set("username", name).unwrap();
        store.save(&mut row).unwrap();
    }
    Fixture { store, foo, baz, qux }
}

fn config(meta: &Arc<ModelMeta>) -> ModelFormConfig {
    ModelFormConfig::new(Arc::clone(meta)).with_settings(FormSettings::default())
}

fn form(fx: &Fixture, meta: &Arc<ModelMeta>, instance: Option<Instance>) -> ModelForm {
    ModelForm::new(&config(meta), fx.store.clone(), instance).unwrap()
}

fn submit(form: &mut ModelForm, query: &str) -> bool {
    form.bind(&QueryDict::parse(query)).unwrap();
    form.validate().unwrap()
}

fn saved_baz(fx: &Fixture, members: &[&str]) -> Instance {
    let mut baz = Instance::new(Arc::clone(&fx.baz));
    fx.store.save(&mut baz).unwrap();
    let values: Vec<Value> = members.iter().map(|m| Value::from(*m)).collect();
    fx.store.replace_members(&baz, "users", &values).unwrap();
    baz
}

fn members(fx: &Fixture, instance: &Instance) -> Vec<Value> {
    fx.store.members(instance, "users").unwrap()
}

fn ints(keys: &[i64]) -> Vec<Value> {
    keys.iter().copied().map(Value::Int).collect()
}

// ============================================================================
// Scalar fields
// ============================================================================

#[test]
fn test_scalar_submission_saves_with_new_key() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(submit(&mut form, "username=foo"));

    let saved = form.save().unwrap();
    assert_eq!(saved.get("username"), Some(Value::from("foo")));
    assert_eq!(saved.pk(), Some(5));
    assert_eq!(fx.store.get("Foo", 5).unwrap().get("username"), Some(Value::from("foo")));
    assert_eq!(form.state(), FormState::Saved);
}

#[test]
fn test_missing_required_scalar_fails() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(!submit(&mut form, ""));
    assert_eq!(form.errors()["username"], vec!["This field is required."]);
    assert_eq!(form.state(), FormState::Failed);
    assert!(form.instance().is_none());
}

#[test]
fn test_validate_unbound_form_is_false() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(!form.validate().unwrap());
    assert_eq!(form.state(), FormState::Unbound);
    assert!(!form.is_bound());
    assert!(form.errors().is_empty());
}

#[test]
fn test_rebind_clears_errors() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(!submit(&mut form, ""));
    form.bind(&QueryDict::parse("username=eve")).unwrap();
    assert_eq!(form.state(), FormState::Bound);
    assert!(form.errors().is_empty());
    assert!(form.validate().unwrap());
    assert_eq!(form.cleaned_data()["username"], Value::from("eve"));
}

// ============================================================================
// Unordered sets
// ============================================================================

#[test]
fn test_set_without_instance_accepts_only_empty_submission() {
    let fx = fixture();
    let mut form = form(&fx, &fx.baz, None);
    assert!(!submit(&mut form, "users=a&users=b"));
    assert_eq!(form.errors()["users"], vec!["`a` not a valid choice"]);

    assert!(submit(&mut form, ""));
    let saved = form.save().unwrap();
    assert!(members(&fx, &saved).is_empty());
}

#[test]
fn test_set_subset_replaces_members() {
    let fx = fixture();
    let baz = saved_baz(&fx, &["a", "b"]);
    let mut form = form(&fx, &fx.baz, Some(baz));

    let choices: Vec<(String, bool)> = form
        .collection_field("users")
        .unwrap()
        .iter_choices()
        .map(|c| (c.value.to_string(), c.selected))
        .collect();
    assert_eq!(choices, vec![("a".into(), true), ("b".into(), true)]);

    assert!(submit(&mut form, "users=b"));
    let saved = form.save().unwrap();
    assert_eq!(members(&fx, &saved), vec![Value::from("b")]);
}

#[test]
fn test_set_rejects_injected_member_and_keeps_store() {
    let fx = fixture();
    let baz = saved_baz(&fx, &["a", "b"]);
    let mut form = form(&fx, &fx.baz, Some(baz.clone()));
    assert!(!submit(&mut form, "users=a&users=evil"));
    assert_eq!(form.errors()["users"], vec!["`evil` not a valid choice"]);
    assert_eq!(members(&fx, &baz), vec![Value::from("a"), Value::from("b")]);
    assert!(matches!(form.save(), Err(ModelFormError::State(_))));
}

#[test]
fn test_set_can_be_emptied() {
    let fx = fixture();
    let baz = saved_baz(&fx, &["a", "b"]);
    let mut form = form(&fx, &fx.baz, Some(baz));
    assert!(submit(&mut form, ""));
    let saved = form.save().unwrap();
    assert!(members(&fx, &saved).is_empty());
}

// ============================================================================
// Relations
// ============================================================================

#[test]
fn test_relation_candidates_are_full_extent() {
    let fx = fixture();
    let form = form(&fx, &fx.qux, None);
    let choices: Vec<(Value, String, bool)> = form
        .collection_field("users")
        .unwrap()
        .iter_choices()
        .map(|c| (c.value, c.label, c.selected))
        .collect();
    assert_eq!(
        choices,
        vec![
            (Value::Int(1), "ann".into(), false),
            (Value::Int(2), "bob".into(), false),
            (Value::Int(3), "cid".into(), false),
            (Value::Int(4), "dee".into(), false),
        ]
    );
}

#[test]
fn test_relation_validation() {
    let fx = fixture();
    let mut form = form(&fx, &fx.qux, None);
    assert!(submit(&mut form, "users=1&users=2&users=3&users=4"));
    assert!(!submit(&mut form, "users=5"));
    assert_eq!(form.errors()["users"], vec!["`5` not a valid choice"]);
    assert!(!submit(&mut form, "users=two"));
    assert_eq!(
        form.errors()["users"],
        vec!["Invalid choice(s): one or more data inputs could not be coerced"]
    );
}

#[test]
fn test_relation_commit_is_add_only() {
    let fx = fixture();
    let mut first = form(&fx, &fx.qux, None);
    assert!(submit(&mut first, "users=1&users=2"));
    let saved = first.save().unwrap();
    assert_eq!(members(&fx, &saved), ints(&[1, 2]));

    let mut second = form(&fx, &fx.qux, Some(saved));
    let selected: Vec<bool> = second
        .collection_field("users")
        .unwrap()
        .iter_choices()
        .map(|c| c.selected)
        .collect();
    assert_eq!(selected, vec![true, true, false, false]);

    assert!(submit(&mut second, "users=1&users=4"));
    let saved = second.save().unwrap();
    assert_eq!(members(&fx, &saved), ints(&[1, 2, 4]));
}

#[test]
fn test_relation_to_deleted_row_fails_at_save() {
    let fx = fixture();
    let mut form = form(&fx, &fx.qux, None);
    assert!(submit(&mut form, "users=3"));
    fx.store.delete("Foo", 3).unwrap();

    let err = form.save().unwrap_err();
    assert!(matches!(err, ModelFormError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
    assert_eq!(form.state(), FormState::Failed);
}

// ============================================================================
// Round-trip through rendering
// ============================================================================

#[test]
fn test_rendered_selection_resubmits_unchanged() {
    let fx = fixture();
    let mut qux = Instance::new(Arc::clone(&fx.qux));
    fx.store.save(&mut qux).unwrap();
    fx.store.add_members(&qux, "users", &ints(&[2, 3])).unwrap();

    for instance in [saved_baz(&fx, &["x", "y"]), qux] {
        let meta = Arc::clone(instance.meta());
        let before = members(&fx, &instance);
        let mut form = form(&fx, &meta, Some(instance));

        let mut data = QueryDict::new();
        for entry in form.collection_field("users").unwrap().iter_choices() {
            if entry.selected {
                data.append("users", &entry.value.to_string());
            }
        }
        form.bind(&data).unwrap();
        assert!(form.validate().unwrap());
        let saved = form.save().unwrap();
        assert_eq!(members(&fx, &saved), before);
    }
}

#[test]
fn test_bound_fields_render_checkbox_group() {
    let fx = fixture();
    let baz = saved_baz(&fx, &["a", "<b>"]);
    let mut form = form(&fx, &fx.baz, Some(baz));
    form.bind(&QueryDict::parse("users=a")).unwrap();

    let fields = form.bound_fields();
    assert_eq!(fields.len(), 1);
    assert_eq!(
        fields[0].render(&HashMap::new()),
        concat!(
            "<ul>",
            r#"<li><label for="id_users_0"><input checked id="id_users_0" name="users" type="checkbox" value="a"> a</label></li>"#,
            r#"<li><label for="id_users_1"><input id="id_users_1" name="users" type="checkbox" value="&lt;b&gt;"> &lt;b&gt;</label></li>"#,
            "</ul>"
        )
    );
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_single_select_override() {
    let fx = fixture();
    let cfg = config(&fx.qux).with_widget("users", WidgetType::Select);
    let mut form = ModelForm::new(&cfg, fx.store.clone(), None).unwrap();

    assert!(!submit(&mut form, "users=1&users=2"));
    assert_eq!(form.errors()["users"], vec!["Select only one choice."]);

    assert!(submit(&mut form, "users=__None"));
    assert!(submit(&mut form, "users=2"));
    let html = form.bound_fields()[0].render(&HashMap::new());
    assert!(html.starts_with(r#"<select name="users" id="id_users">"#));
    assert!(html.contains(r#"<option selected value="2">bob</option>"#));

    let saved = form.save().unwrap();
    assert_eq!(members(&fx, &saved), ints(&[2]));
}

#[test]
fn test_sorted_set_model_requires_exclusion() {
    let fx = fixture();
    let board = fx.store.register(ModelMeta::new(
        "Leaderboard",
        vec![
            FieldDescriptor::new("title", FieldKind::Scalar(ScalarKind::Char)),
            FieldDescriptor::new("ranking", FieldKind::SortedSet),
        ],
    ));

    let err = ModelForm::new(&config(&board), fx.store.clone(), None).unwrap_err();
    assert!(matches!(err, ModelFormError::Unsupported(_)));

    let cfg = config(&board).with_fields(ModelFormFields::Exclude(vec!["ranking".into()]));
    let mut form = ModelForm::new(&cfg, fx.store.clone(), None).unwrap();
    assert!(submit(&mut form, "title=weekly"));
    form.save().unwrap();
}

#[test]
fn test_single_value_override_of_collection_is_rejected() {
    let fx = fixture();
    let baz = saved_baz(&fx, &["a", "b"]);
    let cfg = config(&fx.baz)
        .with_field(FormFieldDef::new("users", FormFieldType::Char { strip: true }));
    let err = ModelForm::new(&cfg, fx.store.clone(), Some(baz.clone())).unwrap_err();
    assert!(matches!(err, ModelFormError::ConfigurationError(_)));
    assert_eq!(members(&fx, &baz), vec![Value::from("a"), Value::from("b")]);

    let cfg = config(&fx.qux).with_field(FormFieldDef::new("users", FormFieldType::Integer));
    let err = ModelForm::new(&cfg, fx.store.clone(), None).unwrap_err();
    assert!(matches!(err, ModelFormError::ConfigurationError(_)));
}

#[test]
fn test_instance_of_other_model_is_rejected() {
    let fx = fixture();
    let baz = saved_baz(&fx, &[]);
    let err = ModelForm::new(&config(&fx.qux), fx.store.clone(), Some(baz)).unwrap_err();
    assert!(matches!(err, ModelFormError::ConfigurationError(_)));
}

// ============================================================================
// Integrity errors
// ============================================================================

#[test]
fn test_integrity_error_attached_to_field() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(!submit(&mut form, "username=ann"));
    assert_eq!(
        form.errors()["username"],
        vec!["Foo with this username already exists."]
    );
    assert!(form.non_field_errors().is_empty());
}

#[test]
fn test_integrity_error_without_field_goes_to_form() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(!submit(&mut form, "username=root"));
    assert_eq!(form.non_field_errors(), ["That name is reserved."]);
    assert!(!form.errors().contains_key("username"));
}

#[test]
fn test_integrity_error_for_excluded_field_goes_to_form() {
    let fx = fixture();
    let cfg = config(&fx.foo).with_fields(ModelFormFields::Exclude(vec!["username".into()]));
    let mut form = ModelForm::new(&cfg, fx.store.clone(), None).unwrap();
    assert!(!submit(&mut form, ""));
    assert_eq!(form.non_field_errors(), ["username: This field cannot be null."]);
}

// ============================================================================
// Save lifecycle
// ============================================================================

#[test]
fn test_save_requires_validate() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(matches!(form.save(), Err(ModelFormError::State(_))));

    form.bind(&QueryDict::parse("username=eve")).unwrap();
    let err = form.save().unwrap_err();
    assert!(matches!(err, ModelFormError::State(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_save_twice_is_state_error() {
    let fx = fixture();
    let mut form = form(&fx, &fx.foo, None);
    assert!(submit(&mut form, "username=eve"));
    form.save().unwrap();
    assert!(matches!(form.save(), Err(ModelFormError::State(_))));

    assert!(form.validate().is_ok());
}
