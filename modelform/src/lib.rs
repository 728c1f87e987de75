//! # modelform
//!
//! Model-backed HTML forms with set and relation field synchronization.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `modelform` to get everything, or on the individual
//! crates for finer-grained control.
//!
//! ```
//! use modelform::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.register(ModelMeta::new(
//!     "Foo",
//!     vec![FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char))],
//! ));
//! let baz = store.register(ModelMeta::new(
//!     "Baz",
//!     vec![FieldDescriptor::new("users", FieldKind::Set)],
//! ));
//!
//! let config = ModelFormConfig::new(baz).with_settings(FormSettings::default());
//! let mut form = ModelForm::new(&config, store, None).unwrap();
//! form.bind(&QueryDict::parse("users=a")).unwrap();
//! // A new instance has no members, so no value can be chosen yet.
//! assert!(!form.validate().unwrap());
//! assert_eq!(form.errors()["users"], vec!["`a` not a valid choice"]);
//! ```

/// Errors, settings, logging, and request-data types.
pub use modelform_core as core;

/// The model layer: descriptors, instances, and stores.
pub use modelform_db as db;

/// Forms, collection adapters, and widgets.
pub use modelform_forms as forms;

pub use chrono;
pub use tracing;

/// The types most applications need.
pub mod prelude {
    pub use std::sync::Arc;

    pub use modelform_core::logging::setup_logging;
    pub use modelform_core::{
        settings_loader, FormSettings, ModelFormError, ModelFormResult, QueryDict, Settings,
        SETTINGS,
    };
    pub use modelform_db::{
        FieldDescriptor, FieldKind, Instance, MemoryStore, ModelMeta, ModelStore, ScalarKind,
        Value,
    };
    pub use modelform_forms::{
        BoundField, ChoiceEntry, CollectionField, FormFieldDef, FormFieldType, FormState,
        ModelForm, ModelFormConfig, ModelFormFields, WidgetType,
    };
}
