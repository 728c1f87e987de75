//! # modelform-db
//!
//! The narrow model layer consumed by the forms crate. A model is described
//! at runtime by a [`ModelMeta`](model::ModelMeta) listing its
//! [`FieldDescriptor`](fields::FieldDescriptor)s; rows are
//! [`Instance`](model::Instance)s; persistence goes through the
//! [`ModelStore`](store::ModelStore) capability trait.
//!
//! ## Module Overview
//!
//! - [`value`] - The [`Value`](value::Value) enum
//! - [`fields`] - Field kinds and descriptors
//! - [`model`] - Model metadata, instances, and pending collection edits
//! - [`integrity`] - Instance-level integrity checks
//! - [`store`] - The `ModelStore` trait and the `Collection` handle
//! - [`memory`] - An in-memory `ModelStore`

// - struct_excessive_bools: FieldDescriptor mirrors declared field flags
#![allow(clippy::struct_excessive_bools)]

pub mod fields;
pub mod integrity;
pub mod memory;
pub mod model;
pub mod store;
pub mod value;

pub use fields::{FieldDescriptor, FieldKind, ScalarKind};
pub use integrity::{IntegrityReport, IntegrityViolation};
pub use memory::MemoryStore;
pub use model::{Instance, ModelMeta, PendingCollectionEdit};
pub use store::{commit_pending, Collection, ModelStore};
pub use value::Value;
