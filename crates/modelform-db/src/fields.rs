//! Field kinds and descriptors.
//!
//! A [`FieldDescriptor`] describes one declared field of a model: its
//! [`FieldKind`], default, nullability, fixed choices, and display label.
//! Descriptors are immutable once their [`ModelMeta`](crate::model::ModelMeta)
//! is built.

use std::fmt;

use crate::value::Value;

/// The kind of a scalar (single-valued) field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ScalarKind {
    /// A string.
    Char,
    /// A 64-bit integer.
    Integer,
    /// The integer primary key of a row of another model.
    ForeignKey {
        /// The target model name.
        to: String,
    },
    /// A date without time.
    Date,
    /// A date and time without timezone.
    DateTime,
}

/// The kind of a model field.
///
/// Collection kinds hold many values per instance and live outside the
/// instance's scalar values, in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldKind {
    /// A single value of the given scalar kind.
    Scalar(ScalarKind),
    /// An unordered set of arbitrary string members.
    Set,
    /// A set whose members carry an ordering score.
    SortedSet,
    /// A set of primary keys of rows of another model.
    Relation {
        /// The related model name.
        to: String,
    },
}

impl FieldKind {
    /// Returns `true` for `Set`, `SortedSet`, and `Relation`.
    pub const fn is_collection(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ScalarKind::Char) => write!(f, "char"),
            Self::Scalar(ScalarKind::Integer) => write!(f, "integer"),
            Self::Scalar(ScalarKind::ForeignKey { to }) => write!(f, "foreign key to {to}"),
            Self::Scalar(ScalarKind::Date) => write!(f, "date"),
            Self::Scalar(ScalarKind::DateTime) => write!(f, "datetime"),
            Self::Set => write!(f, "set"),
            Self::SortedSet => write!(f, "sorted set"),
            Self::Relation { to } => write!(f, "relation to {to}"),
        }
    }
}

/// Complete description of one declared model field.
///
/// # Examples
///
/// ```
/// use modelform_db::fields::{FieldDescriptor, FieldKind, ScalarKind};
///
/// let f = FieldDescriptor::new("username", FieldKind::Scalar(ScalarKind::Char))
///     .verbose_name("User name")
///     .unique();
/// assert_eq!(f.label(), "User name");
/// assert!(!f.null);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The attribute name of this field.
    pub name: &'static str,
    /// The kind of this field.
    pub kind: FieldKind,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether the field may be absent (null).
    pub null: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Whether no two rows may share a value.
    pub unique: bool,
    /// Human-readable name; the label falls back to `name` when unset.
    pub verbose_name: Option<String>,
    /// Human-readable help text.
    pub help_text: String,
    /// Allowed values as `(value, display_label)` pairs.
    pub choices: Option<Vec<(Value, String)>>,
}

impl FieldDescriptor {
    /// Creates a non-null, non-unique descriptor without default or choices.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
            null: false,
            default: None,
            unique: false,
            verbose_name: None,
            help_text: String::new(),
            choices: None,
        }
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows the field to be absent.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Marks this field as unique across rows.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value for this field.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the verbose (human-readable) name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = Some(name.into());
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Restricts the field to a fixed list of `(value, label)` choices.
    #[must_use]
    pub fn choices<V: Into<Value>, L: Into<String>>(
        mut self,
        choices: impl IntoIterator<Item = (V, L)>,
    ) -> Self {
        self.choices = Some(
            choices
                .into_iter()
                .map(|(v, l)| (v.into(), l.into()))
                .collect(),
        );
        self
    }

    /// Returns the display label: the verbose name, or the field name.
    pub fn label(&self) -> &str {
        self.verbose_name.as_deref().unwrap_or(self.name)
    }

    /// Returns `true` if this field holds a collection.
    pub const fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }

    /// Returns the model this field points at, for relations and foreign keys.
    pub fn related_model(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation { to } | FieldKind::Scalar(ScalarKind::ForeignKey { to }) => {
                Some(to)
            }
            _ => None,
        }
    }

    /// Returns `true` if `value` has the shape this field stores.
    ///
    /// `Null` is accepted only by nullable fields. Collection fields are
    /// never stored as scalar values and always return `false`.
    pub fn accepts(&self, value: &Value) -> bool {
        match (&self.kind, value) {
            (FieldKind::Scalar(_), Value::Null) => self.null,
            (FieldKind::Scalar(ScalarKind::Char), Value::String(_))
            | (
                FieldKind::Scalar(ScalarKind::Integer | ScalarKind::ForeignKey { .. }),
                Value::Int(_),
            )
            | (FieldKind::Scalar(ScalarKind::Date), Value::Date(_))
            | (FieldKind::Scalar(ScalarKind::DateTime), Value::DateTime(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_name() {
        let f = FieldDescriptor::new("users", FieldKind::Set);
        assert_eq!(f.label(), "users");
        let f = f.verbose_name("Members");
        assert_eq!(f.label(), "Members");
    }

    #[test]
    fn test_builders() {
        let f = FieldDescriptor::new("age", FieldKind::Scalar(ScalarKind::Integer))
            .nullable()
            .default(18)
            .help_text("Years")
            .unique();
        assert!(f.null);
        assert!(f.unique);
        assert_eq!(f.default, Some(Value::Int(18)));
        assert_eq!(f.help_text, "Years");
        assert!(!f.primary_key);
    }

    #[test]
    fn test_choices_builder() {
        let f = FieldDescriptor::new("status", FieldKind::Scalar(ScalarKind::Integer))
            .choices([(1, "Draft"), (2, "Published")]);
        let choices = f.choices.unwrap();
        assert_eq!(choices[1], (Value::Int(2), "Published".to_string()));
    }

    #[test]
    fn test_is_collection() {
        assert!(FieldDescriptor::new("s", FieldKind::Set).is_collection());
        assert!(FieldDescriptor::new("s", FieldKind::SortedSet).is_collection());
        assert!(FieldDescriptor::new("r", FieldKind::Relation { to: "Foo".into() }).is_collection());
        assert!(!FieldDescriptor::new("c", FieldKind::Scalar(ScalarKind::Char)).is_collection());
    }

    #[test]
    fn test_related_model() {
        let r = FieldDescriptor::new("r", FieldKind::Relation { to: "Foo".into() });
        assert_eq!(r.related_model(), Some("Foo"));
        let fk = FieldDescriptor::new(
            "owner",
            FieldKind::Scalar(ScalarKind::ForeignKey { to: "User".into() }),
        );
        assert_eq!(fk.related_model(), Some("User"));
        assert_eq!(FieldDescriptor::new("s", FieldKind::Set).related_model(), None);
    }

    #[test]
    fn test_accepts() {
        let name = FieldDescriptor::new("name", FieldKind::Scalar(ScalarKind::Char));
        assert!(name.accepts(&Value::from("x")));
        assert!(!name.accepts(&Value::Int(1)));
        assert!(!name.accepts(&Value::Null));
        assert!(name.clone().nullable().accepts(&Value::Null));

        let fk = FieldDescriptor::new(
            "owner",
            FieldKind::Scalar(ScalarKind::ForeignKey { to: "User".into() }),
        );
        assert!(fk.accepts(&Value::Int(4)));
        assert!(!FieldDescriptor::new("s", FieldKind::Set).accepts(&Value::from("a")));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FieldKind::Relation { to: "Foo".into() }.to_string(), "relation to Foo");
        assert_eq!(FieldKind::SortedSet.to_string(), "sorted set");
    }
}
