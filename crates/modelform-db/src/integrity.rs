//! Instance-level integrity checks.
//!
//! After a form copies its data onto an instance, the store's
//! `check_integrity` decides whether the instance may be saved. The checks
//! here need no access to other rows; stores add the ones that do
//! (uniqueness, foreign-key existence).

use std::collections::HashMap;
use std::fmt;

use crate::model::Instance;
use crate::value::Value;

/// One integrity failure, attributed to a field when possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityViolation {
    /// The offending field, or `None` for a model-wide failure.
    pub field: Option<String>,
    /// The user-facing message.
    pub message: String,
}

impl IntegrityViolation {
    /// Creates a violation attributed to a field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a model-wide violation.
    pub fn model(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// The outcome of an integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Every violation found, in check order.
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    /// Returns `true` when nothing was violated.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Records a violation.
    pub fn push(&mut self, violation: IntegrityViolation) {
        self.violations.push(violation);
    }

    /// Groups messages by field; model-wide messages are keyed by `None`.
    pub fn by_field(&self) -> HashMap<Option<&str>, Vec<&str>> {
        let mut grouped: HashMap<Option<&str>, Vec<&str>> = HashMap::new();
        for v in &self.violations {
            grouped
                .entry(v.field.as_deref())
                .or_default()
                .push(v.message.as_str());
        }
        grouped
    }
}

/// Runs the checks that need only the instance itself:
///
/// - every non-null scalar field holds a value
/// - every scalar value has the shape of its field kind
/// - every value of a fixed-choice field is one of the choices
/// - the model-level checks declared on the metadata
pub fn check_instance(instance: &Instance) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    let meta = instance.meta();

    for (name, value) in instance.scalar_values() {
        let Some(field) = meta.field(name) else {
            continue;
        };
        if value.is_null() {
            if !field.null {
                report.push(IntegrityViolation::field(name, "This field cannot be null."));
            }
            continue;
        }
        if !field.accepts(&value) {
            report.push(IntegrityViolation::field(
                name,
                format!("Expected a {} value.", field.kind),
            ));
            continue;
        }
        if let Some(choices) = &field.choices {
            if !choices.iter().any(|(v, _)| v == &value) {
                report.push(IntegrityViolation::field(
                    name,
                    format!("Value {} is not a valid choice.", quoted(&value)),
                ));
            }
        }
    }

    for check in &meta.checks {
        if let Err(violation) = check(instance) {
            report.push(violation);
        }
    }

    report
}

fn quoted(value: &Value) -> String {
    format!("'{value}'")
}
