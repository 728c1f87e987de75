//! Validation pipeline for model forms.
//!
//! 1. Scalar fields are cleaned one by one ([`clean_fields`]).
//! 2. Collection fields are checked against their resolved candidates
//!    ([`validate_collections`]).
//! 3. After the data has been copied onto the instance, integrity failures
//!    reported by the store are attached back to fields
//!    ([`distribute_integrity_errors`]).
//!
//! Errors accumulate rather than short-circuiting, so all validation
//! issues are reported at once.

use std::collections::HashMap;

use modelform_core::{ModelFormError, ModelFormResult, QueryDict};
use modelform_db::{IntegrityReport, Value};

use crate::collection::CollectionField;
use crate::fields::{clean_field_value, FormFieldDef};

/// The error key for messages that belong to no single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Performs field-level validation for all scalar fields.
///
/// For each field definition the last submitted value is cleaned with
/// [`clean_field_value`]; the result lands in `cleaned_data` or `errors`.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    data: &QueryDict,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut HashMap<String, Vec<String>>,
) {
    for field in field_defs.iter().filter(|f| !f.field_type.is_collection()) {
        match clean_field_value(field, data.get(&field.name)) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

/// Validates every collection field.
///
/// Recoverable failures become field errors. A fatal error (a broken
/// contract, not bad input) is returned instead.
pub fn validate_collections(
    collections: &mut [CollectionField],
    errors: &mut HashMap<String, Vec<String>>,
) -> ModelFormResult<()> {
    for field in collections {
        match field.validate() {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => {
                errors
                    .entry(field.name().to_string())
                    .or_default()
                    .push(error_message(&err));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Returns the user-facing message of a recoverable error, without the
/// category prefix of its `Display` form.
pub fn error_message(err: &ModelFormError) -> String {
    match err {
        ModelFormError::Coercion(msg)
        | ModelFormError::InvalidChoice(msg)
        | ModelFormError::Integrity(msg) => msg.clone(),
        ModelFormError::ValidationError(v) => v.message.clone(),
        other => other.to_string(),
    }
}

/// Attaches integrity failures to form errors.
///
/// A violation naming one of `field_names` replaces that field's messages;
/// anything else is appended to [`NON_FIELD_ERRORS`] in its display form.
pub fn distribute_integrity_errors(
    report: &IntegrityReport,
    field_names: &[&str],
    errors: &mut HashMap<String, Vec<String>>,
) {
    let mut replaced: Vec<&str> = Vec::new();
    for violation in &report.violations {
        match violation.field.as_deref() {
            Some(name) if field_names.contains(&name) => {
                let messages = errors.entry(name.to_string()).or_default();
                if !replaced.contains(&name) {
                    messages.clear();
                    replaced.push(name);
                }
                messages.push(violation.message.clone());
            }
            _ => errors
                .entry(NON_FIELD_ERRORS.to_string())
                .or_default()
                .push(violation.to_string()),
        }
    }
}
