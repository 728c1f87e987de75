//! Logging integration for the modelform workspace.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-form spans.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "modelform_forms=trace"). An unparseable directive falls back to "info".
/// In debug mode a pretty, human-readable format is used; otherwise a
/// structured JSON format is used.
///
/// Installing a subscriber twice is not an error: the second call is ignored.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span covering one model form's lifecycle.
///
/// Every event emitted while binding, validating, or saving the form should
/// be recorded inside this span so log lines carry the model name.
///
/// # Examples
///
/// ```
/// use modelform_core::logging::form_span;
///
/// let span = form_span("Article");
/// let _guard = span.enter();
/// tracing::debug!("binding submission");
/// ```
pub fn form_span(model: &str) -> tracing::Span {
    tracing::info_span!("model_form", model = model)
}
