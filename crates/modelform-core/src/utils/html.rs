//! HTML escaping and attribute rendering.

/// Escapes HTML special characters in a string.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their HTML entity equivalents.
///
/// # Examples
///
/// ```
/// use modelform_core::utils::escape_html;
///
/// assert_eq!(escape_html("<b>\"Tom\" & Jerry</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; Jerry&lt;/b&gt;");
/// ```
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Renders attributes as ` key="value"` pairs, sorted by key.
///
/// A `None` value renders a bare boolean attribute (` checked`). Values are
/// escaped; keys are emitted as given.
///
/// # Examples
///
/// ```
/// use modelform_core::utils::html_params;
///
/// let attrs = [("type", Some("checkbox")), ("checked", None), ("id", Some("id_x_0"))];
/// assert_eq!(html_params(&attrs), r#" checked id="id_x_0" type="checkbox""#);
/// ```
pub fn html_params(attrs: &[(&str, Option<&str>)]) -> String {
    let mut sorted: Vec<&(&str, Option<&str>)> = attrs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (key, value) in sorted {
        out.push(' ');
        out.push_str(key);
        if let Some(v) = value {
            out.push_str("=\"");
            out.push_str(&escape_html(v));
            out.push('"');
        }
    }
    out
}
