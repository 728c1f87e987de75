//! Decoded form submissions.
//!
//! [`QueryDict`] wraps [`MultiValueDict`] to hold the key/value pairs of a
//! URL-encoded form body or query string. A web controller parses the raw
//! body once and hands the result to a form's `bind`.

use super::MultiValueDict;

/// A dictionary of submitted form data with multiple values per key.
///
/// # Examples
///
/// ```
/// use modelform_core::QueryDict;
///
/// let qd = QueryDict::parse("users=1&users=3&title=Hello+world");
/// assert_eq!(qd.get("title"), Some("Hello world"));
/// assert_eq!(qd.get_list("users"), Some(&vec!["1".to_string(), "3".to_string()]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: MultiValueDict<String, String>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a URL-encoded string (`"key1=val1&key2=val2"`).
    ///
    /// `+` decodes to a space and percent sequences are decoded as UTF-8
    /// (invalid sequences are replaced, not rejected). A pair without `=`
    /// yields an empty value.
    pub fn parse(query_string: &str) -> Self {
        let mut data = MultiValueDict::new();

        for pair in query_string.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair
                .split_once('=')
                .unwrap_or((pair, ""));
            data.append(percent_decode(key), percent_decode(value));
        }

        Self { data }
    }

    /// Builds a `QueryDict` from already-decoded pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the last value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(&key.to_string()).map(String::as_str)
    }

    /// Returns all values for the given key, in submission order.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get_list(&key.to_string())
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: &str, value: &str) {
        self.data.append(key.to_string(), value.to_string());
    }

    /// Replaces all values for the given key.
    pub fn set_list(&mut self, key: &str, values: Vec<String>) {
        self.data.set_list(key.to_string(), values);
    }

    /// Encodes this `QueryDict` as a URL query string with sorted pairs.
    pub fn urlencode(&self) -> String {
        let mut parts = Vec::new();
        for (key, values) in &self.data {
            for value in values {
                parts.push(format!("{}={}", percent_encode(key), percent_encode(value)));
            }
        }
        parts.sort();
        parts.join("&")
    }

    /// Returns `true` if the key was submitted at all.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(&key.to_string())
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the underlying `MultiValueDict`.
    pub const fn data(&self) -> &MultiValueDict<String, String> {
        &self.data
    }
}

fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

fn percent_encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, percent_encoding::NON_ALPHANUMERIC).to_string()
}
