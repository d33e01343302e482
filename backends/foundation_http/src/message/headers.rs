//! Ordered, case-insensitive, multi-valued HTTP header map.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Deserializer};

#[derive(Clone, Debug, PartialEq, Eq)]
struct HeaderEntry {
    /// Lowercased name used for lookup.
    name: String,
    values: Vec<String>,
}

/// Ordered mapping from header name to one or more values.
///
/// WHY: Header names compare case-insensitively but some headers repeat
/// (`Set-Cookie`, `Via`), and the wire form should keep the order headers
/// were added in.
///
/// WHAT: `add` folds a value into any existing list, `set` replaces it, and
/// `set_default` only fills a missing header. Serialization writes one
/// `Title-Case-Name: value` line per value followed by a blank line.
///
/// HOW: Stores entries in insertion order with lowercased names. Lookups are
/// linear, which beats hashing for the few dozen headers a message carries.
///
/// # Examples
///
/// ```
/// use foundation_http::message::HeaderCollection;
///
/// let mut headers = HeaderCollection::new();
/// headers.add("X-Foo", "bar");
/// headers.add("x-foo", "baz");
/// assert_eq!(headers.get("X-FOO").unwrap(), ["bar", "baz"]);
///
/// headers.set("X-Foo", "qux");
/// assert_eq!(headers.first("x-foo"), Some("qux"));
/// assert_eq!(headers.to_string(), "X-Foo: qux\r\n\r\n");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderCollection {
    entries: Vec<HeaderEntry>,
}

impl HeaderCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Appends `value` to `name`, creating the header if it is missing.
    pub fn add(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        let value = sanitize(value.into());
        match self.position(name) {
            Some(index) => self.entries[index].values.push(value),
            None => self.entries.push(HeaderEntry {
                name: name.to_ascii_lowercase(),
                values: vec![value],
            }),
        }
    }

    /// Appends every value in `values` to `name`.
    pub fn add_all<I, V>(&mut self, name: impl AsRef<str>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.add(name.as_ref(), value);
        }
    }

    /// Replaces all values of `name` with `value`, keeping the header's position.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        let value = sanitize(value.into());
        match self.position(name) {
            Some(index) => self.entries[index].values = vec![value],
            None => self.entries.push(HeaderEntry {
                name: name.to_ascii_lowercase(),
                values: vec![value],
            }),
        }
    }

    /// Sets `name` only when it is absent. Returns true if the value was inserted.
    pub fn set_default(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> bool {
        if self.contains(name.as_ref()) {
            return false;
        }
        self.set(name, value);
        true
    }

    /// Returns every value stored for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name)
            .map(|index| self.entries[index].values.as_slice())
    }

    /// Returns the first value stored for `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns all values for `name` joined with `", "`.
    #[must_use]
    pub fn get_joined(&self, name: &str) -> Option<String> {
        self.get(name).map(|values| values.join(", "))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns true if any comma-separated element of `name` equals `token`,
    /// ignoring ASCII case. Used for `Connection` and `Transfer-Encoding`.
    #[must_use]
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|values| {
            values
                .iter()
                .flat_map(|value| value.split(','))
                .any(|element| element.trim().eq_ignore_ascii_case(token))
        })
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let index = self.position(name)?;
        Some(self.entries.remove(index).values)
    }

    /// Applies `add` for every value in `other`.
    pub fn merge_with(&mut self, other: &HeaderCollection) {
        for (name, values) in other.iter() {
            self.add_all(name, values.iter().cloned());
        }
    }

    /// Applies `set_default` for every header in `other`, so headers already
    /// present here win.
    pub fn merge_missing(&mut self, other: &HeaderCollection) {
        for (name, values) in other.iter() {
            if !self.contains(name) {
                self.add_all(name, values.iter().cloned());
            }
        }
    }

    /// Iterates `(lowercased name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the wire form (header lines plus the terminating blank line).
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.to_string().as_bytes())
    }
}

/// Converts a lowercase header name to `Title-Case`.
#[must_use]
pub fn title_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if upper_next {
            result.push(c.to_ascii_uppercase());
        } else {
            result.push(c.to_ascii_lowercase());
        }
        upper_next = c == '-';
    }
    result
}

/// Line breaks inside a value would end the header early on the wire.
fn sanitize(value: String) -> String {
    if value.contains(['\r', '\n']) {
        value.replace(['\r', '\n'], " ")
    } else {
        value
    }
}

impl fmt::Display for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let name = title_case(&entry.name);
            for value in &entry.values {
                write!(f, "{name}: {value}\r\n")?;
            }
        }
        f.write_str("\r\n")
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderCollection
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HeaderCollection::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for HeaderCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
        let mut headers = HeaderCollection::new();
        for (name, values) in map {
            match values {
                OneOrMany::One(value) => headers.add(&name, value),
                OneOrMany::Many(values) => headers.add_all(&name, values),
            }
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut headers = HeaderCollection::new();
        headers.add("X-Foo", "bar");
        assert_eq!(headers.first("x-foo"), Some("bar"));
        assert_eq!(headers.first("X-FOO"), Some("bar"));
        assert!(headers.contains("x-FoO"));
    }

    #[test]
    fn test_add_accumulates_and_set_replaces() {
        let mut headers = HeaderCollection::new();
        headers.add("X-Foo", "bar");
        headers.add("X-Foo", "baz");
        assert_eq!(headers.get("x-foo").unwrap(), ["bar", "baz"]);
        assert_eq!(headers.get_joined("x-foo").as_deref(), Some("bar, baz"));

        headers.set("x-foo", "only");
        assert_eq!(headers.get("X-Foo").unwrap(), ["only"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_empty_serializes_to_crlf() {
        assert_eq!(HeaderCollection::new().to_string(), "\r\n");
    }

    #[test]
    fn test_serialization_title_cases_and_terminates() {
        let mut headers = HeaderCollection::new();
        headers.add("content-type", "text/plain");
        let wire = headers.to_string();
        assert!(wire.starts_with("Content-Type"));
        assert!(wire.ends_with("\r\n\r\n"));
        assert_eq!(wire, "Content-Type: text/plain\r\n\r\n");
    }

    #[test]
    fn test_multi_value_emits_one_line_per_value() {
        let headers: HeaderCollection = [("set-cookie", "a=1"), ("Set-Cookie", "b=2")]
            .into_iter()
            .collect();
        assert_eq!(headers.to_string(), "Set-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n");
    }

    #[test]
    fn test_set_default_does_not_clobber() {
        let mut headers = HeaderCollection::new();
        headers.set("Accept", "text/html");
        assert!(!headers.set_default("accept", "*/*"));
        assert!(headers.set_default("User-Agent", "x"));
        assert_eq!(headers.first("accept"), Some("text/html"));
    }

    #[test]
    fn test_merge_with_adds_values() {
        let mut left: HeaderCollection = [("A", "1")].into_iter().collect();
        let right: HeaderCollection = [("a", "2"), ("b", "3")].into_iter().collect();
        left.merge_with(&right);
        assert_eq!(left.get("a").unwrap(), ["1", "2"]);
        assert_eq!(left.first("b"), Some("3"));
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut left: HeaderCollection = [("A", "1")].into_iter().collect();
        let right: HeaderCollection = [("a", "2"), ("b", "3")].into_iter().collect();
        left.merge_missing(&right);
        assert_eq!(left.get("a").unwrap(), ["1"]);
        assert_eq!(left.first("b"), Some("3"));
    }

    #[test]
    fn test_has_token() {
        let mut headers = HeaderCollection::new();
        headers.add("Transfer-Encoding", "gzip, Chunked");
        assert!(headers.has_token("transfer-encoding", "chunked"));
        assert!(!headers.has_token("transfer-encoding", "deflate"));
        assert!(!headers.has_token("connection", "close"));
    }

    #[test]
    fn test_remove_and_order() {
        let mut headers: HeaderCollection = [("b", "1"), ("a", "2"), ("c", "3")]
            .into_iter()
            .collect();
        assert_eq!(headers.remove("A"), Some(vec!["2".to_string()]));
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_values_cannot_inject_lines() {
        let mut headers = HeaderCollection::new();
        headers.set("X-Test", "a\r\nInjected: yes");
        assert_eq!(headers.to_string(), "X-Test: a  Injected: yes\r\n\r\n");
    }

    #[test]
    fn test_write_to() {
        let headers: HeaderCollection = [("host", "example.org")].into_iter().collect();
        let mut out = Vec::new();
        headers.write_to(&mut out).unwrap();
        assert_eq!(out, b"Host: example.org\r\n\r\n");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let headers: HeaderCollection =
            toml::from_str("x-one = \"1\"\nx-many = [\"a\", \"b\"]\n").unwrap();
        assert_eq!(headers.first("X-One"), Some("1"));
        assert_eq!(headers.get("X-Many").unwrap(), ["a", "b"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("content-length"), "Content-Length");
        assert_eq!(title_case("X-REQUEST-ID"), "X-Request-Id");
        assert_eq!(title_case("te"), "Te");
    }
}
