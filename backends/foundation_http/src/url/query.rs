//! Query string parsing and building.
//!
//! WHY: Query strings carry key-value parameters that callers want to read
//! and edit as a map, and form bodies reuse the same encoding.
//!
//! WHAT: An ordered parameter map with support for bracketed keys
//! (`a[b]=1`, `list[]=x`) that produce nested maps.
//!
//! HOW: Keys and values are percent-decoded on parse and encoded with the
//! RFC 3986 unreserved set on build. Insertion order is preserved so a
//! parse-then-build round trip keeps the original parameter order.

use std::sync::LazyLock;

use regex::Regex;

use super::encoding;

static BRACKET_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("bracket pattern compiles"));

/// Value stored under a query key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    /// Key present without a value (`?flag` or `?flag=`).
    Empty,
    /// Plain decoded value.
    Value(String),
    /// Nested parameters from bracketed keys.
    Nested(QueryParams),
}

impl QueryValue {
    /// Returns the value as a string slice if this is a plain value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Empty => Some(""),
            Self::Nested(_) => None,
        }
    }

    /// Returns the nested parameters if this is a nested value.
    #[must_use]
    pub fn as_nested(&self) -> Option<&QueryParams> {
        match self {
            Self::Nested(params) => Some(params),
            _ => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Value(value.to_string())
        }
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Value(value)
        }
    }
}

impl From<QueryParams> for QueryValue {
    fn from(value: QueryParams) -> Self {
        Self::Nested(value)
    }
}

/// Ordered map of decoded query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a query string (without the leading `?`).
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_http::url::QueryParams;
    ///
    /// let params = QueryParams::parse("a=1&b[]=x&b[]=y&flag");
    /// assert_eq!(params.get_str("a"), Some("1"));
    /// assert_eq!(params.get("b").unwrap().as_nested().unwrap().get_str("1"), Some("y"));
    /// assert_eq!(params.to_query_string(), "a=1&b%5B0%5D=x&b%5B1%5D=y&flag");
    /// ```
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut params = Self::new();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_key, raw_value) = match pair.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (pair, None),
            };

            let key = encoding::decode(raw_key);
            let value = match raw_value {
                Some(value) if !value.is_empty() => QueryValue::Value(encoding::decode(value)),
                _ => QueryValue::Empty,
            };

            params.insert_key(&key, value);
        }

        params
    }

    /// Inserts a decoded key, expanding `base[a][b]` into nested maps.
    fn insert_key(&mut self, key: &str, value: QueryValue) {
        let groups: Vec<String> = BRACKET_GROUP
            .captures_iter(key)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();

        let base_end = BRACKET_GROUP.find(key).map(|m| m.start());
        match base_end {
            Some(end) if end > 0 && !groups.is_empty() => {
                let base = key[..end].to_string();
                let child = self.nested_mut(base);
                child.insert_path(&groups, value);
            }
            _ => {
                self.insert(key, value);
            }
        }
    }

    fn insert_path(&mut self, path: &[String], value: QueryValue) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };

        let key = if first.is_empty() {
            self.next_index()
        } else {
            first.clone()
        };

        if rest.is_empty() {
            self.insert(key, value);
        } else {
            self.nested_mut(key).insert_path(rest, value);
        }
    }

    /// Next numeric key for `key[]` appends: one past the largest integer key.
    fn next_index(&self) -> String {
        self.entries
            .iter()
            .filter_map(|(key, _)| key.parse::<usize>().ok())
            .max()
            .map_or(0, |max| max + 1)
            .to_string()
    }

    fn nested_mut(&mut self, key: String) -> &mut QueryParams {
        let position = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(position) => {
                if !matches!(self.entries[position].1, QueryValue::Nested(_)) {
                    self.entries[position].1 = QueryValue::Nested(QueryParams::new());
                }
                position
            }
            None => {
                self.entries
                    .push((key, QueryValue::Nested(QueryParams::new())));
                self.entries.len() - 1
            }
        };

        match &mut self.entries[position].1 {
            QueryValue::Nested(inner) => inner,
            _ => unreachable!("entry was just made nested"),
        }
    }

    /// Sets `key` to `value`, keeping the key's position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Option<QueryValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Returns the plain value for `key`; empty values read as `""`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(QueryValue::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Builds the encoded query string (without the leading `?`).
    ///
    /// Keys with no value are emitted bare (`flag`), nested maps use
    /// bracketed keys, and an empty map yields an empty string.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        self.write_pairs(None, &mut pairs);
        pairs.join("&")
    }

    fn write_pairs(&self, prefix: Option<&str>, out: &mut Vec<String>) {
        for (key, value) in &self.entries {
            let name = match prefix {
                Some(prefix) => format!("{prefix}[{key}]"),
                None => key.clone(),
            };

            match value {
                QueryValue::Empty => out.push(encoding::encode(&name, encoding::UNRESERVED)),
                QueryValue::Value(value) => out.push(format!(
                    "{}={}",
                    encoding::encode(&name, encoding::UNRESERVED),
                    encoding::encode(value, encoding::UNRESERVED)
                )),
                QueryValue::Nested(inner) => inner.write_pairs(Some(&name), out),
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_pairs() {
        let params = QueryParams::parse("a=1&b=two%20words&c");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get_str("a"), Some("1"));
        assert_eq!(params.get_str("b"), Some("two words"));
        assert_eq!(params.get("c"), Some(&QueryValue::Empty));
    }

    #[test]
    fn test_parse_keeps_order_and_last_value_wins() {
        let params = QueryParams::parse("z=1&a=2&z=3");
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(params.get_str("z"), Some("3"));
    }

    #[test]
    fn test_parse_nested_brackets() {
        let params = QueryParams::parse("user[name]=bob&user[roles][]=admin&user[roles][]=dev");
        let user = params.get("user").unwrap().as_nested().unwrap();
        assert_eq!(user.get_str("name"), Some("bob"));
        let roles = user.get("roles").unwrap().as_nested().unwrap();
        assert_eq!(roles.get_str("0"), Some("admin"));
        assert_eq!(roles.get_str("1"), Some("dev"));
    }

    #[test]
    fn test_encoded_brackets_are_nested() {
        let params = QueryParams::parse("a%5Bb%5D=1");
        let a = params.get("a").unwrap().as_nested().unwrap();
        assert_eq!(a.get_str("b"), Some("1"));
    }

    #[test]
    fn test_build_encodes_reserved_characters() {
        let params: QueryParams = [("q", "a&b=c d"), ("empty", "")].into_iter().collect();
        assert_eq!(params.to_query_string(), "q=a%26b%3Dc%20d&empty");
    }

    #[test]
    fn test_build_nested() {
        let params = QueryParams::parse("x[y]=1&x[z]=2");
        assert_eq!(params.to_query_string(), "x%5By%5D=1&x%5Bz%5D=2");
        assert_eq!(QueryParams::parse(&params.to_query_string()), params);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = QueryParams::parse("a=1&b=2");
        let old = params.insert("a", "9");
        assert_eq!(old, Some(QueryValue::Value("1".into())));
        assert_eq!(params.to_query_string(), "a=9&b=2");
        assert!(params.remove("a").is_some());
        assert_eq!(params.to_query_string(), "b=2");
    }

    #[test]
    fn test_empty_query() {
        assert!(QueryParams::parse("").is_empty());
        assert!(QueryParams::parse("&&").is_empty());
        assert_eq!(QueryParams::new().to_query_string(), "");
    }
}
