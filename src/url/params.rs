//! Ordered, multi-valued URL parameter map and the query codec shared by
//! every URL the bridge classifies or emits.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// The XML-escaped form of the ampersand separator.
pub const ESCAPED_AMPERSAND: &str = "&amp;";

/// Ordered mapping of parameter name to its values.
///
/// Keys keep their first-insertion position; each key holds its values in
/// the order they were appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMap(IndexMap<String, Vec<String>>);

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (without the leading `?`).
    ///
    /// When `escaped` is true, `&amp;` separates pairs.
    pub fn parse_query(query: &str, escaped: bool) -> Self {
        let unescaped;
        let query = if escaped {
            unescaped = query.replace(ESCAPED_AMPERSAND, "&");
            unescaped.as_str()
        } else {
            query
        };

        let mut params = Self::new();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            if name.is_empty() {
                continue;
            }
            params.append(name.into_owned(), value.into_owned());
        }
        params
    }

    /// Serialize to a query string (without the leading `?`).
    pub fn to_query(&self, escaped: bool) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, values) in &self.0 {
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        let query = serializer.finish();
        if escaped {
            query.replace('&', ESCAPED_AMPERSAND)
        } else {
            query
        }
    }

    /// Append one value, keeping any existing values for the name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// Replace all values for a name.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.0.insert(name.into(), values);
    }

    /// Merge another map in; each key present in `other` replaces the
    /// existing values wholesale (last writer wins per key).
    pub fn merge(&mut self, other: &ParameterMap) {
        for (name, values) in &other.0 {
            self.set(name.clone(), values.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value for a name.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.shift_remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.append(name, value);
        }
        params
    }
}
