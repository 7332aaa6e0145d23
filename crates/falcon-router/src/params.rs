//! Captured path parameters.
//!
//! Captures are stored inline for the common case of a handful of
//! placeholders per route, so a match does not allocate a map.

use smallvec::SmallVec;

/// Captures stored before spilling to the heap.
const INLINE_CAPTURES: usize = 4;

/// Named values captured from a request path, in pattern order.
///
/// # Example
///
/// ```rust
/// use falcon_router::Params;
///
/// let mut params = Params::new();
/// params.push("user", "42");
/// params.push("post", "hello-world");
///
/// assert_eq!(params.get("user"), Some("42"));
/// assert_eq!(params.names().collect::<Vec<_>>(), ["user", "post"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    captures: SmallVec<[(String, String); INLINE_CAPTURES]>,
}

impl Params {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.captures.push((name.into(), value.into()));
    }

    /// Sets a capture, replacing an earlier value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.captures.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.captures.push((name, value)),
        }
    }

    /// Returns the value captured under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a value was captured under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the capture names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|(n, _)| n.as_str())
    }

    /// Returns `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.captures.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Returns the number of captures.
    pub fn len(&self) -> usize {
        self.captures.len()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.captures.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = smallvec::IntoIter<[(String, String); INLINE_CAPTURES]>;

    fn into_iter(self) -> Self::IntoIter {
        self.captures.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            captures: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let params = Params::new();
        assert!(params.is_empty());
        assert_eq!(params.get("id"), None);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut params = Params::new();
        params.push("b", "2");
        params.push("a", "1");
        assert_eq!(params.iter().collect::<Vec<_>>(), [("b", "2"), ("a", "1")]);
    }

    #[test]
    fn test_insert_replaces() {
        let mut params = Params::new();
        params.insert("id", "1");
        params.insert("id", "2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn test_contains() {
        let params: Params = [("id", "7")].into_iter().collect();
        assert!(params.contains("id"));
        assert!(!params.contains("name"));
    }

    #[test]
    fn test_spills_past_inline_capacity() {
        let params: Params = (0..9).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        assert_eq!(params.len(), 9);
        assert_eq!(params.get("k8"), Some("v8"));
    }

    #[test]
    fn test_owned_iteration() {
        let params: Params = [("x", "1")].into_iter().collect();
        let owned: Vec<(String, String)> = params.into_iter().collect();
        assert_eq!(owned, [("x".to_string(), "1".to_string())]);
    }
}
