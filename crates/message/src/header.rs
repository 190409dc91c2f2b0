//! Case-insensitive, grammar validated header storage.
//!
//! A [`HeaderCollection`] keeps every header under its *canonical* name, the casing used when
//! the header was first registered, next to a lookup table from the folded (lowercased) name
//! to the canonical one. Lookups are therefore case-insensitive without rebuilding any casing
//! on each call.
//!
//! The collection is copy-on-write: every `with_*` operation returns a new collection and the
//! receiver stays valid and unchanged. Clones share their storage.
//!
//! Names must match the RFC 7230 `token` grammar and values may only contain visible
//! characters, obs-text and inner whitespace:
//!
//! ```not_rust
//! field-name  = token
//! field-value = *( ( %x21-7E / %x80-FF ) [ 1*( SP / HTAB ) ( %x21-7E / %x80-FF ) ] )
//! ```
//!
//! Leading and trailing whitespace of a value is stripped before it is stored.

use std::collections::HashMap;
use std::fmt;

use http::{HeaderName, HeaderValue};
use indexmap::IndexMap;
use triomphe::Arc;

use crate::error::{MessageError, Result};
use crate::utils::{ensure, fold};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Entries {
    /// canonical name => values, in registration order
    values: IndexMap<String, Vec<String>>,
    /// folded name => canonical name
    names: HashMap<String, String>,
}

/// An immutable multi-value header map with case-insensitive lookup.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderCollection {
    inner: Arc<Entries>,
}

impl Default for HeaderCollection {
    fn default() -> Self {
        Self { inner: Arc::new(Entries::default()) }
    }
}

impl HeaderCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from `(name, values)` pairs, merging names that only differ
    /// in case into the first registered one.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidHeader`] if a name or value is malformed.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: IntoHeaderValues,
    {
        let mut entries = Entries::default();
        for (name, values) in pairs {
            let name = name.as_ref();
            let values = validate(name, values)?;
            entries.append(name, values);
        }
        Ok(Self { inner: Arc::new(entries) })
    }

    /// Returns true when both values share the same storage.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.names.contains_key(&fold(name))
    }

    /// Returns every value of `name`, an empty slice when the header is absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.inner.canonical(name).and_then(|canonical| self.inner.values.get(canonical)).map_or(&[], Vec::as_slice)
    }

    /// Returns the values of `name` joined by `", "`.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Iterates `(canonical name, values)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.values.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Replaces every value of `name`, dropping a stale entry that only differs in case.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidHeader`] on a malformed name or value or an empty
    /// list of values.
    pub fn with_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let values = validate(name, values)?;

        let folded = fold(name);
        let unchanged = self.inner.names.get(&folded).is_some_and(|canonical| {
            canonical == name && self.inner.values.get(canonical).is_some_and(|current| *current == values)
        });
        if unchanged {
            return Ok(self.clone());
        }

        let mut entries = Entries::clone(&self.inner);
        if let Some(stale) = entries.names.remove(&folded) {
            entries.values.shift_remove(&stale);
        }
        entries.names.insert(folded, name.to_owned());
        entries.values.insert(name.to_owned(), values);
        Ok(Self { inner: Arc::new(entries) })
    }

    /// Appends values to `name`, creating the header when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Same as [`HeaderCollection::with_header`].
    pub fn with_added_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let values = validate(name, values)?;

        let mut entries = Entries::clone(&self.inner);
        entries.append(name, values);
        Ok(Self { inner: Arc::new(entries) })
    }

    /// Removes `name` whatever its casing; returns this collection when it is absent.
    pub fn without_header(&self, name: &str) -> Self {
        let folded = fold(name);
        if !self.inner.names.contains_key(&folded) {
            return self.clone();
        }

        let mut entries = Entries::clone(&self.inner);
        if let Some(canonical) = entries.names.remove(&folded) {
            entries.values.shift_remove(&canonical);
        }
        Self { inner: Arc::new(entries) }
    }

    /// Sets a single value for `name` and moves the header to the front. An existing entry
    /// keeps its canonical casing.
    pub(crate) fn with_header_first(&self, name: &str, value: &str) -> Result<Self> {
        let values = validate(name, value)?;

        let folded = fold(name);
        let canonical = self.inner.names.get(&folded).cloned().unwrap_or_else(|| name.to_owned());
        let unchanged = self.inner.values.get_index(0).is_some_and(|(first, current)| *first == canonical && *current == values);
        if unchanged {
            return Ok(self.clone());
        }

        let mut entries = Entries::clone(&self.inner);
        entries.values.shift_remove(&canonical);
        entries.values.shift_insert(0, canonical.clone(), values);
        entries.names.insert(folded, canonical);
        Ok(Self { inner: Arc::new(entries) })
    }
}

impl Entries {
    fn canonical(&self, name: &str) -> Option<&String> {
        self.names.get(&fold(name))
    }

    fn append(&mut self, name: &str, values: Vec<String>) {
        let folded = fold(name);
        match self.names.get(&folded) {
            Some(canonical) => {
                if let Some(current) = self.values.get_mut(canonical) {
                    current.extend(values);
                }
            }
            None => {
                self.names.insert(folded, name.to_owned());
                self.values.insert(name.to_owned(), values);
            }
        }
    }
}

impl fmt::Debug for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Validates the name and every value, returning the trimmed values.
fn validate<V: IntoHeaderValues>(name: &str, values: V) -> Result<Vec<String>> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| MessageError::invalid_header(format!("header name {name:?} must be an RFC 7230 token: {e}")))?;

    let values = values.into_header_values();
    ensure!(!values.is_empty(), MessageError::invalid_header(format!("header {name:?} was given an empty list of values")));

    values
        .into_iter()
        .map(|value| {
            HeaderValue::from_bytes(value.as_bytes()).map_err(|e| {
                MessageError::invalid_header(format!("value {value:?} of header {name:?} is not RFC 7230 compatible: {e}"))
            })?;
            Ok(value.trim_matches([' ', '\t']).to_owned())
        })
        .collect()
}

/// Values accepted by the header mutators: a single string or number, or a sequence of
/// strings.
pub trait IntoHeaderValues {
    fn into_header_values(self) -> Vec<String>;
}

impl IntoHeaderValues for &str {
    fn into_header_values(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoHeaderValues for String {
    fn into_header_values(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoHeaderValues for &String {
    fn into_header_values(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoHeaderValues for Vec<String> {
    fn into_header_values(self) -> Vec<String> {
        self
    }
}

impl IntoHeaderValues for Vec<&str> {
    fn into_header_values(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl IntoHeaderValues for &[String] {
    fn into_header_values(self) -> Vec<String> {
        self.to_vec()
    }
}

impl IntoHeaderValues for &[&str] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|value| (*value).to_owned()).collect()
    }
}

impl<const N: usize> IntoHeaderValues for [&str; N] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(|value| (*value).to_owned()).collect()
    }
}

macro_rules! numeric_header_values {
    ($($ty:ty),*) => {
        $(
            impl IntoHeaderValues for $ty {
                fn into_header_values(self) -> Vec<String> {
                    vec![self.to_string()]
                }
            }
        )*
    };
}

numeric_header_values!(u16, u32, u64, usize, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = HeaderCollection::new().with_header("X-Foo", "a").unwrap();

        assert!(headers.contains("x-foo"));
        assert!(headers.contains("X-FOO"));
        assert_eq!(headers.get("x-FOO"), ["a"]);
        assert_eq!(headers.line("x-foo"), "a");
        assert_eq!(headers.iter().next(), Some(("X-Foo", &["a".to_owned()][..])));
    }

    #[test]
    fn line_joins_values() {
        let headers = HeaderCollection::new().with_header("Accept", ["text/html", "application/json"]).unwrap();
        assert_eq!(headers.line("accept"), "text/html, application/json");
        assert_eq!(headers.line("missing"), "");
        assert!(headers.get("missing").is_empty());
    }

    #[test]
    fn with_header_replaces_other_casing() {
        let headers = HeaderCollection::new()
            .with_header("content-type", "text/plain")
            .unwrap()
            .with_header("X-Other", "1")
            .unwrap()
            .with_header("Content-Type", "application/json")
            .unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("CONTENT-TYPE"), ["application/json"]);
        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["X-Other", "Content-Type"]);
    }

    #[test]
    fn with_added_header_keeps_canonical_name() {
        let headers = HeaderCollection::new()
            .with_header("Set-Cookie", "a=1")
            .unwrap()
            .with_added_header("set-cookie", vec!["b=2", "c=3"])
            .unwrap()
            .with_added_header("X-New", "x")
            .unwrap();

        assert_eq!(headers.get("set-cookie"), ["a=1", "b=2", "c=3"]);
        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Set-Cookie", "X-New"]);
    }

    #[test]
    fn without_header_removes_any_casing() {
        let headers = HeaderCollection::new().with_header("X-Foo", "a").unwrap();
        let removed = headers.without_header("x-FOO");

        assert!(!removed.contains("X-Foo"));
        assert!(removed.is_empty());
        assert!(headers.contains("X-Foo"));

        let untouched = removed.without_header("X-Foo");
        assert!(HeaderCollection::ptr_eq(&removed, &untouched));
    }

    #[test]
    fn receiver_is_never_changed() {
        let first = HeaderCollection::new();
        let second = first.with_header("A", "1").unwrap();

        assert!(first.get("A").is_empty());
        assert_eq!(second.get("A"), ["1"]);
    }

    #[test]
    fn identical_with_header_keeps_instance() {
        let headers = HeaderCollection::new().with_header("X-Foo", ["a", "b"]).unwrap();
        assert!(HeaderCollection::ptr_eq(&headers, &headers.with_header("X-Foo", ["a", "b"]).unwrap()));
        assert!(!HeaderCollection::ptr_eq(&headers, &headers.with_header("x-foo", ["a", "b"]).unwrap()));
    }

    #[test]
    fn values_are_trimmed() {
        let headers = HeaderCollection::new().with_header("X-Foo", " \t a  b \t").unwrap();
        assert_eq!(headers.get("x-foo"), ["a  b"]);
    }

    #[test]
    fn numbers_are_accepted() {
        let headers = HeaderCollection::new().with_header("Content-Length", 42_u64).unwrap();
        assert_eq!(headers.line("content-length"), "42");
    }

    #[test]
    fn obs_text_is_accepted() {
        let headers = HeaderCollection::new().with_header("X-Name", "café").unwrap();
        assert_eq!(headers.line("x-name"), "café");
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", "X Foo", "X-Foo:", "Føø", "a\r\nb", "(x)"] {
            let err = HeaderCollection::new().with_header(name, "v").unwrap_err();
            assert!(matches!(err, MessageError::InvalidHeader { .. }), "{name:?}");
        }
        assert!(HeaderCollection::new().with_header("!#$%&'*+-.^_`|~09az", "v").is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        for value in ["a\r\nb", "a\nb", "nul\0", "del\x7f"] {
            let err = HeaderCollection::new().with_header("X-Foo", value).unwrap_err();
            assert!(matches!(err, MessageError::InvalidHeader { .. }), "{value:?}");
        }
    }

    #[test]
    fn empty_values_are_rejected() {
        let err = HeaderCollection::new().with_header("X-Foo", Vec::<String>::new()).unwrap_err();
        assert!(err.is_invalid_argument());
        let err = HeaderCollection::new().with_added_header("X-Foo", Vec::<&str>::new()).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn from_pairs_merges_casing() {
        let headers =
            HeaderCollection::from_pairs([("Accept", vec!["a"]), ("accept", vec!["b"]), ("Host", vec!["x"])]).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("ACCEPT"), ["a", "b"]);
    }

    #[test]
    fn header_first_moves_entry() {
        let headers = HeaderCollection::from_pairs([("Accept", "a"), ("host", "old")]).unwrap();
        let headers = headers.with_header_first("Host", "example.com").unwrap();

        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["host", "Accept"]);
        assert_eq!(headers.get("Host"), ["example.com"]);
    }
}
