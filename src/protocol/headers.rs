//! User-supplied headers attached to every push request.
//!
//! Each header is configured as one specification string:
//!
//! | Specification | Header name | Header value |
//! |---------------|-------------|--------------|
//! | `Authorization=Bearer abc` | `authorization` | `Bearer abc` |
//! | `X-Debug` | `x-debug` | empty |
//! | `X-Query=a=b` | `x-query` | `a=b` |
//!
//! Only the first `=` separates name and value, so values may contain `=`
//! (base64 tokens, query strings).
//!
//! A [`HeaderSet`] is filled while the configuration is read and never
//! changes afterwards. Appending never fails: every entry is kept verbatim,
//! including ones that are not legal HTTP headers. Those only fail when the
//! set is applied to a request, which then is not sent.
//!
//! Applying the set replaces any header of the same name that is already on
//! the request, so a configured `Content-Type` wins over the default one.
//!
//! # Examples
//!
//! ```
//! use pubsub_push::protocol::HeaderSet;
//! use http::HeaderMap;
//!
//! let mut set = HeaderSet::new();
//! set.push("Authorization=Bearer abc");
//! set.push("X-Debug");
//!
//! let mut headers = HeaderMap::new();
//! set.apply(&mut headers).unwrap();
//! assert_eq!(headers["authorization"], "Bearer abc");
//! assert_eq!(headers["x-debug"], "");
//! ```

use crate::error::{PushError, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;

/// One parsed header specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    /// Header name, as written by the user
    pub name: String,
    /// Header value, empty for a bare name
    pub value: String,
}

impl HeaderSpec {
    /// Convert into typed header parts.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Delivery`] when the name is not an HTTP token or
    /// the value contains characters a header cannot carry.
    pub fn to_header(&self) -> Result<(HeaderName, HeaderValue)> {
        let name = HeaderName::from_bytes(self.name.as_bytes()).map_err(|_| {
            PushError::Delivery(format!("Invalid header name: '{}'", self.name))
        })?;
        let value = HeaderValue::from_str(&self.value).map_err(|_| {
            PushError::Delivery(format!("Invalid value for header '{}'", self.name))
        })?;
        Ok((name, value))
    }
}

/// Parse a header specification string.
///
/// Splits on the first `=`. A string without `=` is a header with an empty
/// value.
///
/// # Examples
///
/// ```
/// use pubsub_push::protocol::parse_header_spec;
///
/// let spec = parse_header_spec("Auth=api-key");
/// assert_eq!(spec.name, "Auth");
/// assert_eq!(spec.value, "api-key");
///
/// let spec = parse_header_spec("X-Empty");
/// assert_eq!(spec.value, "");
/// ```
pub fn parse_header_spec(spec: &str) -> HeaderSpec {
    let (name, value) = spec.split_once('=').unwrap_or((spec, ""));
    HeaderSpec {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Ordered list of header specifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<String>,
}

impl HeaderSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one specification. Entries are kept verbatim.
    pub fn push(&mut self, spec: impl Into<String>) {
        self.entries.push(spec.into());
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, spec: impl Into<String>) -> Self {
        self.push(spec);
        self
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header was configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Parsed entries in insertion order.
    pub fn specs(&self) -> impl Iterator<Item = HeaderSpec> + '_ {
        self.iter().map(parse_header_spec)
    }

    /// Set every configured header on `headers`.
    ///
    /// Existing values with the same name are replaced; when the set names a
    /// header twice, the later entry wins. Applying the same set twice leaves
    /// the map unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Delivery`] on the first entry that cannot be put
    /// on the wire. `headers` may then be partially updated.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        for spec in self.specs() {
            let (name, value) = spec.to_header()?;
            headers.insert(name, value);
        }
        Ok(())
    }

    /// Build a fresh header map holding only the configured headers.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.len());
        self.apply(&mut headers)?;
        Ok(headers)
    }
}

impl fmt::Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entries.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        HeaderSet {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for HeaderSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.entries.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{headers::CONTENT_TYPE, media_types::APPLICATION_JSON};

    #[test]
    fn test_push_keeps_order() {
        let mut set = HeaderSet::new();
        set.push("Content-type=application/json");
        set.push("Auth=api-key");

        assert_eq!(set.len(), 2);
        let entries: Vec<&str> = set.iter().collect();
        assert_eq!(entries, vec!["Content-type=application/json", "Auth=api-key"]);
    }

    #[test]
    fn test_display() {
        let set = HeaderSet::new().with("Content-type=application/json");
        assert_eq!(set.to_string(), "Content-type=application/json");

        let set = set.with("Auth=api-key");
        assert_eq!(set.to_string(), "Content-type=application/json, Auth=api-key");
        assert_eq!(HeaderSet::new().to_string(), "");
    }

    #[test]
    fn test_parse_key_value() {
        let spec = parse_header_spec("k=v");
        assert_eq!(spec.name, "k");
        assert_eq!(spec.value, "v");
    }

    #[test]
    fn test_parse_bare_key() {
        let spec = parse_header_spec("k");
        assert_eq!(spec.name, "k");
        assert_eq!(spec.value, "");
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let spec = parse_header_spec("X-Token=abc==");
        assert_eq!(spec.name, "X-Token");
        assert_eq!(spec.value, "abc==");

        let spec = parse_header_spec("k=");
        assert_eq!(spec.name, "k");
        assert_eq!(spec.value, "");
    }

    #[test]
    fn test_apply() {
        let set: HeaderSet = ["k=v", "bare", "X-Query=a=b"].into_iter().collect();
        let headers = set.to_header_map().unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers["k"], "v");
        assert_eq!(headers["bare"], "");
        assert_eq!(headers["x-query"], "a=b");
    }

    #[test]
    fn test_apply_overrides_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));

        let set = HeaderSet::new().with("Content-Type=application/cloudevents+json");
        set.apply(&mut headers).unwrap();

        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers[CONTENT_TYPE], "application/cloudevents+json");
    }

    #[test]
    fn test_apply_later_entry_wins() {
        let set = HeaderSet::new().with("X-Env=staging").with("x-env=prod");
        let headers = set.to_header_map().unwrap();
        assert_eq!(headers.get_all("x-env").iter().count(), 1);
        assert_eq!(headers["x-env"], "prod");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let set = HeaderSet::new().with("A=1").with("B");
        let mut headers = HeaderMap::new();
        set.apply(&mut headers).unwrap();
        let first = headers.clone();
        set.apply(&mut headers).unwrap();
        assert_eq!(headers, first);
    }

    #[test]
    fn test_malformed_entries_are_kept() {
        let mut set = HeaderSet::new();
        set.push("Bad Name=value");
        set.push("=value");
        set.push("");

        assert_eq!(set.len(), 3);
        let specs: Vec<HeaderSpec> = set.specs().collect();
        assert_eq!(specs[0].name, "Bad Name");
        assert_eq!(specs[1].name, "");
        assert_eq!(specs[1].value, "value");
        assert_eq!(specs[2].name, "");
        assert_eq!(specs[2].value, "");
        assert_eq!(set.to_string(), "Bad Name=value, =value, ");
    }

    #[test]
    fn test_invalid_header_name_fails_on_apply() {
        let set = HeaderSet::new().with("Bad Name=value");
        let err = set.to_header_map().unwrap_err();
        assert!(matches!(err, PushError::Delivery(_)));
        assert!(!err.is_fatal());

        let err = HeaderSet::new().with("=value").to_header_map().unwrap_err();
        assert!(matches!(err, PushError::Delivery(_)));
    }

    #[test]
    fn test_invalid_header_value_fails_on_apply() {
        let set = HeaderSet::new().with("X-Bad=line\nbreak");
        assert!(matches!(
            set.to_header_map().unwrap_err(),
            PushError::Delivery(_)
        ));
    }

    #[test]
    fn test_extend() {
        let mut set = HeaderSet::new();
        set.extend(vec!["A=1".to_string(), "B=2".to_string()]);
        assert_eq!(set.specs().count(), 2);
        assert!(!set.is_empty());
    }
}
