//! Header storage and control-header lookup.
//!
//! [`Headers`] is an ordered multimap that keeps header names exactly as the
//! caller supplied them. Control headers are looked up under their canonical
//! spelling first and their all-lowercase spelling second; no other casing is
//! recognized.

use crate::error::AuthError;

/// Header carrying the account identifier.
pub const API_KEY_HEADER: &str = "X-Sapphire-API-Key";

/// Header carrying the send time in milliseconds since the Unix epoch.
pub const TIMESTAMP_HEADER: &str = "X-Sapphire-Timestamp";

/// Header carrying the base64 HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Sapphire-Signature";

/// Header carrying the optional replay-protection token.
pub const NONCE_HEADER: &str = "X-Sapphire-Nonce";

/// Lower-cased prefix shared by every header that takes part in signing.
pub const SIGNED_HEADER_PREFIX: &str = "x-sapphire-";

/// Ordered `(name, value)` pairs, duplicates preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any existing values under the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every value stored under exactly `name` with a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, value.into()));
    }

    /// Remove every value stored under exactly `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// All values stored under exactly `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over every `(name, value)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no header is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a control header by its canonical name.
    ///
    /// The canonical spelling wins when it carries a non-empty value;
    /// otherwise the lowercase spelling is consulted. An empty value counts
    /// as absent. Returns `Ok(None)` when neither spelling has a value and
    /// [`AuthError::AmbiguousHeader`] when a spelling has more than one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AmbiguousHeader`] for multi-valued control headers.
    pub fn control(&self, canonical: &'static str) -> Result<Option<&str>, AuthError> {
        let lower = canonical.to_ascii_lowercase();
        for name in [canonical, lower.as_str()] {
            let mut values = self.get_all(name);
            let Some(first) = values.next() else {
                continue;
            };
            if values.next().is_some() {
                return Err(AuthError::AmbiguousHeader(canonical));
            }
            if !first.is_empty() {
                return Ok(Some(first));
            }
        }
        Ok(None)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<&http::HeaderMap> for Headers {
    /// Values that are not visible ASCII are skipped.
    fn from(map: &http::HeaderMap) -> Self {
        map.iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_owned(), value.to_owned()))
            })
            .collect()
    }
}
