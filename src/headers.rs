//! minimal ordered header map shared by requests and data containers
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ordered collection of HTTP header name/value pairs
///
/// names are matched case-insensitively on lookup; insertion order is
/// preserved for serialization
///
/// # Examples
///
/// ```
/// # use formfuzz::headers::Headers;
/// let mut headers = Headers::new();
/// headers.push("Content-Type", "application/x-www-form-urlencoded");
///
/// assert_eq!(headers.get("content-type"), Some("application/x-www-form-urlencoded"));
/// assert_eq!(headers.get("host"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Headers {
    pairs: Vec<(String, String)>,
}

impl Headers {
    /// create an empty header collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// append a header, keeping any previous ones with the same name
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// replace every header with `name`, or append when none exists
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.pairs.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.pairs.push((name.to_string(), value.into()));
    }

    /// case-insensitive lookup; the first matching header wins
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// shortcut for the `content-type` header
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// iterate over the (name, value) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// number of stored headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// `true` when no headers are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.pairs {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let headers: Headers = [("Content-Type", "text/html")].into_iter().collect();

        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(headers.content_type(), Some("text/html"));
    }

    #[test]
    fn set_replaces_previous_values() {
        let mut headers = Headers::new();
        headers.push("content-length", "10");
        headers.push("Content-Length", "20");

        headers.set("content-length", "30");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("content-length"), Some("30"));
    }
}
