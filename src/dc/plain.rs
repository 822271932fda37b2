//! opaque request bodies that matched no structured wire format
use std::any::Any;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dc::token::{DataToken, TokenPath};
use crate::dc::{AsAny, DataContainer};
use crate::error::FormFuzzError;
use crate::headers::Headers;

const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// last-resort container: the body's bytes and content-type, preserved
/// verbatim so the request can still be replayed even though nothing in it
/// can be fuzzed
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlainContainer {
    content_type: String,
    payload: Vec<u8>,
}

impl PlainContainer {
    /// wrap raw bytes with their content-type
    #[must_use]
    pub fn new(content_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }

    /// wrap any body at all; this constructor can't fail, which is what
    /// makes it a safe fallback
    #[must_use]
    pub fn from_postdata(headers: &Headers, body: &[u8]) -> Self {
        Self::new(
            headers.content_type().unwrap_or(DEFAULT_CONTENT_TYPE),
            body,
        )
    }

    /// the stored content-type
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

impl AsAny for PlainContainer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DataContainer for PlainContainer {
    fn get_type(&self) -> &'static str {
        "Plain"
    }

    fn get_headers(&self) -> Headers {
        [("Content-Type".to_string(), self.content_type.clone())]
            .into_iter()
            .collect()
    }

    fn supports_tokenization(&self) -> bool {
        false
    }

    fn token_paths(&self) -> Vec<TokenPath> {
        Vec::new()
    }

    fn set_token(&mut self, _path: &TokenPath, _value: &str) -> Result<(), FormFuzzError> {
        Err(FormFuzzError::TokenizationUnsupported {
            container_type: self.get_type(),
        })
    }

    fn token(&self) -> Option<&DataToken> {
        None
    }

    fn to_wire(&self) -> Vec<u8> {
        self.payload.clone()
    }

    fn is_variant_of(&self, other: &dyn DataContainer) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| {
                other.content_type == self.content_type && other.payload == self.payload
            })
    }
}

impl Display for PlainContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_survive_verbatim() {
        let headers: Headers = [("content-type", "foo/bar")].into_iter().collect();
        let container = PlainContainer::from_postdata(&headers, &[0x00, 0xff, 0x42]);

        assert_eq!(container.to_wire(), vec![0x00, 0xff, 0x42]);
        assert_eq!(container.get_headers().content_type(), Some("foo/bar"));
    }

    #[test]
    fn tokenization_is_refused() {
        let mut container = PlainContainer::from_postdata(&Headers::new(), b"a");

        assert!(!container.supports_tokenization());
        assert!(container.token_paths().is_empty());
        assert!(container.set_token(&TokenPath::param("a", 0), "x").is_err());
    }

    #[test]
    fn variant_check_requires_exact_match() {
        let a = PlainContainer::new("text/plain", b"body".to_vec());
        let b = PlainContainer::new("text/plain", b"body".to_vec());
        let c = PlainContainer::new("text/plain", b"other".to_vec());

        assert!(a.is_variant_of(&b));
        assert!(!a.is_variant_of(&c));
    }
}
