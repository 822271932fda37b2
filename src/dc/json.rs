//! JSON request bodies
use std::any::Any;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::dc::token::{DataToken, TokenPath};
use crate::dc::{AsAny, DataContainer};
use crate::error::FormFuzzError;
use crate::headers::Headers;

const JSON_TYPE: &str = "application/json";

/// a JSON body; fuzzable positions are its string and number leaves,
/// addressed by dotted path (`user.roles.0`)
///
/// # Examples
///
/// ```
/// # use formfuzz::dc::{DataContainer, JsonContainer, TokenPath};
/// # use formfuzz::headers::Headers;
/// let mut container =
///     JsonContainer::from_postdata(&Headers::new(), br#"{"name": "x", "age": 30}"#).unwrap();
///
/// container.set_token(&TokenPath::nested("name"), "payload").unwrap();
///
/// assert_eq!(container.to_wire(), br#"{"age":30,"name":"payload"}"#);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JsonContainer {
    value: Value,
    token: Option<DataToken>,
}

impl JsonContainer {
    /// wrap an already-parsed JSON value
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value, token: None }
    }

    /// parse a raw body as JSON
    ///
    /// scalars only count as JSON when the content-type says so; a bare `5`
    /// under some other content-type is somebody else's body
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::JsonParseError`] when the body isn't valid JSON;
    /// [`FormFuzzError::UnmatchedWireFormat`] for scalar bodies without a
    /// JSON content-type
    pub fn from_postdata(headers: &Headers, body: &[u8]) -> Result<Self, FormFuzzError> {
        let value: Value = serde_json::from_slice(body)?;

        let declared_json = headers
            .content_type()
            .is_some_and(|content_type| content_type.to_lowercase().contains("json"));

        if !declared_json && !matches!(value, Value::Object(_) | Value::Array(_)) {
            return Err(FormFuzzError::UnmatchedWireFormat {
                expected: JSON_TYPE,
                reason: "scalar body without a json content-type",
            });
        }

        Ok(Self::new(value))
    }

    /// the wrapped JSON value
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// the value at a dotted path, when one exists
    ///
    /// the empty path addresses the document root, which is itself a leaf
    /// for scalar bodies like `"admin"` or `5`
    #[must_use]
    pub fn leaf(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.value);
        }

        let mut current = &self.value;

        for step in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(step)?,
                Value::Array(items) => items.get(step.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// navigate a dotted path to its leaf; the empty path is the root
    fn leaf_mut(&mut self, path: &str) -> Option<&mut Value> {
        if path.is_empty() {
            return Some(&mut self.value);
        }

        let mut current = &mut self.value;

        for step in path.split('.') {
            current = match current {
                Value::Object(map) => map.get_mut(step)?,
                Value::Array(items) => items.get_mut(step.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }
}

/// collect the dotted path of every string and number leaf, depth-first
fn collect_leaf_paths(value: &Value, prefix: &str, paths: &mut Vec<TokenPath>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaf_paths(child, &path, paths);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let path = if prefix.is_empty() {
                    index.to_string()
                } else {
                    format!("{prefix}.{index}")
                };
                collect_leaf_paths(child, &path, paths);
            }
        }
        Value::String(_) | Value::Number(_) => paths.push(TokenPath::nested(prefix)),
        Value::Bool(_) | Value::Null => {}
    }
}

impl AsAny for JsonContainer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DataContainer for JsonContainer {
    fn get_type(&self) -> &'static str {
        "JSON"
    }

    fn get_headers(&self) -> Headers {
        [("Content-Type", JSON_TYPE)].into_iter().collect()
    }

    fn token_paths(&self) -> Vec<TokenPath> {
        let mut paths = Vec::new();
        collect_leaf_paths(&self.value, "", &mut paths);
        paths
    }

    /// number leaves only accept all-digit payloads, since anything else
    /// would change the leaf's type and break the document's schema
    fn set_token(&mut self, path: &TokenPath, value: &str) -> Result<(), FormFuzzError> {
        let TokenPath::Nested(dotted) = path else {
            error!(%path, "flat token paths can't address a nested body");
            return Err(FormFuzzError::TokenNotFound {
                path: path.to_string(),
            });
        };

        let leaf = self
            .leaf_mut(dotted)
            .ok_or_else(|| FormFuzzError::TokenNotFound {
                path: path.to_string(),
            })?;

        let original = match leaf {
            Value::String(text) => {
                let original = text.clone();
                *leaf = Value::String(value.to_string());
                original
            }
            Value::Number(number) => {
                let original = number.to_string();
                let digits: u64 = value.parse().map_err(|_| FormFuzzError::InvalidParameter {
                    param: value.to_string(),
                    message: "number leaves only accept all-digit payloads",
                })?;

                *leaf = Value::Number(digits.into());
                original
            }
            _ => {
                return Err(FormFuzzError::TokenNotFound {
                    path: path.to_string(),
                })
            }
        };

        self.token = Some(DataToken::new(path.clone(), original, value));

        Ok(())
    }

    fn token(&self) -> Option<&DataToken> {
        self.token.as_ref()
    }

    fn to_wire(&self) -> Vec<u8> {
        self.value.to_string().into_bytes()
    }
}

impl Display for JsonContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_headers() -> Headers {
        [("content-type", "application/json")].into_iter().collect()
    }

    #[test]
    fn token_paths_cover_nested_string_and_number_leaves() {
        let body = br#"{"user": {"name": "x", "age": 30, "admin": true}, "tags": ["a", "b"]}"#;
        let container = JsonContainer::from_postdata(&json_headers(), body).unwrap();

        let paths = container.token_paths();

        assert!(paths.contains(&TokenPath::nested("user.name")));
        assert!(paths.contains(&TokenPath::nested("user.age")));
        assert!(paths.contains(&TokenPath::nested("tags.0")));
        assert!(paths.contains(&TokenPath::nested("tags.1")));
        // booleans aren't fuzzable positions
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn string_leaf_accepts_any_payload() {
        let mut container =
            JsonContainer::from_postdata(&json_headers(), br#"{"a": "b"}"#).unwrap();

        container.set_token(&TokenPath::nested("a"), "<payload>").unwrap();

        assert_eq!(container.to_wire(), br#"{"a":"<payload>"}"#);
        assert_eq!(container.token().unwrap().original_value(), "b");
    }

    #[test]
    fn number_leaf_rejects_non_digit_payloads() {
        let mut container =
            JsonContainer::from_postdata(&json_headers(), br#"{"age": 30}"#).unwrap();

        assert!(container.set_token(&TokenPath::nested("age"), "abc").is_err());
        // the document is untouched after the rejection
        assert_eq!(container.to_wire(), br#"{"age":30}"#);

        container.set_token(&TokenPath::nested("age"), "55").unwrap();
        assert_eq!(container.to_wire(), br#"{"age":55}"#);
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(JsonContainer::from_postdata(&json_headers(), b"a=3&b=2").is_err());
    }

    #[test]
    fn scalar_body_needs_a_json_content_type() {
        assert!(JsonContainer::from_postdata(&Headers::new(), b"5").is_err());
        assert!(JsonContainer::from_postdata(&json_headers(), b"5").is_ok());
    }

    #[test]
    fn root_scalar_document_is_a_single_leaf() {
        let mut container = JsonContainer::from_postdata(&json_headers(), br#""admin""#).unwrap();

        assert_eq!(container.token_paths(), vec![TokenPath::nested("")]);

        container.set_token(&TokenPath::nested(""), "payload").unwrap();

        assert_eq!(container.to_wire(), br#""payload""#);
        assert_eq!(container.token().unwrap().original_value(), "admin");
    }

    #[test]
    fn array_document_is_fuzzable() {
        let mut container =
            JsonContainer::from_postdata(&Headers::new(), br#"["a", "b"]"#).unwrap();

        container.set_token(&TokenPath::nested("1"), "x").unwrap();

        assert_eq!(container.to_wire(), br#"["a","x"]"#);
    }
}
