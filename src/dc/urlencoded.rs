//! `application/x-www-form-urlencoded` request bodies
use std::any::Any;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::error;
use url::form_urlencoded;

use crate::dc::token::{DataToken, TokenPath};
use crate::dc::{AsAny, DataContainer};
use crate::error::FormFuzzError;
use crate::fields::{FormField, InputType};
use crate::form_params::{FormParameters, DEFAULT_FORM_ENCODING};
use crate::headers::Headers;

/// a url-encoded form body: `a=1&b=2&b=3`
///
/// wraps [`FormParameters`] so repeated names and field ordering survive a
/// decode / re-encode round trip untouched
///
/// # Examples
///
/// ```
/// # use formfuzz::dc::{DataContainer, URLEncodedForm};
/// # use formfuzz::headers::Headers;
/// let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
///     .into_iter()
///     .collect();
///
/// let form = URLEncodedForm::from_postdata(&headers, b"a=3&b=2").unwrap();
///
/// assert_eq!(form.to_wire(), b"a=3&b=2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct URLEncodedForm {
    params: FormParameters,
    token: Option<DataToken>,
}

impl URLEncodedForm {
    /// wrap an already-parsed form
    #[must_use]
    pub const fn new(params: FormParameters) -> Self {
        Self {
            params,
            token: None,
        }
    }

    /// parse a raw url-encoded body into a form
    ///
    /// a declared content-type must mention `urlencoded`; with no
    /// content-type at all, the body is accepted when it at least contains a
    /// `=` separator
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::UnmatchedWireFormat`] when the content-type or body
    /// shape says this isn't a url-encoded form
    pub fn from_postdata(headers: &Headers, body: &[u8]) -> Result<Self, FormFuzzError> {
        match headers.content_type() {
            Some(content_type) => {
                if !content_type.to_lowercase().contains("urlencoded") {
                    return Err(FormFuzzError::UnmatchedWireFormat {
                        expected: DEFAULT_FORM_ENCODING,
                        reason: "content-type doesn't declare a url-encoded body",
                    });
                }
            }
            None => {
                if !body.contains(&b'=') {
                    return Err(FormFuzzError::UnmatchedWireFormat {
                        expected: DEFAULT_FORM_ENCODING,
                        reason: "no content-type and no key=value separator in the body",
                    });
                }
            }
        }

        if body.is_empty() {
            return Err(FormFuzzError::UnmatchedWireFormat {
                expected: DEFAULT_FORM_ENCODING,
                reason: "empty body",
            });
        }

        let mut params = FormParameters::new();
        params.set_method("POST");

        for (name, value) in form_urlencoded::parse(body) {
            params.add_form_field(FormField::Generic {
                input_type: InputType::Text,
                name: name.into_owned(),
                value: value.into_owned(),
                autocomplete: true,
            });
        }

        Ok(Self::new(params))
    }
}

impl AsAny for URLEncodedForm {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DataContainer for URLEncodedForm {
    fn get_type(&self) -> &'static str {
        "URL encoded form"
    }

    fn get_headers(&self) -> Headers {
        [("Content-Type", DEFAULT_FORM_ENCODING)].into_iter().collect()
    }

    fn token_paths(&self) -> Vec<TokenPath> {
        self.params
            .occurrences()
            .filter(|(_, _, field)| field.input_type() != InputType::File)
            .map(|(name, index, _)| TokenPath::param(name, index))
            .collect()
    }

    fn set_token(&mut self, path: &TokenPath, value: &str) -> Result<(), FormFuzzError> {
        let TokenPath::Param { name, index } = path else {
            error!(%path, "nested token paths can't address a flat form");
            return Err(FormFuzzError::TokenNotFound {
                path: path.to_string(),
            });
        };

        let original = self
            .params
            .fields(name)
            .and_then(|fields| fields.get(*index))
            .map(|field| field.value().into_owned())
            .ok_or_else(|| FormFuzzError::TokenNotFound {
                path: path.to_string(),
            })?;

        self.params.set_value(name, *index, value)?;
        self.token = Some(DataToken::new(path.clone(), original, value));

        Ok(())
    }

    fn token(&self) -> Option<&DataToken> {
        self.token.as_ref()
    }

    fn form_params(&self) -> Option<&FormParameters> {
        Some(&self.params)
    }

    fn form_params_mut(&mut self) -> Option<&mut FormParameters> {
        Some(&mut self.params)
    }

    fn to_wire(&self) -> Vec<u8> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        for (name, value) in self.params.wire_pairs() {
            serializer.append_pair(name, &value);
        }

        serializer.finish().into_bytes()
    }
}

impl Display for URLEncodedForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_wire()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urlencoded_headers() -> Headers {
        [("content-type", "application/x-www-form-urlencoded")]
            .into_iter()
            .collect()
    }

    #[test]
    fn decode_encode_round_trip_preserves_repeated_names() {
        let form = URLEncodedForm::from_postdata(&urlencoded_headers(), b"id=1&id=2&b=x").unwrap();

        assert_eq!(form.to_wire(), b"id=1&id=2&b=x");
        assert_eq!(
            form.form_params().unwrap().values("id").unwrap(),
            vec!["1", "2"]
        );
    }

    #[test]
    fn mismatched_content_type_is_rejected() {
        let headers: Headers = [("content-type", "foo/bar")].into_iter().collect();

        assert!(URLEncodedForm::from_postdata(&headers, b"a").is_err());
    }

    #[test]
    fn missing_content_type_requires_a_separator() {
        let headers = Headers::new();

        assert!(URLEncodedForm::from_postdata(&headers, b"a=3").is_ok());
        assert!(URLEncodedForm::from_postdata(&headers, b"plain text").is_err());
    }

    #[test]
    fn set_token_replaces_one_occurrence() {
        let mut form =
            URLEncodedForm::from_postdata(&urlencoded_headers(), b"id=1&id=2").unwrap();

        form.set_token(&TokenPath::param("id", 1), "payload").unwrap();

        assert_eq!(form.to_wire(), b"id=1&id=payload");
        assert_eq!(form.token().unwrap().original_value(), "2");
    }

    #[test]
    fn wire_encoding_uses_standard_percent_rules() {
        let mut params = FormParameters::new();
        params.add_form_field(FormField::Generic {
            input_type: InputType::Text,
            name: String::from("q"),
            value: String::from("a+b c"),
            autocomplete: true,
        });

        let form = URLEncodedForm::new(params);

        // '+' escapes to %2B, space becomes '+'
        assert_eq!(form.to_wire(), b"q=a%2Bb+c");
    }

    #[test]
    fn unknown_token_path_errors() {
        let mut form = URLEncodedForm::from_postdata(&urlencoded_headers(), b"a=1").unwrap();

        assert!(form.set_token(&TokenPath::param("missing", 0), "x").is_err());
        assert!(form.set_token(&TokenPath::param("a", 3), "x").is_err());
        assert!(form.set_token(&TokenPath::nested("a.b"), "x").is_err());
    }
}
