//! XML-RPC request bodies
use std::any::Any;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dc::token::{DataToken, TokenPath};
use crate::dc::{AsAny, DataContainer};
use crate::error::FormFuzzError;
use crate::headers::Headers;

const XMLRPC_TYPE: &str = "text/xml";
const OPEN_TAG: &str = "<string>";
const CLOSE_TAG: &str = "</string>";

/// an XML-RPC method call held as raw text
///
/// only `<string>` element bodies are fuzzable; substitution splices the raw
/// text so the rest of the document, whitespace included, survives verbatim
///
/// # Examples
///
/// ```
/// # use formfuzz::dc::{DataContainer, TokenPath, XmlRpcContainer};
/// # use formfuzz::headers::Headers;
/// let body = b"<methodCall><params><param>\
///              <value><string>admin</string></value>\
///              </param></params></methodCall>";
///
/// let mut container = XmlRpcContainer::from_postdata(&Headers::new(), body).unwrap();
///
/// container.set_token(&TokenPath::param("string", 0), "payload").unwrap();
///
/// assert!(String::from_utf8_lossy(&container.to_wire()).contains("<string>payload</string>"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct XmlRpcContainer {
    raw: String,
    token: Option<DataToken>,
}

impl XmlRpcContainer {
    /// parse a raw body as an XML-RPC method call
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::UnmatchedWireFormat`] when the body isn't utf-8 or
    /// doesn't contain a `<methodCall>` element
    pub fn from_postdata(_headers: &Headers, body: &[u8]) -> Result<Self, FormFuzzError> {
        let raw = std::str::from_utf8(body).map_err(|_| FormFuzzError::UnmatchedWireFormat {
            expected: XMLRPC_TYPE,
            reason: "body isn't valid utf-8",
        })?;

        if !raw.to_lowercase().contains("<methodcall") {
            return Err(FormFuzzError::UnmatchedWireFormat {
                expected: XMLRPC_TYPE,
                reason: "no methodCall element in the body",
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            token: None,
        })
    }

    /// byte spans of every `<string>` element body, in document order
    fn string_spans(&self) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut cursor = 0;

        while let Some(open) = self.raw[cursor..].find(OPEN_TAG) {
            let start = cursor + open + OPEN_TAG.len();

            let Some(close) = self.raw[start..].find(CLOSE_TAG) else {
                break;
            };

            spans.push((start, start + close));
            cursor = start + close + CLOSE_TAG.len();
        }

        spans
    }
}

impl AsAny for XmlRpcContainer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DataContainer for XmlRpcContainer {
    fn get_type(&self) -> &'static str {
        "XML-RPC"
    }

    fn get_headers(&self) -> Headers {
        [("Content-Type", XMLRPC_TYPE)].into_iter().collect()
    }

    fn token_paths(&self) -> Vec<TokenPath> {
        (0..self.string_spans().len())
            .map(|index| TokenPath::param("string", index))
            .collect()
    }

    fn set_token(&mut self, path: &TokenPath, value: &str) -> Result<(), FormFuzzError> {
        let TokenPath::Param { index, .. } = path else {
            return Err(FormFuzzError::TokenNotFound {
                path: path.to_string(),
            });
        };

        let (start, end) =
            *self
                .string_spans()
                .get(*index)
                .ok_or_else(|| FormFuzzError::TokenNotFound {
                    path: path.to_string(),
                })?;

        let original = self.raw[start..end].to_string();
        self.raw.replace_range(start..end, value);

        self.token = Some(DataToken::new(path.clone(), original, value));

        Ok(())
    }

    fn token(&self) -> Option<&DataToken> {
        self.token.as_ref()
    }

    fn to_wire(&self) -> Vec<u8> {
        self.raw.clone().into_bytes()
    }
}

impl Display for XmlRpcContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHOD_CALL: &[u8] = b"<?xml version=\"1.0\"?>\
        <methodCall><methodName>auth</methodName><params>\
        <param><value><string>user</string></value></param>\
        <param><value><int>7</int></value></param>\
        <param><value><string>secret</string></value></param>\
        </params></methodCall>";

    #[test]
    fn only_string_elements_are_fuzzable() {
        let container = XmlRpcContainer::from_postdata(&Headers::new(), METHOD_CALL).unwrap();

        assert_eq!(
            container.token_paths(),
            vec![TokenPath::param("string", 0), TokenPath::param("string", 1)]
        );
    }

    #[test]
    fn substitution_splices_the_raw_text() {
        let mut container = XmlRpcContainer::from_postdata(&Headers::new(), METHOD_CALL).unwrap();

        container.set_token(&TokenPath::param("string", 1), "payload").unwrap();

        let wire = String::from_utf8(container.to_wire()).unwrap();
        assert!(wire.contains("<string>user</string>"));
        assert!(wire.contains("<string>payload</string>"));
        // everything outside the spliced span is untouched
        assert!(wire.contains("<int>7</int>"));
        assert_eq!(container.token().unwrap().original_value(), "secret");
    }

    #[test]
    fn non_xmlrpc_bodies_are_rejected() {
        assert!(XmlRpcContainer::from_postdata(&Headers::new(), b"a=3&b=2").is_err());
        assert!(XmlRpcContainer::from_postdata(&Headers::new(), b"<xml/>").is_err());
        assert!(XmlRpcContainer::from_postdata(&Headers::new(), &[0xff, 0xfe]).is_err());
    }
}
