//! token types that mark the single fuzzable position inside a container
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fill::file_from_template;

/// address of a fuzzable position inside a data container
///
/// flat containers (forms, XML-RPC strings) address by parameter name plus
/// occurrence index; nested containers (JSON) address by dotted path
///
/// # Examples
///
/// ```
/// # use formfuzz::dc::TokenPath;
/// let flat = TokenPath::param("id", 1);
/// assert_eq!(flat.to_string(), "id[1]");
///
/// let nested = TokenPath::nested("user.roles.0");
/// assert_eq!(nested.to_string(), "user.roles.0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenPath {
    /// the `index`-th occurrence of parameter `name`
    Param {
        /// parameter name as it appears on the wire
        name: String,

        /// zero-based occurrence index; relevant when the name repeats
        index: usize,
    },

    /// dotted path into a nested structure, array steps as numbers
    Nested(String),
}

impl TokenPath {
    /// shorthand for a flat name/occurrence path
    #[must_use]
    pub fn param(name: impl Into<String>, index: usize) -> Self {
        Self::Param {
            name: name.into(),
            index,
        }
    }

    /// shorthand for a nested dotted path
    #[must_use]
    pub fn nested(path: impl Into<String>) -> Self {
        Self::Nested(path.into())
    }

    /// the parameter name this path points at; for nested paths, the final
    /// path step
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Param { name, .. } => name,
            Self::Nested(path) => path.rsplit('.').next().unwrap_or(path),
        }
    }
}

impl Display for TokenPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param { name, index } => write!(f, "{name}[{index}]"),
            Self::Nested(path) => write!(f, "{path}"),
        }
    }
}

/// the designated fuzzable position of a container, with enough state to
/// report what was changed
///
/// a container carries at most one token at a time; creating one records the
/// value that position held before the payload was written into it
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataToken {
    path: TokenPath,
    value: String,
    original_value: String,
}

impl DataToken {
    /// create a token at `path`, recording `original_value` and immediately
    /// holding `value`
    #[must_use]
    pub fn new(path: TokenPath, original_value: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path,
            value: value.into(),
            original_value: original_value.into(),
        }
    }

    /// where inside the container this token points
    #[must_use]
    pub const fn path(&self) -> &TokenPath {
        &self.path
    }

    /// the parameter name being fuzzed
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// the payload currently written at the token position
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// the value the position held before fuzzing
    #[must_use]
    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    /// overwrite the payload
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl Display for DataToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// a token over a file-upload field
///
/// writing a payload into a file field shouldn't destroy the upload's shape;
/// the payload is embedded in a synthetic file that still carries the right
/// magic bytes for its extension
///
/// # Examples
///
/// ```
/// # use formfuzz::dc::{FileDataToken, TokenPath};
/// let mut token = FileDataToken::new(TokenPath::param("image", 0), "gif");
/// token.set_payload(b"<payload>");
///
/// assert!(token.content().starts_with(b"GIF89a"));
/// assert_eq!(token.file_name(), "fuzzfile.gif");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileDataToken {
    path: TokenPath,
    extension: String,
    file_name: String,
    payload: Vec<u8>,
    content: Vec<u8>,
}

impl FileDataToken {
    /// create a file token; the synthetic file starts out as an empty payload
    /// wrapped in the extension's template
    #[must_use]
    pub fn new(path: TokenPath, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let (content, file_name) = file_from_template(&extension, b"");

        Self {
            path,
            extension,
            file_name,
            payload: Vec::new(),
            content,
        }
    }

    /// embed `payload` into a fresh synthetic file for this extension
    pub fn set_payload(&mut self, payload: &[u8]) {
        let (content, file_name) = file_from_template(&self.extension, payload);

        self.payload = payload.to_vec();
        self.content = content;
        self.file_name = file_name;
    }

    /// where inside the container this token points
    #[must_use]
    pub const fn path(&self) -> &TokenPath {
        &self.path
    }

    /// the extension the synthetic file pretends to have
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// deterministic name of the synthetic file
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// the raw payload embedded in the file
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// the full synthetic file content (template header + payload)
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_records_original_and_current_value() {
        let mut token = DataToken::new(TokenPath::param("id", 0), "1", "1");
        token.set_value("payload");

        assert_eq!(token.original_value(), "1");
        assert_eq!(token.value(), "payload");
        assert_eq!(token.name(), "id");
    }

    #[test]
    fn nested_path_name_is_the_last_step() {
        let token = DataToken::new(TokenPath::nested("user.address.zip"), "", "");
        assert_eq!(token.name(), "zip");
    }

    #[test]
    fn file_token_wraps_payload_in_template() {
        let mut token = FileDataToken::new(TokenPath::param("upload", 0), "png");
        token.set_payload(b"xss");

        assert!(token.content().starts_with(&[0x89, 0x50, 0x4e, 0x47]));
        assert!(token.content().ends_with(b"xss"));
        assert_eq!(token.payload(), b"xss");
    }
}
