//! `multipart/form-data` request bodies
use std::any::Any;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::dc::token::{DataToken, FileDataToken, TokenPath};
use crate::dc::{AsAny, DataContainer};
use crate::error::FormFuzzError;
use crate::fields::{FormField, InputType};
use crate::form_params::FormParameters;
use crate::headers::Headers;

/// boundary used for every encode
///
/// a fixed boundary makes two encodes of structurally-identical containers
/// byte-identical, which request de-duplication relies on
pub const DEFAULT_BOUNDARY: &str = "----------------------------1656250946173";

const MULTIPART_TYPE: &str = "multipart/form-data";

/// one file part handed to [`multipart_encode`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultipartFile {
    /// field name of the part
    pub name: String,

    /// file name advertised in the part's Content-Disposition
    pub file_name: String,

    /// MIME type advertised for the file content
    pub content_type: String,

    /// raw file bytes
    pub content: Vec<u8>,
}

/// guess a MIME type from a file name's extension; anything unrecognized is
/// `application/octet-stream`
fn mime_from_file_name(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or_default();

    match extension.to_lowercase().as_str() {
        "gif" => "image/gif",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        "htm" | "html" => "text/html",
        "xml" => "text/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// serialize plain variables and file parts into a multipart body
///
/// each part is delimited by `--boundary\r\n`; the body is terminated by
/// `--boundary--\r\n\r\n`. Output is a pure function of its inputs, so the
/// same variables and files always produce the same bytes
#[must_use]
pub fn multipart_encode(
    vars: &[(&str, &str)],
    files: &[MultipartFile],
    boundary: &str,
) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in vars {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for file in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.name, file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(&file.content);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n\r\n").as_bytes());

    body
}

/// first occurrence of `needle` in `haystack`, starting the search at `from`
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}

/// pull `attribute="value"` out of a Content-Disposition header line
///
/// the match is anchored on the preceding separator so that `name="` never
/// matches inside `filename="`
fn disposition_attribute<'h>(header: &'h str, attribute: &str) -> Option<&'h str> {
    let marker = format!("{attribute}=\"");
    let mut cursor = 0;

    while let Some(found) = header[cursor..].find(&marker) {
        let start = cursor + found;
        let preceding = header.as_bytes().get(start.wrapping_sub(1));

        if start == 0 || matches!(preceding, Some(b' ' | b';')) {
            let value_start = start + marker.len();
            let value_end = header[value_start..].find('"')? + value_start;

            return Some(&header[value_start..value_end]);
        }

        cursor = start + marker.len();
    }

    None
}

/// a multipart form body, with its boundary and an optional restriction of
/// tokenization to file fields only
///
/// the file-only restriction exists for file-content fuzzing: payloads land
/// inside synthetic upload files while the plain fields keep their values
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultipartContainer {
    params: FormParameters,
    boundary: String,
    only_file_tokens: bool,
    file_extension: String,
    token: Option<DataToken>,
    file_token: Option<FileDataToken>,
}

impl MultipartContainer {
    /// wrap an already-parsed form, tokenizing plain fields
    #[must_use]
    pub fn new(params: FormParameters) -> Self {
        Self {
            params,
            boundary: String::from(DEFAULT_BOUNDARY),
            only_file_tokens: false,
            file_extension: String::from("gif"),
            token: None,
            file_token: None,
        }
    }

    /// wrap a form, restricting tokenization to its file fields; payloads
    /// written into those tokens are embedded in synthetic files using
    /// `extension` when the original upload doesn't reveal one
    #[must_use]
    pub fn with_only_file_tokens(params: FormParameters, extension: impl Into<String>) -> Self {
        Self {
            only_file_tokens: true,
            file_extension: extension.into(),
            ..Self::new(params)
        }
    }

    /// parse a raw multipart body into a form
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::UnmatchedWireFormat`] when the content-type doesn't
    /// declare multipart with a boundary, or no part carries a usable name
    pub fn from_postdata(headers: &Headers, body: &[u8]) -> Result<Self, FormFuzzError> {
        let content_type = headers.content_type().unwrap_or_default();

        if !content_type.to_lowercase().contains("multipart/form-data") {
            return Err(FormFuzzError::UnmatchedWireFormat {
                expected: MULTIPART_TYPE,
                reason: "content-type doesn't declare a multipart body",
            });
        }

        // the boundary is case-sensitive; extract it from the raw header
        let boundary = content_type
            .split("boundary=")
            .nth(1)
            .map(|raw| raw.trim_matches('"').trim().to_string())
            .filter(|boundary| !boundary.is_empty())
            .ok_or(FormFuzzError::UnmatchedWireFormat {
                expected: MULTIPART_TYPE,
                reason: "content-type carries no boundary",
            })?;

        let params = parse_parts(body, &boundary)?;

        Ok(Self {
            boundary,
            ..Self::new(params)
        })
    }

    /// the boundary used on the wire
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// the file token, when the designated token is a file field
    #[must_use]
    pub const fn file_token(&self) -> Option<&FileDataToken> {
        self.file_token.as_ref()
    }

    /// write `value` into the file field at `path` as a synthetic file
    fn set_file_token(&mut self, path: &TokenPath, value: &str) -> Result<(), FormFuzzError> {
        let TokenPath::Param { name, index } = path else {
            return Err(FormFuzzError::TokenNotFound {
                path: path.to_string(),
            });
        };

        let Some(FormField::File {
            value: content,
            file_name,
            ..
        }) = self.params.field_mut(name, *index)
        else {
            error!(%path, "token path doesn't address a file field");
            return Err(FormFuzzError::TokenNotFound {
                path: path.to_string(),
            });
        };

        // a known upload name pins the synthetic file's extension
        let extension = file_name
            .as_deref()
            .and_then(|file_name| file_name.rsplit('.').next())
            .map_or_else(|| self.file_extension.clone(), ToString::to_string);

        let original = content
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default()
            .into_owned();

        let mut file_token = FileDataToken::new(path.clone(), extension);
        file_token.set_payload(value.as_bytes());

        *content = Some(file_token.content().to_vec());
        *file_name = Some(file_token.file_name().to_string());

        self.token = Some(DataToken::new(path.clone(), original, value));
        self.file_token = Some(file_token);

        Ok(())
    }
}

/// split a multipart body at its boundary and register one field per part
fn parse_parts(body: &[u8], boundary: &str) -> Result<FormParameters, FormFuzzError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut params = FormParameters::new();
    params.set_method("POST");
    params.set_form_encoding(MULTIPART_TYPE);

    let mut cursor = find(body, &delimiter, 0).ok_or(FormFuzzError::UnmatchedWireFormat {
        expected: MULTIPART_TYPE,
        reason: "boundary never appears in the body",
    })?;

    loop {
        cursor += delimiter.len();

        // closing delimiter
        if body[cursor..].starts_with(b"--") {
            break;
        }

        if body[cursor..].starts_with(b"\r\n") {
            cursor += 2;
        }

        let Some(part_end) = find(body, &delimiter, cursor) else {
            break;
        };

        let part = &body[cursor..part_end];
        register_part(&mut params, part);

        cursor = part_end;
    }

    if params.is_empty() {
        return Err(FormFuzzError::UnmatchedWireFormat {
            expected: MULTIPART_TYPE,
            reason: "no part carries a usable field name",
        });
    }

    Ok(params)
}

/// parse a single part (headers, blank line, content) into a form field
fn register_part(params: &mut FormParameters, part: &[u8]) {
    let Some(header_end) = find(part, b"\r\n\r\n", 0) else {
        trace!("skipping multipart part without a header block");
        return;
    };

    let headers = String::from_utf8_lossy(&part[..header_end]);
    let mut content = &part[header_end + 4..];

    // the part's trailing CRLF belongs to the framing, not the content
    if content.ends_with(b"\r\n") {
        content = &content[..content.len() - 2];
    }

    let Some(disposition) = headers
        .lines()
        .find(|line| line.to_lowercase().starts_with("content-disposition"))
    else {
        trace!("skipping multipart part without a content-disposition header");
        return;
    };

    let Some(name) = disposition_attribute(disposition, "name") else {
        trace!("skipping multipart part without a field name");
        return;
    };

    if let Some(file_name) = disposition_attribute(disposition, "filename") {
        params.add_form_field(FormField::File {
            name: name.to_string(),
            value: Some(content.to_vec()),
            file_name: Some(file_name.to_string()),
        });
    } else {
        params.add_form_field(FormField::Generic {
            input_type: InputType::Text,
            name: name.to_string(),
            value: String::from_utf8_lossy(content).into_owned(),
            autocomplete: true,
        });
    }
}

impl AsAny for MultipartContainer {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DataContainer for MultipartContainer {
    fn get_type(&self) -> &'static str {
        "Multipart form"
    }

    fn get_headers(&self) -> Headers {
        [(
            "Content-Type".to_string(),
            format!("{MULTIPART_TYPE}; boundary={}", self.boundary),
        )]
        .into_iter()
        .collect()
    }

    fn token_paths(&self) -> Vec<TokenPath> {
        self.params
            .occurrences()
            .filter(|(_, _, field)| {
                let is_file = field.input_type() == InputType::File;

                if self.only_file_tokens {
                    is_file
                } else {
                    !is_file
                }
            })
            .map(|(name, index, _)| TokenPath::param(name, index))
            .collect()
    }

    fn set_token(&mut self, path: &TokenPath, value: &str) -> Result<(), FormFuzzError> {
        if self.only_file_tokens {
            return self.set_file_token(path, value);
        }

        let TokenPath::Param { name, index } = path else {
            return Err(FormFuzzError::TokenNotFound {
                path: path.to_string(),
            });
        };

        let original = self
            .params
            .fields(name)
            .and_then(|fields| fields.get(*index))
            .filter(|field| field.input_type() != InputType::File)
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
        let mut vars = Vec::new();
        let mut files = Vec::new();

        for (name, _, field) in self.params.occurrences() {
            if let FormField::File {
                value, file_name, ..
            } = field
            {
                let file_name = file_name
                    .clone()
                    .unwrap_or_else(|| format!("file.{}", self.file_extension));

                files.push(MultipartFile {
                    name: name.to_string(),
                    content_type: mime_from_file_name(&file_name).to_string(),
                    file_name,
                    content: value.clone().unwrap_or_default(),
                });
            } else {
                vars.push((name, field.value().into_owned()));
            }
        }

        let var_refs: Vec<(&str, &str)> = vars
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();

        multipart_encode(&var_refs, &files, &self.boundary)
    }
}

impl Display for MultipartContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_wire()))
    }
}
