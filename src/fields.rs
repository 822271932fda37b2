//! typed value holders for individual HTML form inputs and the factory that
//! builds them from raw tag attributes
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

/// the `type` attribute of an HTML input, parsed case-insensitively
///
/// anything that isn't one of the well-known types maps to [`InputType::Other`]
/// and behaves like a plain text input
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum InputType {
    /// `<input type="text">`; also the fallback when the attribute is absent
    #[default]
    Text,

    /// `<input type="password">`
    Password,

    /// `<input type="hidden">`
    Hidden,

    /// `<input type="submit">`
    Submit,

    /// `<textarea>`
    Textarea,

    /// `<select>`
    Select,

    /// `<input type="radio">`
    Radio,

    /// `<input type="checkbox">`
    Checkbox,

    /// `<input type="file">`
    File,

    /// any unrecognized `type` attribute value
    Other,
}

impl InputType {
    /// parse a raw `type` attribute value; comparison is case-insensitive
    ///
    /// # Examples
    ///
    /// ```
    /// # use formfuzz::fields::InputType;
    /// assert_eq!(InputType::from_attr("RaDiO"), InputType::Radio);
    /// assert_eq!(InputType::from_attr("date"), InputType::Other);
    /// ```
    #[must_use]
    pub fn from_attr(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "text" => Self::Text,
            "password" => Self::Password,
            "hidden" => Self::Hidden,
            "submit" => Self::Submit,
            "textarea" => Self::Textarea,
            "select" => Self::Select,
            "radio" => Self::Radio,
            "checkbox" => Self::Checkbox,
            "file" => Self::File,
            _ => Self::Other,
        }
    }

    /// whether this input offers a closed set of selectable options
    /// (select / radio / checkbox)
    #[must_use]
    pub const fn is_choice(&self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }

    /// string form of the input type, as it would appear in markup
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Hidden => "hidden",
            Self::Submit => "submit",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::File => "file",
            Self::Other => "other",
        }
    }
}

impl Display for InputType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// raw HTML tag attributes handed over by an external HTML parser
///
/// lookups are case-insensitive on the attribute name; `<option>` values of a
/// `<select>` arrive pre-flattened through [`TagAttributes::option_values`]
///
/// # Examples
///
/// ```
/// # use formfuzz::fields::TagAttributes;
/// let attrs = TagAttributes::new()
///     .attr("TYPE", "radio")
///     .attr("name", "sex")
///     .attr("value", "male");
///
/// assert_eq!(attrs.get("type"), Some("radio"));
/// assert_eq!(attrs.get("class"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TagAttributes {
    pairs: Vec<(String, String)>,
    values: Vec<String>,
}

impl TagAttributes {
    /// create an empty attribute set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// builder-style addition of a single key/value attribute
    #[must_use]
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// builder-style setter for the flattened `<option>` value list
    #[must_use]
    pub fn option_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// case-insensitive lookup; the first matching attribute wins
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// the flattened `<option>` value list, empty for non-select tags
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// a single HTML form input with its current value
///
/// identity (input type and name) is fixed at creation; the value side is
/// mutated freely during variant generation and fuzzing
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FormField {
    /// free-text inputs: text / password / hidden / submit / textarea and
    /// any unrecognized type
    Generic {
        /// concrete input type within the generic family
        input_type: InputType,

        /// field name as submitted on the wire
        name: String,

        /// current value
        value: String,

        /// `false` only when the markup carried `autocomplete="off"`
        autocomplete: bool,
    },

    /// closed-option inputs: select / radio / checkbox
    Choose {
        /// concrete input type within the choose family
        input_type: InputType,

        /// field name as submitted on the wire
        name: String,

        /// every selectable option, in markup order
        values: Vec<String>,

        /// currently selected value; empty string when `values` is empty
        /// (malformed `<select>` with no `<option>` tags)
        value: String,
    },

    /// `<input type="file">`
    File {
        /// field name as submitted on the wire
        name: String,

        /// file content, once one has been attached
        value: Option<Vec<u8>>,

        /// name of the file being uploaded, when known
        file_name: Option<String>,
    },
}

impl FormField {
    /// the field's wire name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Generic { name, .. } | Self::Choose { name, .. } | Self::File { name, .. } => {
                name
            }
        }
    }

    /// the field's input type; [`InputType::File`] for file fields
    #[must_use]
    pub const fn input_type(&self) -> InputType {
        match self {
            Self::Generic { input_type, .. } | Self::Choose { input_type, .. } => *input_type,
            Self::File { .. } => InputType::File,
        }
    }

    /// the current value as text
    ///
    /// file fields project their content lossily; a file field without
    /// content projects as the empty string
    #[must_use]
    pub fn value(&self) -> Cow<'_, str> {
        match self {
            Self::Generic { value, .. } | Self::Choose { value, .. } => Cow::from(value.as_str()),
            Self::File { value, .. } => value
                .as_deref()
                .map_or(Cow::from(""), String::from_utf8_lossy),
        }
    }

    /// overwrite the current value
    ///
    /// for file fields the text becomes the raw file content; the file name
    /// is left untouched
    pub fn set_value(&mut self, new_value: impl Into<String>) {
        match self {
            Self::Generic { value, .. } | Self::Choose { value, .. } => *value = new_value.into(),
            Self::File { value, .. } => *value = Some(new_value.into().into_bytes()),
        }
    }

    /// attach file content and a file name; no-op for non-file fields
    pub fn set_file(&mut self, content: Vec<u8>, name: impl Into<String>) {
        if let Self::File {
            value, file_name, ..
        } = self
        {
            *value = Some(content);
            *file_name = Some(name.into());
        }
    }

    /// the selectable option list for choose fields
    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::Choose { values, .. } => Some(values),
            _ => None,
        }
    }

    /// the uploaded file's name, for file fields that carry one
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::File { file_name, .. } => file_name.as_deref(),
            _ => None,
        }
    }

    /// whether autocompletion is enabled; absent attribute means enabled
    #[must_use]
    pub const fn autocomplete(&self) -> bool {
        match self {
            Self::Generic { autocomplete, .. } => *autocomplete,
            _ => true,
        }
    }
}

/// build a [`FormField`] from raw tag attributes
///
/// `existing` holds the fields already registered under the same name; radio
/// and checkbox inputs that repeat an existing (name, type) pair collapse
/// into that field's option list instead of creating a new one, which keeps
/// the variant space from exploding with one field per `<input>` tag
///
/// returns `None` both when the tag carries neither `name` nor `id` (nothing
/// to add, not an error) and when the value was folded into an existing field
///
/// # Examples
///
/// ```
/// # use formfuzz::fields::{form_field_factory, FormField, InputType, TagAttributes};
/// let mut existing = Vec::new();
///
/// for value in ["male", "female", "other"] {
///     let attrs = TagAttributes::new()
///         .attr("name", "sex")
///         .attr("type", "radio")
///         .attr("value", value);
///
///     if let Some(field) = form_field_factory(&attrs, &mut existing) {
///         existing.push(field);
///     }
/// }
///
/// // three radio tags collapsed into a single field
/// assert_eq!(existing.len(), 1);
/// assert_eq!(existing[0].input_type(), InputType::Radio);
/// assert_eq!(
///     existing[0].options().unwrap(),
///     &["male".to_string(), "female".to_string(), "other".to_string()]
/// );
/// ```
#[must_use]
pub fn form_field_factory(attrs: &TagAttributes, existing: &mut [FormField]) -> Option<FormField> {
    let name = attrs
        .get("name")
        .filter(|name| !name.is_empty())
        .or_else(|| attrs.get("id").filter(|id| !id.is_empty()))?;

    let input_type = InputType::from_attr(attrs.get("type").unwrap_or("text"));
    let value = attrs.get("value").unwrap_or_default();

    match input_type {
        InputType::Select => {
            // the option list arrives pre-flattened; a <select> with no
            // <option> children yields an empty list and an empty value
            let values = attrs.values().to_vec();
            let selected = values.first().cloned().unwrap_or_default();

            Some(FormField::Choose {
                input_type,
                name: name.to_string(),
                values,
                value: selected,
            })
        }
        InputType::Radio | InputType::Checkbox => {
            for field in existing.iter_mut() {
                if field.input_type() != input_type || field.name() != name {
                    continue;
                }

                if let FormField::Choose { values, .. } = field {
                    trace!(%name, %input_type, %value, "collapsing repeated choice input");
                    values.push(value.to_string());
                    return None;
                }
            }

            Some(FormField::Choose {
                input_type,
                name: name.to_string(),
                values: vec![value.to_string()],
                value: value.to_string(),
            })
        }
        InputType::File => Some(FormField::File {
            name: name.to_string(),
            value: None,
            file_name: attrs.get("filename").map(ToString::to_string),
        }),
        _ => {
            // default is autocomplete=on, including when the attribute is
            // missing entirely
            let autocomplete = !attrs
                .get("autocomplete")
                .is_some_and(|attr| attr.eq_ignore_ascii_case("off"));

            Some(FormField::Generic {
                input_type,
                name: name.to_string(),
                value: value.to_string(),
                autocomplete,
            })
        }
    }
}
