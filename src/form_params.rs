//! ordered model of a parsed HTML form: field names, per-occurrence field
//! state, and the form-level attributes needed to submit it
use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::error::FormFuzzError;
use crate::fields::{form_field_factory, FormField, InputType, TagAttributes};

/// enctype used when a form doesn't declare one
pub const DEFAULT_FORM_ENCODING: &str = "application/x-www-form-urlencoded";

/// charset used when a form doesn't declare one
pub const DEFAULT_ENCODING: &str = "utf-8";

/// one form-parameter name and every field occurrence registered under it
///
/// repeated parameter names (two `<input name="id">` tags) simply grow the
/// occurrence list
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct FormSlot {
    name: String,
    fields: Vec<FormField>,
}

/// a parsed HTML form: an ordered mapping from parameter name to its field
/// occurrences, plus action / method / encoding metadata
///
/// each [`FormField`] carries its own current value, so the plain-value view
/// is always a projection of the field list and can never fall out of sync
/// with it
///
/// # Examples
///
/// ```
/// # use formfuzz::form_params::FormParameters;
/// # use formfuzz::fields::TagAttributes;
/// let mut form = FormParameters::new();
///
/// form.add_field_by_attrs(&TagAttributes::new().attr("name", "id").attr("value", "1"));
/// form.add_field_by_attrs(&TagAttributes::new().attr("name", "id").attr("value", "2"));
///
/// // repeated parameter names are preserved, in insertion order
/// let values = form.values("id").unwrap();
/// assert_eq!(values, vec!["1", "2"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormParameters {
    slots: Vec<FormSlot>,
    method: String,
    action: Option<Url>,
    form_encoding: String,
    encoding: String,
    autocomplete: Option<bool>,
    hosted_at_url: Option<Url>,
    attributes: TagAttributes,
}

impl Default for FormParameters {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            method: String::from("GET"),
            action: None,
            form_encoding: String::from(DEFAULT_FORM_ENCODING),
            encoding: String::from(DEFAULT_ENCODING),
            autocomplete: None,
            hosted_at_url: None,
            attributes: TagAttributes::default(),
        }
    }
}

impl FormParameters {
    /// create an empty form with GET method and url-encoded enctype
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ----------------
    // field management
    // ----------------

    /// run the field factory over raw tag attributes and register the result
    ///
    /// this is the single entry point used while walking a form's child tags;
    /// repeated radio/checkbox tags merge into their existing field via the
    /// factory and report `false` here, as do tags without a usable name
    ///
    /// returns `true` only when a brand new field occurrence was appended
    #[instrument(skip_all, level = "trace")]
    pub fn add_field_by_attrs(&mut self, attrs: &TagAttributes) -> bool {
        let Some(name) = attrs
            .get("name")
            .filter(|name| !name.is_empty())
            .or_else(|| attrs.get("id").filter(|id| !id.is_empty()))
        else {
            return false;
        };

        let name = name.to_string();

        let produced = match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => form_field_factory(attrs, &mut slot.fields),
            None => form_field_factory(attrs, &mut []),
        };

        match produced {
            Some(field) => {
                self.add_form_field(field);
                true
            }
            None => false,
        }
    }

    /// append an already-built field, growing the occurrence list when the
    /// name is already known
    pub fn add_form_field(&mut self, field: FormField) {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.name == field.name())
        {
            Some(slot) => slot.fields.push(field),
            None => self.slots.push(FormSlot {
                name: field.name().to_string(),
                fields: vec![field],
            }),
        }
    }

    /// every field occurrence registered under `name`, in insertion order
    #[must_use]
    pub fn fields(&self, name: &str) -> Option<&[FormField]> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.fields.as_slice())
    }

    /// the plain-value projection for `name`, one entry per occurrence
    #[must_use]
    pub fn values(&self, name: &str) -> Option<Vec<Cow<'_, str>>> {
        self.fields(name)
            .map(|fields| fields.iter().map(FormField::value).collect())
    }

    /// overwrite the value of the `index`-th occurrence of `name`
    ///
    /// # Errors
    ///
    /// returns [`FormFuzzError::TokenNotFound`] when the name or occurrence
    /// index doesn't exist
    pub fn set_value(
        &mut self,
        name: &str,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), FormFuzzError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.fields.get_mut(index))
            .map(|field| field.set_value(value))
            .ok_or_else(|| FormFuzzError::TokenNotFound {
                path: format!("{name}[{index}]"),
            })
    }

    /// mutable access to the `index`-th occurrence of `name`
    pub(crate) fn field_mut(&mut self, name: &str, index: usize) -> Option<&mut FormField> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.fields.get_mut(index))
    }

    /// iterate over (name, occurrences) in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FormField])> {
        self.slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.fields.as_slice()))
    }

    /// iterate over every single field occurrence as (name, index, field)
    pub fn occurrences(&self) -> impl Iterator<Item = (&str, usize, &FormField)> {
        self.slots.iter().flat_map(|slot| {
            slot.fields
                .iter()
                .enumerate()
                .map(move |(index, field)| (slot.name.as_str(), index, field))
        })
    }

    /// number of distinct parameter names
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when no fields have been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// the input type of `name`'s first occurrence; [`InputType::Text`] for
    /// unknown names
    #[must_use]
    pub fn parameter_type(&self, name: &str) -> InputType {
        self.fields(name)
            .and_then(|fields| fields.first())
            .map_or(InputType::Text, FormField::input_type)
    }

    /// names of every parameter that is a file input
    #[must_use]
    pub fn file_variables(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| {
                slot.fields
                    .iter()
                    .any(|field| field.input_type() == InputType::File)
            })
            .map(|slot| slot.name.as_str())
            .collect()
    }

    /// `true` when the form has at least one file input
    #[must_use]
    pub fn has_file_fields(&self) -> bool {
        !self.file_variables().is_empty()
    }

    /// the wire-order (name, value) projection across every occurrence
    pub(crate) fn wire_pairs(&self) -> Vec<(&str, Cow<'_, str>)> {
        self.occurrences()
            .map(|(name, _, field)| (name, field.value()))
            .collect()
    }

    // ----------------
    // form-level state
    // ----------------

    /// the form's HTTP method, always upper-case
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// set the HTTP method; stored upper-cased
    pub fn set_method(&mut self, method: &str) {
        self.method = method.to_uppercase();
    }

    /// the form's action URL, when one was declared
    #[must_use]
    pub const fn action(&self) -> Option<&Url> {
        self.action.as_ref()
    }

    /// set the form's action URL
    pub fn set_action(&mut self, action: Url) {
        self.action = Some(action);
    }

    /// the effective enctype
    ///
    /// a multipart enctype on a GET form cannot be submitted as declared, so
    /// it is reported as url-encoded instead
    #[must_use]
    pub fn form_encoding(&self) -> &str {
        if self.method == "GET" && self.form_encoding.to_lowercase().contains("multipart") {
            DEFAULT_FORM_ENCODING
        } else {
            &self.form_encoding
        }
    }

    /// set the declared enctype
    pub fn set_form_encoding(&mut self, form_encoding: &str) {
        self.form_encoding = form_encoding.to_string();
    }

    /// the form's charset
    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// set the form's charset
    pub fn set_encoding(&mut self, encoding: &str) {
        self.encoding = encoding.to_string();
    }

    /// form-level autocomplete attribute, when one was declared
    #[must_use]
    pub const fn autocomplete(&self) -> Option<bool> {
        self.autocomplete
    }

    /// set the form-level autocomplete attribute
    pub fn set_autocomplete(&mut self, autocomplete: bool) {
        self.autocomplete = Some(autocomplete);
    }

    /// URL of the page the form was found on
    #[must_use]
    pub const fn hosted_at_url(&self) -> Option<&Url> {
        self.hosted_at_url.as_ref()
    }

    /// record the URL of the page the form was found on
    pub fn set_hosted_at_url(&mut self, url: Url) {
        self.hosted_at_url = Some(url);
    }

    /// raw attributes of the `<form>` tag itself
    #[must_use]
    pub const fn attributes(&self) -> &TagAttributes {
        &self.attributes
    }

    /// store the raw attributes of the `<form>` tag
    pub fn set_attributes(&mut self, attributes: TagAttributes) {
        self.attributes = attributes;
    }

    // ----------------
    // form classification
    // ----------------

    /// count parameters by type: (text, password, other)
    #[must_use]
    pub fn parameter_type_count(&self) -> (usize, usize, usize) {
        let (mut text, mut passwd, mut other) = (0, 0, 0);

        for slot in &self.slots {
            match self.parameter_type(&slot.name) {
                InputType::Text => text += 1,
                InputType::Password => passwd += 1,
                _ => other += 1,
            }
        }

        (text, passwd, other)
    }

    /// `true` for the classic one-user-one-password login form, or the
    /// password-only variant
    #[must_use]
    pub fn is_login_form(&self) -> bool {
        let (text, passwd, _) = self.parameter_type_count();
        matches!((text, passwd), (0 | 1, 1))
    }

    /// `true` for a registration form: at least one text input and exactly
    /// two password fields (password plus confirmation)
    #[must_use]
    pub fn is_registration_form(&self) -> bool {
        let (text, passwd, _) = self.parameter_type_count();
        passwd == 2 && text >= 1
    }

    /// `true` for a password-change form: old, new and confirmation fields
    #[must_use]
    pub fn is_password_change_form(&self) -> bool {
        let (_, passwd, _) = self.parameter_type_count();
        passwd == 3
    }
}
