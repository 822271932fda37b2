//! data containers: typed wrappers around an HTTP request body
//!
//! each wire format (url-encoded form, multipart, JSON, XML-RPC, opaque
//! bytes) gets its own container type behind the [`DataContainer`] trait.
//! Callers never ask "which concrete type is this?" to decide what they can
//! do with a body; they ask the container for its capabilities
//! ([`DataContainer::supports_tokenization`], [`DataContainer::form_params`])
//! and act on the answer
use std::any::Any;
use std::fmt::{Debug, Display};

use dyn_clone::DynClone;

use crate::error::FormFuzzError;
use crate::form_params::FormParameters;
use crate::headers::Headers;

pub mod factory;
pub mod json;
pub mod multipart;
pub mod plain;
pub mod token;
pub mod urlencoded;
pub mod xmlrpc;

pub use factory::{dc_from_form_params, dc_from_hdrs_post};
pub use json::JsonContainer;
pub use multipart::{multipart_encode, MultipartContainer, MultipartFile, DEFAULT_BOUNDARY};
pub use plain::PlainContainer;
pub use token::{DataToken, FileDataToken, TokenPath};
pub use urlencoded::URLEncodedForm;
pub use xmlrpc::XmlRpcContainer;

/// an implementor of this trait can be cast to [`Any`] as part of a
/// dynamic dispatch system
///
/// the normal implementation is to return `self`
pub trait AsAny {
    /// return the implementing type as `Any`
    fn as_any(&self) -> &dyn Any;
}

/// common behavior of every request-body wrapper
///
/// tokenization is the act of designating exactly one position inside the
/// body as fuzzable and writing a payload into it; containers that can't be
/// tokenized (opaque bodies) say so through
/// [`supports_tokenization`](DataContainer::supports_tokenization) instead of
/// erroring at a distance
pub trait DataContainer: AsAny + DynClone + Debug + Display + Send + Sync {
    /// short human-readable name of the wire format
    fn get_type(&self) -> &'static str;

    /// the headers this body requires on its request, content-type included
    fn get_headers(&self) -> Headers;

    /// whether this container exposes fuzzable positions at all
    fn supports_tokenization(&self) -> bool {
        true
    }

    /// every fuzzable position, in wire order
    fn token_paths(&self) -> Vec<TokenPath>;

    /// designate `path` as the fuzzable position and write `value` into it
    ///
    /// records the value previously held at that position so the change can
    /// be reported later
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::TokenNotFound`] when `path` doesn't address a
    /// fuzzable position of this container;
    /// [`FormFuzzError::TokenizationUnsupported`] for containers that have
    /// no fuzzable positions
    fn set_token(&mut self, path: &TokenPath, value: &str) -> Result<(), FormFuzzError>;

    /// the currently designated token, when one has been set
    fn token(&self) -> Option<&DataToken>;

    /// capability accessor: the wrapped [`FormParameters`], for containers
    /// that are forms
    fn form_params(&self) -> Option<&FormParameters> {
        None
    }

    /// mutable counterpart of [`form_params`](DataContainer::form_params)
    fn form_params_mut(&mut self) -> Option<&mut FormParameters> {
        None
    }

    /// serialize the body exactly as it would be sent
    fn to_wire(&self) -> Vec<u8>;

    /// whether `other` is the same logical body with possibly different
    /// values: same wire format, same fuzzable-position structure
    fn is_variant_of(&self, other: &dyn DataContainer) -> bool {
        self.get_type() == other.get_type() && self.token_paths() == other.token_paths()
    }
}

dyn_clone::clone_trait_object!(DataContainer);
