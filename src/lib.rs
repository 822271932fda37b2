//! structured web-form fuzzing primitives
//!
//! this crate models HTML forms and HTTP request bodies the way a web
//! scanner needs them: every parsed form keeps its parameter order and
//! repeated names, every body is wrapped in a typed [`DataContainer`], and
//! fuzzed copies ([`Mutant`]s) change exactly one position at a time while
//! the rest of the request stays plausible
//!
//! the three layers, bottom up:
//!
//! - [`fields`] / [`form_params`] / [`variants`]: parse form inputs into
//!   typed fields, group them into a [`FormParameters`] model, and sample
//!   its legitimate select/radio/checkbox combinations deterministically
//! - [`dc`]: typed containers for url-encoded, multipart, JSON, XML-RPC and
//!   opaque bodies, plus the factory that picks the right one for raw
//!   post-data
//! - [`mutants`]: turn one request plus a payload list into a batch of
//!   one-change-each fuzzed requests
//!
//! # Examples
//!
//! ```
//! use formfuzz::config::FuzzerConfig;
//! use formfuzz::headers::Headers;
//! use formfuzz::mutants::Mutant;
//! use formfuzz::request::FuzzableRequest;
//!
//! # fn main() -> Result<(), formfuzz::error::FormFuzzError> {
//! let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
//!     .into_iter()
//!     .collect();
//!
//! let request =
//!     FuzzableRequest::from_parts("http://target.example/login", "POST", headers, b"user=&pass=")?;
//!
//! let mutants =
//!     Mutant::post_data_mutants(&request, &["payload"], &[], false, &FuzzerConfig::default());
//!
//! // one mutant per parameter; the untouched field is smart-filled
//! assert_eq!(mutants.len(), 2);
//! assert_eq!(mutants[0].request().body(), b"user=payload&pass=FrAmE30.");
//! # Ok(())
//! # }
//! ```
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::perf,
    rustdoc::broken_intra_doc_links,
    missing_docs,
    clippy::missing_const_for_fn
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dc;
pub mod error;
pub mod fields;
pub mod fill;
pub mod form_params;
pub mod headers;
pub mod mutants;
pub mod request;
pub mod variants;

// the types nearly every consumer touches, available as top-level imports
pub use config::FuzzerConfig;
pub use dc::{dc_from_form_params, dc_from_hdrs_post, DataContainer, DataToken, TokenPath};
pub use error::FormFuzzError;
pub use fields::{form_field_factory, FormField, InputType};
pub use form_params::FormParameters;
pub use headers::Headers;
pub use mutants::{Mutant, MutantKind};
pub use request::FuzzableRequest;
pub use variants::VariantMode;
