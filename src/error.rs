//! Custom error-type definitions
use thiserror::Error;
use url::ParseError;

/// primary error-type for the formfuzz library
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FormFuzzError {
    /// Represents a failure to parse the given string into a [`url::Url`](https://docs.rs/url/latest/url/struct.Url.html).
    #[error("The url `{url}` is invalid and couldn't be parsed.")]
    InvalidUrl {
        /// underlying source error-type
        source: ParseError,

        /// the url that couldn't be parsed
        url: String,
    },

    /// Represents an unknown variant-generation mode string
    ///
    /// valid modes are `all`, `tb`, `tmb`, `t` and `b`
    #[error("The variant generation mode `{mode}` is invalid")]
    InvalidVariantMode {
        /// the mode string that couldn't be parsed
        mode: String,
    },

    /// Represents a token path that doesn't resolve to a position inside a
    /// [`DataContainer`]
    ///
    /// [`DataContainer`]: crate::dc::DataContainer
    #[error("No fuzzable position found at `{path}`")]
    TokenNotFound {
        /// the path that couldn't be resolved
        path: String,
    },

    /// Represents an attempt to place a token inside a container that
    /// doesn't expose any fuzzable positions
    #[error("The `{container_type}` container doesn't support tokenization")]
    TokenizationUnsupported {
        /// `get_type()` of the offending container
        container_type: &'static str,
    },

    /// Represents a failure to parse a byte-buffer as JSON
    #[error("Could not parse the given post-data as JSON")]
    JsonParseError {
        /// underlying source error-type
        #[from]
        source: serde_json::Error,
    },

    /// Represents a post-data payload that doesn't match the wire format a
    /// container-specific parser expected
    ///
    /// the container factory catches this locally and tries the next format
    /// in priority order, so it never surfaces from [`dc_from_hdrs_post`]
    ///
    /// [`dc_from_hdrs_post`]: crate::dc::dc_from_hdrs_post
    #[error("The post-data doesn't match the `{expected}` wire format: {reason}")]
    UnmatchedWireFormat {
        /// the wire format the parser was looking for
        expected: &'static str,

        /// why the payload was rejected
        reason: &'static str,
    },

    /// Represents an invalid parameter passed to some function or constructor
    #[error("Invalid parameter provided, {message}: {param}")]
    InvalidParameter {
        /// the failing parameter
        param: String,

        /// the associated message to help the user
        message: &'static str,
    },
}
