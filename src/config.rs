//! configuration surface consumed by the mutant-creation layer
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// knobs that gate how mutants are produced from a fuzzable request
///
/// # Examples
///
/// ```
/// # use formfuzz::config::FuzzerConfig;
/// let config = FuzzerConfig::default();
///
/// assert!(!config.fuzz_form_files);
/// assert_eq!(config.fuzzed_files_extension, "gif");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FuzzerConfig {
    /// when enabled, file inputs get their content fuzzed through
    /// synthetic-file wrappers (see `Mutant::file_content_mutants`)
    pub fuzz_form_files: bool,

    /// extension used for synthetic upload files when the original request
    /// doesn't reveal one
    pub fuzzed_files_extension: String,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            fuzz_form_files: false,
            fuzzed_files_extension: String::from("gif"),
        }
    }
}
