//! mutants: one fuzzed copy of a request per (position, payload) pair
use std::fmt::{self, Display, Formatter};

use crate::dc::{DataContainer, DataToken};
use crate::request::FuzzableRequest;

pub mod filecontent;
pub mod json;
pub mod postdata;

/// parameter names that are never fuzzed
///
/// these carry framework round-trip state (ASP.NET view state, JSF view
/// state); payloads in them only produce server-side deserialization noise,
/// not findings
pub const IGNORED_PARAMETERS: [&str; 5] = [
    "__viewstate",
    "__eventvalidation",
    "__eventtarget",
    "__eventargument",
    "javax.faces.viewstate",
];

/// `true` when `name` is on the never-fuzz list
#[must_use]
pub(crate) fn is_ignored_parameter(name: &str) -> bool {
    IGNORED_PARAMETERS
        .iter()
        .any(|ignored| ignored.eq_ignore_ascii_case(name))
}

/// which creation strategy produced a mutant
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MutantKind {
    /// a payload written into one post-data parameter
    PostData,

    /// a payload embedded in the content of one uploaded file
    FileContent,

    /// a payload written into one JSON leaf
    Json,
}

impl Display for MutantKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::PostData => "post-data",
            Self::FileContent => "file content",
            Self::Json => "JSON",
        };

        write!(f, "{kind}")
    }
}

/// a request with exactly one position replaced by a payload
///
/// the fuzzed container travels inside the request; the token it carries
/// records which position changed and what it held before
#[derive(Clone, Debug)]
pub struct Mutant {
    request: FuzzableRequest,
    kind: MutantKind,
}

impl Mutant {
    pub(crate) const fn new(request: FuzzableRequest, kind: MutantKind) -> Self {
        Self { request, kind }
    }

    /// the fuzzed request, ready to send
    #[must_use]
    pub const fn request(&self) -> &FuzzableRequest {
        &self.request
    }

    /// which creation strategy produced this mutant
    #[must_use]
    pub const fn kind(&self) -> MutantKind {
        self.kind
    }

    /// the fuzzed body
    #[must_use]
    pub fn container(&self) -> Option<&dyn DataContainer> {
        self.request.data()
    }

    /// the token marking the fuzzed position
    #[must_use]
    pub fn token(&self) -> Option<&DataToken> {
        self.request.data().and_then(DataContainer::token)
    }

    /// human-readable description of where and what was fuzzed, for
    /// vulnerability reports
    #[must_use]
    pub fn found_at(&self) -> String {
        let parameter = self.token().map_or("", DataToken::name);

        format!(
            "\"{}\", using HTTP method {}. The sent post-data was: \"{}\" \
             which modifies the \"{}\" parameter.",
            self.request.url(),
            self.request.method(),
            String::from_utf8_lossy(&self.request.body()),
            parameter,
        )
    }
}

impl Display for Mutant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} mutant for {}", self.kind, self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewstate_family_is_ignored_case_insensitively() {
        assert!(is_ignored_parameter("__VIEWSTATE"));
        assert!(is_ignored_parameter("__EventValidation"));
        assert!(is_ignored_parameter("javax.faces.ViewState"));
        assert!(!is_ignored_parameter("username"));
    }
}
