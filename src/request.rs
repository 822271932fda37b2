//! a single fuzzable HTTP request: url, method, headers and body
use std::fmt::{self, Display, Formatter};

use tracing::{error, instrument};
use url::Url;

use crate::dc::{dc_from_hdrs_post, DataContainer};
use crate::error::FormFuzzError;
use crate::headers::Headers;

/// everything needed to (re)send one request, with its body held as a typed
/// [`DataContainer`]
///
/// cloning is the hand-off mechanism between consumers: each mutant gets its
/// own deep copy and mutates it freely
///
/// # Examples
///
/// ```
/// # use formfuzz::request::FuzzableRequest;
/// let request = FuzzableRequest::from_url("http://target.example/login").unwrap();
///
/// assert_eq!(request.method(), "GET");
/// assert!(request.data().is_none());
///
/// assert!(FuzzableRequest::from_url("not a url").is_err());
/// ```
#[derive(Clone, Debug)]
pub struct FuzzableRequest {
    url: Url,
    method: String,
    headers: Headers,
    data: Option<Box<dyn DataContainer>>,
}

impl FuzzableRequest {
    /// build a bodyless GET request for `url`
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::InvalidUrl`] when `url` can't be parsed
    #[instrument(level = "trace")]
    pub fn from_url(url: &str) -> Result<Self, FormFuzzError> {
        let parsed = Url::parse(url).map_err(|source| {
            error!(%url, "could not parse url");
            FormFuzzError::InvalidUrl {
                source,
                url: url.to_string(),
            }
        })?;

        Ok(Self {
            url: parsed,
            method: String::from("GET"),
            headers: Headers::new(),
            data: None,
        })
    }

    /// build a request from raw parts, running the container factory over
    /// the body when one is present
    ///
    /// # Errors
    ///
    /// [`FormFuzzError::InvalidUrl`] when `url` can't be parsed
    pub fn from_parts(
        url: &str,
        method: &str,
        headers: Headers,
        body: &[u8],
    ) -> Result<Self, FormFuzzError> {
        let mut request = Self::from_url(url)?;
        request.set_method(method);

        let data = if body.is_empty() {
            None
        } else {
            Some(dc_from_hdrs_post(&headers, body))
        };

        request.headers = headers;
        request.data = data;

        Ok(request)
    }

    /// the target url
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// the HTTP method, always upper-case
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// set the HTTP method; stored upper-cased
    pub fn set_method(&mut self, method: &str) {
        self.method = method.to_uppercase();
    }

    /// the headers the request was seen with
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// the typed body, when the request carries one
    ///
    /// the `'static` bound on the trait object matches the boxed contents,
    /// so a caller can `clone_box` the container and hand the copy to
    /// [`set_data`](Self::set_data)
    #[must_use]
    pub fn data(&self) -> Option<&(dyn DataContainer + 'static)> {
        self.data.as_deref()
    }

    /// mutable access to the typed body
    pub fn data_mut(&mut self) -> Option<&mut Box<dyn DataContainer>> {
        self.data.as_mut()
    }

    /// attach (or replace) the typed body
    pub fn set_data(&mut self, data: Box<dyn DataContainer>) {
        self.data = Some(data);
    }

    /// the body bytes exactly as they'd be sent; empty for bodyless requests
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        self.data
            .as_ref()
            .map(|data| data.to_wire())
            .unwrap_or_default()
    }

    /// the headers to actually send: stored headers overlaid with the
    /// container's requirements and a content-length that matches the
    /// serialized body byte-for-byte
    #[must_use]
    pub fn outgoing_headers(&self) -> Headers {
        let mut outgoing = self.headers.clone();

        if let Some(data) = &self.data {
            for (name, value) in data.get_headers().iter() {
                outgoing.set(name, value);
            }

            outgoing.set("Content-Length", data.to_wire().len().to_string());
        }

        outgoing
    }

    /// names of the body's file-upload parameters; empty when the body isn't
    /// a form
    #[must_use]
    pub fn file_variables(&self) -> Vec<String> {
        self.data
            .as_ref()
            .and_then(|data| data.form_params())
            .map(|params| {
                params
                    .file_variables()
                    .into_iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Display for FuzzableRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urlencoded_headers() -> Headers {
        [("content-type", "application/x-www-form-urlencoded")]
            .into_iter()
            .collect()
    }

    #[test]
    fn invalid_url_is_an_error() {
        assert!(FuzzableRequest::from_url("://nope").is_err());
    }

    #[test]
    fn from_parts_builds_a_typed_body() {
        let request = FuzzableRequest::from_parts(
            "http://target.example/submit",
            "post",
            urlencoded_headers(),
            b"a=3&b=2",
        )
        .unwrap();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.data().unwrap().get_type(), "URL encoded form");
        assert_eq!(request.body(), b"a=3&b=2");
    }

    #[test]
    fn content_length_matches_the_wire_bytes_exactly() {
        let request = FuzzableRequest::from_parts(
            "http://target.example/submit",
            "POST",
            urlencoded_headers(),
            b"a=3&b=2",
        )
        .unwrap();

        let outgoing = request.outgoing_headers();

        assert_eq!(
            outgoing.get("content-length").unwrap(),
            request.body().len().to_string()
        );
        assert_eq!(
            outgoing.content_type(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn cloned_requests_are_independent() {
        let request = FuzzableRequest::from_parts(
            "http://target.example/submit",
            "POST",
            urlencoded_headers(),
            b"a=3",
        )
        .unwrap();

        let mut copy = request.clone();
        copy.data_mut()
            .unwrap()
            .set_token(&crate::dc::TokenPath::param("a", 0), "payload")
            .unwrap();

        assert_eq!(request.body(), b"a=3");
        assert_eq!(copy.body(), b"a=payload");
    }

    #[test]
    fn container_clone_round_trips_through_set_data() {
        let request = FuzzableRequest::from_parts(
            "http://target.example/submit",
            "POST",
            urlencoded_headers(),
            b"a=3",
        )
        .unwrap();

        // cloning the borrowed container must produce an owned box that can
        // be attached to another request
        let mut fuzzed = dyn_clone::clone_box(request.data().unwrap());
        fuzzed
            .set_token(&crate::dc::TokenPath::param("a", 0), "x")
            .unwrap();

        let mut copy = request.clone();
        copy.set_data(fuzzed);

        assert_eq!(copy.body(), b"a=x");
        assert_eq!(request.body(), b"a=3");
    }

    #[test]
    fn bodyless_request_has_no_file_variables() {
        let request = FuzzableRequest::from_url("http://target.example/").unwrap();

        assert!(request.file_variables().is_empty());
        assert!(request.body().is_empty());
    }
}
