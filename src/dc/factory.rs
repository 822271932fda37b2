//! construction of the right container for a request body
use tracing::{debug, instrument};

use crate::dc::json::JsonContainer;
use crate::dc::multipart::MultipartContainer;
use crate::dc::plain::PlainContainer;
use crate::dc::urlencoded::URLEncodedForm;
use crate::dc::xmlrpc::XmlRpcContainer;
use crate::dc::DataContainer;
use crate::form_params::FormParameters;
use crate::headers::Headers;

/// build the most specific container that accepts the given post-data
///
/// formats are tried in priority order: multipart, JSON, XML-RPC,
/// url-encoded. Each parser's rejection is final for that format only; a
/// body nothing claims ends up in a [`PlainContainer`], so no request body
/// is ever lost
///
/// # Examples
///
/// ```
/// # use formfuzz::dc::dc_from_hdrs_post;
/// # use formfuzz::headers::Headers;
/// let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
///     .into_iter()
///     .collect();
///
/// let container = dc_from_hdrs_post(&headers, b"a=3&b=2");
///
/// assert_eq!(container.get_type(), "URL encoded form");
/// assert_eq!(container.to_wire(), b"a=3&b=2");
/// ```
#[instrument(skip(body), level = "debug")]
#[must_use]
pub fn dc_from_hdrs_post(headers: &Headers, body: &[u8]) -> Box<dyn DataContainer> {
    match MultipartContainer::from_postdata(headers, body) {
        Ok(container) => return Box::new(container),
        Err(error) => debug!(%error, "post-data isn't multipart"),
    }

    match JsonContainer::from_postdata(headers, body) {
        Ok(container) => return Box::new(container),
        Err(error) => debug!(%error, "post-data isn't JSON"),
    }

    match XmlRpcContainer::from_postdata(headers, body) {
        Ok(container) => return Box::new(container),
        Err(error) => debug!(%error, "post-data isn't XML-RPC"),
    }

    match URLEncodedForm::from_postdata(headers, body) {
        Ok(container) => return Box::new(container),
        Err(error) => debug!(%error, "post-data isn't a url-encoded form"),
    }

    debug!("no structured format claimed the post-data; keeping it verbatim");
    Box::new(PlainContainer::from_postdata(headers, body))
}

/// build the container a parsed form should be submitted with
///
/// multipart when the form has file fields or declares a multipart enctype,
/// url-encoded otherwise; decided once, here, so every later consumer of the
/// container agrees on the wire format
#[instrument(skip(params), level = "debug")]
#[must_use]
pub fn dc_from_form_params(params: FormParameters) -> Box<dyn DataContainer> {
    let multipart = params.has_file_fields()
        || params.form_encoding().to_lowercase().contains("multipart");

    if multipart {
        Box::new(MultipartContainer::new(params))
    } else {
        Box::new(URLEncodedForm::new(params))
    }
}
