//! JSON mutant creation: one mutant per (leaf, payload) pair
use percent_encoding::percent_decode;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::dc::{DataContainer, JsonContainer, TokenPath};
use crate::mutants::{Mutant, MutantKind};
use crate::request::FuzzableRequest;

/// `true` when the body reads as a url-encoded form: every `&`-separated
/// chunk is `key=value` with a plain, non-empty key
///
/// ambiguous bodies that parse both ways are claimed by the url-encoded side,
/// so this check runs before any JSON parsing is attempted
fn looks_like_urlencoded(body: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(body) else {
        return false;
    };

    if !text.contains('=') {
        return false;
    }

    text.split('&').all(|chunk| {
        chunk.split_once('=').is_some_and(|(key, _)| {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| !c.is_whitespace() && !"{}[]\"".contains(c))
        })
    })
}

/// parse the body as JSON, url-decoding it first when the raw bytes don't
/// parse directly
fn parse_json_body(body: &[u8]) -> Option<Value> {
    if let Ok(value) = serde_json::from_slice(body) {
        return Some(value);
    }

    let decoded: Vec<u8> = percent_decode(body).collect();
    serde_json::from_slice(&decoded).ok()
}

impl Mutant {
    /// create one mutant per fuzzable JSON leaf and payload
    ///
    /// a body that reads as url-encoded form data is never treated as JSON,
    /// even when it would also parse as such; a percent-encoded JSON body is
    /// decoded and accepted. String leaves take any payload (`append` puts
    /// it after the original text); number leaves only take all-digit
    /// payloads, anything else is skipped for that leaf so the document's
    /// schema survives. Document structure is always preserved: exactly one
    /// leaf changes per mutant
    ///
    /// # Examples
    ///
    /// ```
    /// # use formfuzz::headers::Headers;
    /// # use formfuzz::mutants::Mutant;
    /// # use formfuzz::request::FuzzableRequest;
    /// let headers: Headers = [("content-type", "application/json")].into_iter().collect();
    /// let request = FuzzableRequest::from_parts(
    ///     "http://target.example/api",
    ///     "POST",
    ///     headers,
    ///     br#"{"name": "x", "age": 30}"#,
    /// )
    /// .unwrap();
    ///
    /// let mutants = Mutant::json_mutants(&request, &["abc"], false);
    ///
    /// // "abc" fits the string leaf but not the number leaf
    /// assert_eq!(mutants.len(), 1);
    /// assert_eq!(mutants[0].token().unwrap().name(), "name");
    /// ```
    #[instrument(skip(request, payloads), level = "debug")]
    #[must_use]
    pub fn json_mutants(request: &FuzzableRequest, payloads: &[&str], append: bool) -> Vec<Self> {
        let body = request.body();

        if body.is_empty() {
            return Vec::new();
        }

        if looks_like_urlencoded(&body) {
            trace!("body reads as url-encoded form data; not creating JSON mutants");
            return Vec::new();
        }

        let Some(value) = parse_json_body(&body) else {
            trace!("body isn't JSON; no JSON mutants");
            return Vec::new();
        };

        let base = JsonContainer::new(value);
        let paths = base.token_paths();

        let mut mutants = Vec::with_capacity(paths.len() * payloads.len());

        for path in &paths {
            let TokenPath::Nested(dotted) = path else {
                continue;
            };

            let Some(leaf) = base.leaf(dotted) else {
                continue;
            };

            for payload in payloads {
                let fuzzed_value = match leaf {
                    Value::String(original) => {
                        if append {
                            format!("{original}{payload}")
                        } else {
                            (*payload).to_string()
                        }
                    }
                    Value::Number(original) => {
                        // a non-digit payload would turn the number into a
                        // string and break the document's schema
                        if !payload.chars().all(|c| c.is_ascii_digit()) || payload.is_empty() {
                            trace!(%path, %payload, "payload doesn't fit a number leaf; skipping");
                            continue;
                        }

                        if append {
                            format!("{original}{payload}")
                        } else {
                            (*payload).to_string()
                        }
                    }
                    _ => continue,
                };

                let mut fuzzed = base.clone();

                if let Err(error) = fuzzed.set_token(path, &fuzzed_value) {
                    trace!(%error, %path, "skipping untokenizable leaf");
                    continue;
                }

                let mut fuzzed_request = request.clone();
                fuzzed_request.set_data(Box::new(fuzzed));

                mutants.push(Self::new(fuzzed_request, MutantKind::Json));
            }
        }

        mutants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Headers;

    fn json_request(body: &[u8]) -> FuzzableRequest {
        let headers: Headers = [("content-type", "application/json")].into_iter().collect();

        FuzzableRequest::from_parts("http://target.example/api", "POST", headers, body).unwrap()
    }

    fn bodies(mutants: &[Mutant]) -> Vec<String> {
        mutants
            .iter()
            .map(|mutant| String::from_utf8(mutant.request().body()).unwrap())
            .collect()
    }

    #[test]
    fn one_mutant_per_string_leaf_and_payload() {
        let request = json_request(br#"{"a": "1", "b": "2"}"#);
        let mutants = Mutant::json_mutants(&request, &["x", "y"], false);

        assert_eq!(
            bodies(&mutants),
            vec![
                r#"{"a":"x","b":"2"}"#,
                r#"{"a":"y","b":"2"}"#,
                r#"{"a":"1","b":"x"}"#,
                r#"{"a":"1","b":"y"}"#,
            ]
        );
    }

    #[test]
    fn number_leaves_skip_non_digit_payloads() {
        let request = json_request(br#"{"age": 30, "name": "x"}"#);

        let mutants = Mutant::json_mutants(&request, &["abc"], false);
        assert_eq!(bodies(&mutants), vec![r#"{"age":30,"name":"abc"}"#]);

        let digit_mutants = Mutant::json_mutants(&request, &["55"], false);
        assert_eq!(
            bodies(&digit_mutants),
            vec![r#"{"age":55,"name":"x"}"#, r#"{"age":30,"name":"55"}"#]
        );
    }

    #[test]
    fn append_mode_keeps_the_original_text() {
        let request = json_request(br#"{"name": "admin"}"#);

        let mutants = Mutant::json_mutants(&request, &["'--"], true);

        assert_eq!(bodies(&mutants), vec![r#"{"name":"admin'--"}"#]);
    }

    #[test]
    fn urlencoded_bodies_are_never_treated_as_json() {
        let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
            .into_iter()
            .collect();
        let request =
            FuzzableRequest::from_parts("http://target.example/", "POST", headers, b"a=3&b=2")
                .unwrap();

        assert!(Mutant::json_mutants(&request, &["x"], false).is_empty());
    }

    #[test]
    fn percent_encoded_json_is_decoded_first() {
        // {"a": "b"} with the braces and quotes percent-encoded
        let headers: Headers = [("content-type", "text/plain")].into_iter().collect();
        let request = FuzzableRequest::from_parts(
            "http://target.example/",
            "POST",
            headers,
            b"%7B%22a%22%3A%20%22b%22%7D",
        )
        .unwrap();

        let mutants = Mutant::json_mutants(&request, &["x"], false);

        assert_eq!(bodies(&mutants), vec![r#"{"a":"x"}"#]);
    }

    #[test]
    fn root_scalar_bodies_are_fuzzable() {
        let string_root = json_request(br#""admin""#);
        let mutants = Mutant::json_mutants(&string_root, &["x", "y"], false);
        assert_eq!(bodies(&mutants), vec![r#""x""#, r#""y""#]);
        assert_eq!(mutants[0].token().unwrap().original_value(), "admin");

        let number_root = json_request(b"5");
        let digit_mutants = Mutant::json_mutants(&number_root, &["55"], false);
        assert_eq!(bodies(&digit_mutants), vec!["55"]);

        // the number-leaf guard applies at the root too
        assert!(Mutant::json_mutants(&number_root, &["abc"], false).is_empty());
    }

    #[test]
    fn nested_structure_is_preserved() {
        let request = json_request(br#"{"user": {"roles": ["admin", "ops"]}}"#);

        let mutants = Mutant::json_mutants(&request, &["x"], false);

        assert_eq!(
            bodies(&mutants),
            vec![
                r#"{"user":{"roles":["x","ops"]}}"#,
                r#"{"user":{"roles":["admin","x"]}}"#,
            ]
        );
        assert_eq!(mutants[0].kind(), MutantKind::Json);
    }
}
