//! post-data mutant creation: one mutant per (parameter occurrence, payload)
use tracing::{instrument, trace};

use crate::config::FuzzerConfig;
use crate::dc::TokenPath;
use crate::fields::{FormField, InputType};
use crate::fill::{file_from_template, smart_fill};
use crate::form_params::FormParameters;
use crate::mutants::{is_ignored_parameter, Mutant, MutantKind};
use crate::request::FuzzableRequest;

/// give every untouched field a value that clears first-line validations:
/// empty text fields get a name-keyed plausible value, empty file fields get
/// a synthetic template file
pub(crate) fn smart_fill_form(params: &mut FormParameters, config: &FuzzerConfig) {
    let coordinates: Vec<(String, usize)> = params
        .occurrences()
        .map(|(name, index, _)| (name.to_string(), index))
        .collect();

    for (name, index) in coordinates {
        let Some(field) = params.field_mut(&name, index) else {
            continue;
        };

        match field {
            FormField::Generic { value, .. } if value.is_empty() => {
                *value = smart_fill(&name).to_string();
            }
            FormField::File {
                value, file_name, ..
            } if value.is_none() => {
                let extension = file_name
                    .as_deref()
                    .and_then(|file_name| file_name.rsplit('.').next())
                    .unwrap_or(&config.fuzzed_files_extension)
                    .to_string();

                let (content, synthetic_name) = file_from_template(&extension, b"");

                *value = Some(content);

                if file_name.is_none() {
                    *file_name = Some(synthetic_name);
                }
            }
            _ => {}
        }
    }
}

impl Mutant {
    /// create one mutant per fuzzable post-data occurrence and payload
    ///
    /// only containers that expose form parameters are fuzzable this way;
    /// anything else produces no mutants. File fields and framework
    /// round-trip parameters ([`IGNORED_PARAMETERS`]) are skipped. An empty
    /// `fuzzable_params` list means every parameter is fair game. With
    /// `append` set, the payload lands after the occurrence's original value
    /// instead of replacing it
    ///
    /// every mutant starts from a smart-filled copy of the body, so the one
    /// position under test is the only implausible value in it
    ///
    /// [`IGNORED_PARAMETERS`]: crate::mutants::IGNORED_PARAMETERS
    ///
    /// # Examples
    ///
    /// ```
    /// # use formfuzz::config::FuzzerConfig;
    /// # use formfuzz::headers::Headers;
    /// # use formfuzz::mutants::Mutant;
    /// # use formfuzz::request::FuzzableRequest;
    /// let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
    ///     .into_iter()
    ///     .collect();
    /// let request =
    ///     FuzzableRequest::from_parts("http://target.example/", "POST", headers, b"a=&b=")
    ///         .unwrap();
    ///
    /// let mutants = Mutant::post_data_mutants(
    ///     &request,
    ///     &["abc", "def"],
    ///     &[],
    ///     false,
    ///     &FuzzerConfig::default(),
    /// );
    ///
    /// // 2 parameters x 2 payloads
    /// assert_eq!(mutants.len(), 4);
    /// ```
    #[instrument(skip(request, payloads, config), level = "debug")]
    #[must_use]
    pub fn post_data_mutants(
        request: &FuzzableRequest,
        payloads: &[&str],
        fuzzable_params: &[&str],
        append: bool,
        config: &FuzzerConfig,
    ) -> Vec<Self> {
        let Some(container) = request.data() else {
            return Vec::new();
        };

        let Some(original_params) = container.form_params() else {
            trace!(
                container_type = container.get_type(),
                "container doesn't expose form parameters; no post-data mutants"
            );
            return Vec::new();
        };

        let mut base = dyn_clone::clone_box(container);

        if let Some(params) = base.form_params_mut() {
            smart_fill_form(params, config);
        }

        // original (pre-fill) values drive append mode
        let targets: Vec<(String, usize, String)> = original_params
            .occurrences()
            .filter(|(name, _, field)| {
                field.input_type() != InputType::File && !is_ignored_parameter(name)
            })
            .filter(|(name, _, _)| {
                fuzzable_params.is_empty() || fuzzable_params.iter().any(|param| param == name)
            })
            .map(|(name, index, field)| (name.to_string(), index, field.value().into_owned()))
            .collect();

        let mut mutants = Vec::with_capacity(targets.len() * payloads.len());

        for (name, index, original) in &targets {
            for payload in payloads {
                let value = if append {
                    format!("{original}{payload}")
                } else {
                    (*payload).to_string()
                };

                let mut fuzzed = base.clone();
                let path = TokenPath::param(name.clone(), *index);

                if let Err(error) = fuzzed.set_token(&path, &value) {
                    trace!(%error, %path, "skipping untokenizable position");
                    continue;
                }

                let mut fuzzed_request = request.clone();
                fuzzed_request.set_data(fuzzed);

                mutants.push(Self::new(fuzzed_request, MutantKind::PostData));
            }
        }

        mutants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Headers;

    fn post_request(body: &[u8]) -> FuzzableRequest {
        let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
            .into_iter()
            .collect();

        FuzzableRequest::from_parts("http://target.example/submit", "POST", headers, body)
            .unwrap()
    }

    fn bodies(mutants: &[Mutant]) -> Vec<String> {
        mutants
            .iter()
            .map(|mutant| String::from_utf8(mutant.request().body()).unwrap())
            .collect()
    }

    #[test]
    fn one_mutant_per_parameter_and_payload_in_order() {
        let request = post_request(b"a=&b=");

        let mutants = Mutant::post_data_mutants(
            &request,
            &["abc", "def"],
            &[],
            false,
            &FuzzerConfig::default(),
        );

        // parameter-major, payload-minor; untouched fields are smart-filled
        assert_eq!(
            bodies(&mutants),
            vec!["a=abc&b=56", "a=def&b=56", "a=56&b=abc", "a=56&b=def"]
        );
    }

    #[test]
    fn token_records_the_fuzzed_position() {
        let request = post_request(b"a=1&b=2");

        let mutants =
            Mutant::post_data_mutants(&request, &["x"], &[], false, &FuzzerConfig::default());

        assert_eq!(mutants[0].token().unwrap().name(), "a");
        assert_eq!(mutants[0].token().unwrap().original_value(), "1");
        assert_eq!(mutants[1].token().unwrap().name(), "b");
    }

    #[test]
    fn append_mode_keeps_the_original_value() {
        let request = post_request(b"a=orig");

        let mutants =
            Mutant::post_data_mutants(&request, &["<x>"], &[], true, &FuzzerConfig::default());

        assert_eq!(bodies(&mutants), vec!["a=orig%3Cx%3E"]);
        assert_eq!(mutants[0].token().unwrap().value(), "orig<x>");
    }

    #[test]
    fn repeated_names_fuzz_each_occurrence_separately() {
        let request = post_request(b"id=1&id=2");

        let mutants =
            Mutant::post_data_mutants(&request, &["x"], &[], false, &FuzzerConfig::default());

        assert_eq!(bodies(&mutants), vec!["id=x&id=2", "id=1&id=x"]);
    }

    #[test]
    fn framework_state_parameters_are_skipped() {
        let request = post_request(b"__VIEWSTATE=AAAA&user=");

        let mutants =
            Mutant::post_data_mutants(&request, &["x"], &[], false, &FuzzerConfig::default());

        assert_eq!(mutants.len(), 1);
        assert_eq!(mutants[0].token().unwrap().name(), "user");
    }

    #[test]
    fn fuzzable_params_restricts_the_targets() {
        let request = post_request(b"a=1&b=2&c=3");

        let mutants =
            Mutant::post_data_mutants(&request, &["x"], &["b"], false, &FuzzerConfig::default());

        assert_eq!(bodies(&mutants), vec!["a=1&b=x&c=3"]);
    }

    #[test]
    fn non_form_bodies_produce_no_mutants() {
        let headers: Headers = [("content-type", "application/json")].into_iter().collect();
        let request =
            FuzzableRequest::from_parts("http://target.example/", "POST", headers, br#"{"a": 1}"#)
                .unwrap();

        let mutants =
            Mutant::post_data_mutants(&request, &["x"], &[], false, &FuzzerConfig::default());

        assert!(mutants.is_empty());
    }

    #[test]
    fn bodyless_requests_produce_no_mutants() {
        let request = FuzzableRequest::from_url("http://target.example/").unwrap();

        let mutants =
            Mutant::post_data_mutants(&request, &["x"], &[], false, &FuzzerConfig::default());

        assert!(mutants.is_empty());
    }
}
