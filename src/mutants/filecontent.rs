//! file-content mutant creation: payloads embedded inside uploaded files
use tracing::{instrument, trace};

use crate::config::FuzzerConfig;
use crate::dc::{DataContainer, MultipartContainer};
use crate::mutants::postdata::smart_fill_form;
use crate::mutants::{Mutant, MutantKind};
use crate::request::FuzzableRequest;

impl Mutant {
    /// create one mutant per file-upload field and payload, with the payload
    /// embedded in a synthetic file's content
    ///
    /// requires all of: file fuzzing enabled in `config`, a body that
    /// exposes form parameters, and at least one file field. The body is
    /// switched to a multipart container restricted to file tokens, so plain
    /// fields keep their (smart-filled) values while only file content
    /// changes. The synthetic file's extension comes from the original
    /// upload's name when there is one, else from
    /// `config.fuzzed_files_extension`
    #[instrument(skip(request, payloads, config), level = "debug")]
    #[must_use]
    pub fn file_content_mutants(
        request: &FuzzableRequest,
        payloads: &[&str],
        config: &FuzzerConfig,
    ) -> Vec<Self> {
        if !config.fuzz_form_files {
            return Vec::new();
        }

        let Some(params) = request.data().and_then(DataContainer::form_params) else {
            trace!("body doesn't expose form parameters; no file-content mutants");
            return Vec::new();
        };

        if !params.has_file_fields() {
            return Vec::new();
        }

        let mut filled = params.clone();
        smart_fill_form(&mut filled, config);

        let base =
            MultipartContainer::with_only_file_tokens(filled, config.fuzzed_files_extension.clone());
        let paths = base.token_paths();

        let mut mutants = Vec::with_capacity(paths.len() * payloads.len());

        for path in &paths {
            for payload in payloads {
                let mut fuzzed = base.clone();

                if let Err(error) = fuzzed.set_token(path, payload) {
                    trace!(%error, %path, "skipping untokenizable file field");
                    continue;
                }

                let mut fuzzed_request = request.clone();
                fuzzed_request.set_data(Box::new(fuzzed));

                mutants.push(Self::new(fuzzed_request, MutantKind::FileContent));
            }
        }

        mutants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Headers;

    const BOUNDARY: &str = "XyZ";

    fn upload_request() -> FuzzableRequest {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nhi\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
             filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n\
             --{BOUNDARY}--\r\n\r\n"
        );
        let headers: Headers = [(
            "content-type".to_string(),
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )]
        .into_iter()
        .collect();

        FuzzableRequest::from_parts("http://target.example/upload", "POST", headers, body.as_bytes())
            .unwrap()
    }

    fn file_fuzzing_config() -> FuzzerConfig {
        FuzzerConfig {
            fuzz_form_files: true,
            ..FuzzerConfig::default()
        }
    }

    #[test]
    fn disabled_by_default() {
        let mutants = Mutant::file_content_mutants(
            &upload_request(),
            &["payload"],
            &FuzzerConfig::default(),
        );

        assert!(mutants.is_empty());
    }

    #[test]
    fn payload_lands_inside_a_synthetic_file() {
        let mutants =
            Mutant::file_content_mutants(&upload_request(), &["payload"], &file_fuzzing_config());

        assert_eq!(mutants.len(), 1);
        assert_eq!(mutants[0].kind(), MutantKind::FileContent);

        let body = mutants[0].request().body();
        let text = String::from_utf8_lossy(&body);

        // extension taken from the original upload name
        assert!(text.contains("filename=\"fuzzfile.png\""));
        assert!(body.windows(7).any(|window| window == b"payload"));

        // the plain field is still present and untouched
        assert!(text.contains("name=\"comment\""));
        assert!(text.contains("hi"));
    }

    #[test]
    fn forms_without_file_fields_produce_no_mutants() {
        let headers: Headers = [("content-type", "application/x-www-form-urlencoded")]
            .into_iter()
            .collect();
        let request =
            FuzzableRequest::from_parts("http://target.example/", "POST", headers, b"a=1")
                .unwrap();

        let mutants =
            Mutant::file_content_mutants(&request, &["payload"], &file_fuzzing_config());

        assert!(mutants.is_empty());
    }

    #[test]
    fn one_mutant_per_file_field_and_payload() {
        let mutants = Mutant::file_content_mutants(
            &upload_request(),
            &["one", "two"],
            &file_fuzzing_config(),
        );

        assert_eq!(mutants.len(), 2);

        for mutant in &mutants {
            assert_eq!(mutant.token().unwrap().name(), "image");
        }
    }
}
