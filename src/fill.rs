//! plausible filler values for form fields and synthetic upload files
//!
//! web applications routinely reject requests whose untouched fields are
//! empty or type-mismatched ("email is required", "age must be a number"),
//! which would mask the one field actually under test. `smart_fill` produces
//! values that clear those first-line validations; `file_from_template`
//! builds upload payloads that pass naive magic-byte checks.
use tracing::trace;

/// pick a plausible value for a parameter, keyed off its name
///
/// # Examples
///
/// ```
/// # use formfuzz::fill::smart_fill;
/// assert_eq!(smart_fill("user_email"), "fuzz@fuzzing.example");
/// assert_eq!(smart_fill("phone_number"), "55550178");
/// assert_eq!(smart_fill("something_else"), "56");
/// ```
#[must_use]
pub fn smart_fill(parameter_name: &str) -> &'static str {
    let name = parameter_name.to_lowercase();

    let contains = |needles: &[&str]| needles.iter().any(|needle| name.contains(needle));

    if contains(&["mail"]) {
        "fuzz@fuzzing.example"
    } else if contains(&["pass", "pwd"]) {
        "FrAmE30."
    } else if contains(&["user", "name", "login"]) {
        "John8212"
    } else if contains(&["phone", "number", "zip", "id", "age"]) {
        "55550178"
    } else if contains(&["url", "web", "site"]) {
        "http://fuzzing.example/"
    } else if contains(&["date", "day", "birth"]) {
        "01/01/2013"
    } else {
        // anything unrecognized gets digits; they satisfy both "non-empty"
        // and "must be a number" checks
        "56"
    }
}

/// magic-byte header for a file extension, used to wrap fuzzing payloads in
/// something that resembles a real file of that type
fn template_header(extension: &str) -> &'static [u8] {
    match extension.to_lowercase().as_str() {
        "gif" => b"GIF89a",
        "png" => &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a],
        "jpg" | "jpeg" => &[0xff, 0xd8, 0xff, 0xe0],
        "bmp" => b"BM",
        _ => b"",
    }
}

/// build a synthetic upload file: valid-looking header bytes for the given
/// extension with `payload` embedded right after them
///
/// unknown extensions get the payload verbatim. Returns the file content and
/// a deterministic file name so that two encodes of the same mutant are
/// byte-identical.
#[must_use]
pub fn file_from_template(extension: &str, payload: &[u8]) -> (Vec<u8>, String) {
    let header = template_header(extension);

    if header.is_empty() {
        trace!(%extension, "no file template for extension; sending payload as-is");
    }

    let mut content = Vec::with_capacity(header.len() + payload.len());
    content.extend_from_slice(header);
    content.extend_from_slice(payload);

    (content, format!("fuzzfile.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_get_magic_bytes() {
        let (content, name) = file_from_template("gif", b"<payload>");

        assert!(content.starts_with(b"GIF89a"));
        assert!(content.ends_with(b"<payload>"));
        assert_eq!(name, "fuzzfile.gif");
    }

    #[test]
    fn unknown_extension_passes_payload_through() {
        let (content, _) = file_from_template("xyz", b"raw");
        assert_eq!(content, b"raw");
    }

    #[test]
    fn template_output_is_deterministic() {
        assert_eq!(
            file_from_template("png", b"abc"),
            file_from_template("png", b"abc")
        );
    }

    #[test]
    fn fill_values_are_never_empty() {
        for name in ["email", "password", "username", "phone", "website", "dob", "x"] {
            assert!(!smart_fill(name).is_empty());
        }
    }
}
