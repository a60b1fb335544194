//! Helpers for the `data:<mime>;base64,<payload>` representation used at both
//! edges of the pipeline: callers upload images as data URIs, and the service
//! only ever returns images as data URIs.
use crate::error::{AppError, AppResult};

/// Strip the `data:<mime>;base64,` prefix from a caller-supplied data URI,
/// returning the bare base64 payload.
///
/// Splitting happens at the first comma; a URI without one is rejected
/// explicitly rather than passed through as garbage.
pub fn strip_data_uri_prefix(uri: &str) -> AppResult<&str> {
    match uri.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => Ok(payload),
        _ => Err(AppError::BadRequest(
            "expected a base64 data URI (data:<mime>;base64,<payload>)".to_string(),
        )),
    }
}

/// True for strings already carrying an image data-URI prefix.
pub fn has_image_prefix(s: &str) -> bool {
    s.starts_with("data:image")
}

/// Keep only characters in the base64 alphabet (`A-Z a-z 0-9 + / =`).
pub fn sanitize_base64(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_png_prefix() {
        let payload = strip_data_uri_prefix("data:image/png;base64,AAAA").unwrap();
        assert_eq!(payload, "AAAA");
    }

    #[test]
    fn missing_comma_is_an_error() {
        let err = strip_data_uri_prefix("data:image/png;base64AAAA").unwrap_err();
        assert!(err.to_string().contains("data URI"));
    }

    #[test]
    fn empty_payload_is_an_error() {
        assert!(strip_data_uri_prefix("data:image/png;base64,").is_err());
    }

    #[test]
    fn sanitize_drops_stray_characters() {
        assert_eq!(sanitize_base64("Q0FG\n"), "Q0FG");
        assert_eq!(sanitize_base64("AA==\r\n"), "AA==");
        assert_eq!(sanitize_base64("a b+c/d="), "ab+c/d=");
    }
}
