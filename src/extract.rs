//! Normalization of RunPod success payloads into the one image shape the
//! HTTP boundary is allowed to return.
//!
//! Different workflow containers put the image in different places, so the
//! candidate search walks a fixed priority list of known shapes. The order
//! matters and mirrors how often each shape shows up in practice.
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::runpod::types::JobResult;
use crate::utils::data_uri::{has_image_prefix, sanitize_base64};

/// The single accepted output representation:
/// `data:image/png;base64,<payload>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalImage(String);

impl CanonicalImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which shape the image data was found under. Logged so payload drift on
/// the backend side shows up in the traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Message,
    RawString,
    ImagesArray,
    ImageField,
    FileEntry,
}

/// Locate and normalize the image inside a completed job result.
///
/// Fails with `AppError::Extraction` when no strategy matches; the raw
/// output is logged for diagnosis but never put in the returned error.
pub fn extract(result: &JobResult) -> AppResult<CanonicalImage> {
    let null = Value::Null;
    let output = result.output.as_ref().unwrap_or(&null);
    let Some((source, candidate)) = find_candidate(output) else {
        tracing::error!(
            job_id = result.id.as_deref().unwrap_or("<unknown>"),
            raw_output = %output,
            "job completed but no extraction strategy matched the output"
        );
        return Err(AppError::Extraction);
    };
    tracing::debug!(?source, "image candidate located");
    normalize(candidate)
}

/// First match wins; the order is the contract.
fn find_candidate(output: &Value) -> Option<(ImageSource, &str)> {
    if let Some(s) = output.get("message").and_then(|v| v.as_str()) {
        return Some((ImageSource::Message, s));
    }
    if let Some(s) = output.as_str() {
        return Some((ImageSource::RawString, s));
    }
    if let Some(s) = output
        .get("images")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_str())
    {
        return Some((ImageSource::ImagesArray, s));
    }
    if let Some(s) = output.get("image").and_then(|v| v.as_str()) {
        return Some((ImageSource::ImageField, s));
    }
    if let Some(first) = output
        .get("files")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
    {
        if let Some(s) = first.get("data").and_then(|v| v.as_str()) {
            return Some((ImageSource::FileEntry, s));
        }
        if let Some(s) = first.get("url").and_then(|v| v.as_str()) {
            return Some((ImageSource::FileEntry, s));
        }
    }
    None
}

/// Wrap a bare base64 candidate as a PNG data URI. Already-prefixed strings
/// pass through unchanged; stray characters outside the base64 alphabet are
/// stripped first.
fn normalize(candidate: &str) -> AppResult<CanonicalImage> {
    if has_image_prefix(candidate) {
        return Ok(CanonicalImage(candidate.to_string()));
    }
    let cleaned = sanitize_base64(candidate);
    if cleaned.is_empty() {
        tracing::error!("image candidate contained no base64 data after sanitizing");
        return Err(AppError::Extraction);
    }
    Ok(CanonicalImage(format!("data:image/png;base64,{}", cleaned)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runpod::types::JobStatus;
    use serde_json::json;

    fn completed_with(output: Value) -> JobResult {
        serde_json::from_value(json!({
            "id": "job1",
            "status": "COMPLETED",
            "output": output
        }))
        .unwrap()
    }

    #[test]
    fn message_field_is_the_common_path() {
        let result = completed_with(json!({"message": "Q0FG"}));
        assert_eq!(result.status, JobStatus::Completed);
        let image = extract(&result).unwrap();
        assert_eq!(image.as_str(), "data:image/png;base64,Q0FG");
    }

    #[test]
    fn already_prefixed_message_is_returned_unchanged() {
        let result = completed_with(json!({"message": "data:image/png;base64,Q0FG"}));
        let image = extract(&result).unwrap();
        assert_eq!(image.as_str(), "data:image/png;base64,Q0FG");
        // and extraction is idempotent on its own output
        let again = completed_with(json!({"message": image.as_str()}));
        assert_eq!(extract(&again).unwrap(), image);
    }

    #[test]
    fn message_wins_over_images_array() {
        let result = completed_with(json!({
            "message": "QQ==",
            "images": ["Uk9ORw=="]
        }));
        assert_eq!(extract(&result).unwrap().as_str(), "data:image/png;base64,QQ==");
    }

    #[test]
    fn bare_string_output() {
        let result = completed_with(json!("Q0FG"));
        assert_eq!(extract(&result).unwrap().as_str(), "data:image/png;base64,Q0FG");
    }

    #[test]
    fn images_array_takes_the_first_element() {
        let result = completed_with(json!({"images": ["QQ==", "Qg=="]}));
        assert_eq!(extract(&result).unwrap().as_str(), "data:image/png;base64,QQ==");
    }

    #[test]
    fn image_field_fallback() {
        let result = completed_with(json!({"image": "Q0FG", "seed": 42}));
        assert_eq!(extract(&result).unwrap().as_str(), "data:image/png;base64,Q0FG");
    }

    #[test]
    fn files_entry_data_then_url() {
        let with_data = completed_with(json!({"files": [{"data": "Q0FG", "url": "ignored"}]}));
        assert_eq!(extract(&with_data).unwrap().as_str(), "data:image/png;base64,Q0FG");

        let with_url = completed_with(json!({"files": [{"url": "data:image/png;base64,Qg=="}]}));
        assert_eq!(extract(&with_url).unwrap().as_str(), "data:image/png;base64,Qg==");
    }

    #[test]
    fn stray_characters_are_stripped() {
        let result = completed_with(json!({"message": "Q0FG\n"}));
        let image = extract(&result).unwrap();
        assert_eq!(image.as_str(), "data:image/png;base64,Q0FG");
        let payload = image.as_str().strip_prefix("data:image/png;base64,").unwrap();
        assert!(payload
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')));
    }

    #[test]
    fn empty_images_array_is_no_match() {
        let result = completed_with(json!({"images": []}));
        assert!(matches!(extract(&result).unwrap_err(), AppError::Extraction));
    }

    #[test]
    fn unrecognized_output_is_an_extraction_error() {
        let result = completed_with(json!({"metrics": {"steps": 20}}));
        assert!(matches!(extract(&result).unwrap_err(), AppError::Extraction));
    }

    #[test]
    fn missing_output_is_an_extraction_error() {
        let result: JobResult =
            serde_json::from_value(json!({"id": "job1", "status": "COMPLETED"})).unwrap();
        assert!(matches!(extract(&result).unwrap_err(), AppError::Extraction));
    }
}
