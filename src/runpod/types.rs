//! Wire types for the RunPod serverless API.
//!
//! The status vocabulary is fixed, but the success payload is not: different
//! workflow containers return the image under different keys, so `output`
//! stays a loose `Value` and normalization lives in the `extract` module.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppResult;
use crate::utils::data_uri::strip_data_uri_prefix;

/// Remote job lifecycle states. Anything the serde rename set does not cover
/// maps to `Unknown`, which the poller treats as "still running".
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InQueue,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Opaque handle returned by the run endpoint; only ever used as a poll key.
#[derive(Clone, Debug, Deserialize)]
pub struct JobHandle {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RemoteError {
    pub message: Option<String>,
}

/// Response shape shared by the run, runsync, and status endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<RemoteError>,
    #[serde(default)]
    pub delay_time: Option<u64>,
    #[serde(default)]
    pub execution_time: Option<u64>,
}

impl JobResult {
    /// The remote-supplied failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }
}

/// One inline image attached to a run request: a unique name the workflow
/// references plus the bare base64 payload (no data-URI prefix).
#[derive(Clone, Debug, Serialize)]
pub struct ImagePayload {
    pub name: String,
    pub image: String,
}

impl ImagePayload {
    /// Build a payload from a caller-supplied data URI, stripping the
    /// `data:<mime>;base64,` prefix. Fails explicitly if the URI has no
    /// comma separator.
    pub fn from_data_uri(name: impl Into<String>, uri: &str) -> AppResult<Self> {
        let payload = strip_data_uri_prefix(uri)?;
        Ok(ImagePayload {
            name: name.into(),
            image: payload.to_string(),
        })
    }
}

#[derive(Serialize)]
pub struct RunInput<'a> {
    pub workflow: &'a Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<&'a ImagePayload>,
}

/// Body for the run and runsync endpoints: `{"input": {"workflow", "images"}}`.
#[derive(Serialize)]
pub struct RunRequest<'a> {
    pub input: RunInput<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_deserializes_known_values() {
        let s: JobStatus = serde_json::from_value(json!("IN_QUEUE")).unwrap();
        assert_eq!(s, JobStatus::InQueue);
        let s: JobStatus = serde_json::from_value(json!("COMPLETED")).unwrap();
        assert_eq!(s, JobStatus::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn unexpected_status_becomes_unknown() {
        let s: JobStatus = serde_json::from_value(json!("WARMING_UP")).unwrap();
        assert_eq!(s, JobStatus::Unknown);
        assert!(!s.is_terminal());
    }

    #[test]
    fn job_result_tolerates_extra_fields() {
        let result: JobResult = serde_json::from_value(json!({
            "id": "job1",
            "status": "COMPLETED",
            "output": {"message": "Q0FG", "seed": 1337},
            "delayTime": 120,
            "executionTime": 4500,
            "workerId": "gpu-7"
        }))
        .unwrap();
        assert_eq!(result.status, JobStatus::Completed);
        assert_eq!(result.output.unwrap()["message"], "Q0FG");
        assert_eq!(result.execution_time, Some(4500));
    }

    #[test]
    fn image_payload_strips_prefix() {
        let p = ImagePayload::from_data_uri("input.png", "data:image/png;base64,AAAA").unwrap();
        assert_eq!(p.image, "AAAA");
        assert_eq!(p.name, "input.png");
    }

    #[test]
    fn image_payload_rejects_bare_base64() {
        assert!(ImagePayload::from_data_uri("input.png", "AAAA").is_err());
    }

    #[test]
    fn run_request_wire_shape() {
        let workflow = json!({"3": {"inputs": {}, "class_type": "KSampler"}});
        let img = ImagePayload { name: "a.png".into(), image: "AAAA".into() };
        let body = serde_json::to_value(RunRequest {
            input: RunInput { workflow: &workflow, images: vec![&img] },
        })
        .unwrap();
        assert_eq!(body["input"]["workflow"], workflow);
        assert_eq!(body["input"]["images"][0]["name"], "a.png");
        assert_eq!(body["input"]["images"][0]["image"], "AAAA");
    }
}
