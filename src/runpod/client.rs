//! HTTP client for a RunPod serverless endpoint.
//!
//! - `run` posts a workflow + inline images to `/v2/{endpoint}/run` and
//!   returns the job handle.
//! - `status` fetches `/v2/{endpoint}/status/{id}`.
//! - `poll` drives `status` at a fixed interval until a terminal state or the
//!   attempt budget runs out.
//! - `run_sync` posts to `/v2/{endpoint}/runsync`, blocking on the remote
//!   side instead of polling.
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::runpod::types::{ImagePayload, JobHandle, JobResult, JobStatus, RunInput, RunRequest};

/// Poll cadence. Callers choose the deadline: `interval × max_attempts`.
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&Config> for PollConfig {
    fn from(config: &Config) -> Self {
        PollConfig {
            interval: config.poll_interval(),
            max_attempts: config.poll_max_attempts,
        }
    }
}

#[derive(Clone)]
pub struct RunpodClient {
    client: Client,
    base_url: String,
    endpoint_id: String,
    api_key: String,
}

impl RunpodClient {
    pub fn new(base_url: String, endpoint_id: String, api_key: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        RunpodClient {
            client: Client::new(),
            base_url: base,
            endpoint_id,
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.runpod_api_base.clone(),
            config.runpod_endpoint_id.clone(),
            config.runpod_api_key.clone(),
        )
    }

    fn endpoint_url(&self, tail: &str) -> String {
        format!("{}/v2/{}/{}", self.base_url, self.endpoint_id, tail)
    }

    /// Submit a patched workflow for asynchronous execution.
    ///
    /// Fails with `AppError::Submission` when the response is not successful
    /// or carries no job id; the remote backend's own error message is
    /// surfaced when present. A failed submission is terminal for the
    /// request, there is no retry.
    pub async fn run(&self, workflow: &Value, images: &[ImagePayload]) -> AppResult<JobHandle> {
        let url = self.endpoint_url("run");
        tracing::info!("Submitting job to RunPod at URL: {}", url);

        let body = RunRequest {
            input: RunInput {
                workflow,
                images: images.iter().collect(),
            },
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read response body".to_string());
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = remote_error_message(&payload)
                .unwrap_or_else(|| format!("run request rejected with status {}", status));
            tracing::error!("RunPod run request failed. Status: {}, Body: {}", status, text);
            return Err(AppError::Submission(message));
        }

        match payload.get("id").and_then(|v| v.as_str()) {
            Some(id) => {
                tracing::info!(job_id = id, "RunPod accepted the job");
                Ok(JobHandle { id: id.to_string() })
            }
            None => {
                let message = remote_error_message(&payload)
                    .unwrap_or_else(|| "run response carried no job id".to_string());
                tracing::error!("RunPod run response lacked a job id. Body: {}", text);
                Err(AppError::Submission(message))
            }
        }
    }

    /// Fetch the current state of a submitted job.
    pub async fn status(&self, handle: &JobHandle) -> AppResult<JobResult> {
        let url = self.endpoint_url(&format!("status/{}", handle.id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Status query failed. Status: {}, Body: {}", status, text);
            return Err(AppError::StatusQuery(format!(
                "status endpoint returned {}",
                status
            )));
        }
        response.json().await.map_err(AppError::HttpClient)
    }

    /// Poll a job until it reaches a terminal status.
    ///
    /// Issues exactly one status request per attempt and sleeps only between
    /// attempts, so total suspend time is `interval × (max_attempts - 1)` in
    /// the worst case. `COMPLETED` returns immediately with the full result;
    /// `FAILED`/`CANCELLED` fail with the remote message; anything else
    /// (including statuses this client does not recognize) keeps polling.
    pub async fn poll(&self, handle: &JobHandle, config: PollConfig) -> AppResult<JobResult> {
        for attempt in 1..=config.max_attempts {
            tracing::debug!(
                job_id = %handle.id,
                attempt,
                max_attempts = config.max_attempts,
                "polling job status"
            );
            let result = self.status(handle).await?;
            match result.status {
                JobStatus::Completed => {
                    tracing::info!(job_id = %handle.id, "job completed");
                    return Ok(result);
                }
                JobStatus::Failed | JobStatus::Cancelled => {
                    let message = result
                        .error_message()
                        .unwrap_or("job failed on the remote backend")
                        .to_string();
                    tracing::error!(
                        job_id = %handle.id,
                        status = ?result.status,
                        "remote job reached a failure state: {}",
                        message
                    );
                    return Err(AppError::RemoteJobFailed(message));
                }
                JobStatus::InQueue | JobStatus::InProgress => {}
                JobStatus::Unknown => {
                    tracing::warn!(
                        job_id = %handle.id,
                        "job reported an unrecognized status; continuing to poll"
                    );
                }
            }
            if attempt < config.max_attempts {
                tokio::time::sleep(config.interval).await;
            }
        }
        tracing::error!(
            job_id = %handle.id,
            "job did not reach a terminal status within {} attempts",
            config.max_attempts
        );
        Err(AppError::PollTimeout)
    }

    /// Synchronous variant: the remote side blocks until the job finishes and
    /// returns the full result in one round trip.
    pub async fn run_sync(&self, workflow: &Value, images: &[ImagePayload]) -> AppResult<JobResult> {
        let url = self.endpoint_url("runsync");
        tracing::info!("Submitting synchronous job to RunPod at URL: {}", url);

        let body = RunRequest {
            input: RunInput {
                workflow,
                images: images.iter().collect(),
            },
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            let message = remote_error_message(&payload)
                .unwrap_or_else(|| format!("runsync request rejected with status {}", status));
            tracing::error!("RunPod runsync request failed. Status: {}, Body: {}", status, text);
            return Err(AppError::Submission(message));
        }
        response.json().await.map_err(AppError::HttpClient)
    }
}

/// Pull the remote backend's own failure message out of an error payload.
/// Observed shapes: `{"error": {"message": "..."}}` and `{"error": "..."}`.
fn remote_error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if let Some(s) = error.as_str() {
        return Some(s.to_string());
    }
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}
