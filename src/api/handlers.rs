//! Axum request handlers for the HTTP API.
//!
//! `/api/generate` is the whole pipeline in one request: validate input,
//! patch the variant's workflow template, submit to RunPod, poll to a
//! terminal state, extract the canonical image. Every failure is an
//! `AppError`, converted to the `{success:false, error}` envelope by its
//! `IntoResponse` impl.
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{extract, CanonicalImage};
use crate::runpod::types::ImagePayload;
use crate::runpod::PollConfig;
use crate::workflow::WorkflowVariant;

pub async fn root() -> &'static str {
    "RunPod Image Proxy"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Single-image variants.
    pub image: Option<String>,
    /// Two-image variants (clothing swap).
    pub product_image: Option<String>,
    pub model_image: Option<String>,
    pub prompt: Option<String>,
    /// Variant name; defaults by image count when absent.
    pub workflow: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub image: CanonicalImage,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let prompt = payload
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("prompt is required".to_string()))?;

    // Ordered data URIs: two-image form wins when both slots are present.
    let uris: Vec<&str> = match (&payload.product_image, &payload.model_image, &payload.image) {
        (Some(product), Some(model), _) => vec![product.as_str(), model.as_str()],
        (None, None, Some(image)) => vec![image.as_str()],
        _ => {
            return Err(AppError::BadRequest(
                "supply either 'image' or both 'productImage' and 'modelImage'".to_string(),
            ))
        }
    };

    let variant = resolve_variant(&state, payload.workflow.as_deref(), uris.len())?;
    if uris.len() < variant.image_slots() {
        return Err(AppError::BadRequest(format!(
            "workflow '{}' needs {} image(s), got {}",
            variant.name,
            variant.image_slots(),
            uris.len()
        )));
    }

    let mut images = Vec::with_capacity(uris.len());
    for uri in &uris {
        let name = format!("input-{}.png", Uuid::new_v4());
        images.push(ImagePayload::from_data_uri(name, uri)?);
    }
    let image_names: Vec<String> = images.iter().map(|i| i.name.clone()).collect();

    tracing::info!(
        variant = %variant.name,
        images = images.len(),
        prompt_len = prompt.len(),
        "handling generate request"
    );

    let mut graph = variant.load_template(&state.config.workflows_dir).await?;
    variant.apply_patches(&mut graph, prompt, &image_names);

    let handle = state.runpod_client.run(&graph, &images).await?;
    let result = state
        .runpod_client
        .poll(&handle, PollConfig::from(&state.config))
        .await?;
    let image = extract(&result)?;

    Ok(Json(GenerateResponse { success: true, image }))
}

fn resolve_variant<'a>(
    state: &'a AppState,
    name: Option<&str>,
    image_count: usize,
) -> AppResult<&'a WorkflowVariant> {
    match name {
        Some(n) => state
            .registry
            .get(n)
            .ok_or_else(|| AppError::BadRequest(format!("unknown workflow '{}'", n))),
        None => Ok(state.registry.default_for(image_count)),
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub data: DownloadData,
}

#[derive(Serialize)]
pub struct DownloadData {
    pub base64: String,
}

/// Fetch a remote image and re-encode it as a base64 data URI. The configured
/// timeout aborts slow fetches; large files are the usual culprit.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DownloadRequest>,
) -> AppResult<Json<DownloadResponse>> {
    let url = payload
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("url is required".to_string()))?;

    let response = state
        .http
        .get(&url)
        .header("Accept", "image/*")
        .timeout(state.config.download_timeout())
        .send()
        .await
        .map_err(|e| AppError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::Download(format!(
            "failed to fetch image: {}",
            response.status()
        )));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Download(e.to_string()))?;

    let base64 = format!("data:{};base64,{}", content_type, BASE64.encode(&bytes));
    Ok(Json(DownloadResponse {
        success: true,
        data: DownloadData { base64 },
    }))
}

#[derive(Serialize)]
pub struct WorkflowsResponse {
    pub workflows: Vec<String>,
}

pub async fn list_workflows(State(state): State<Arc<AppState>>) -> Json<WorkflowsResponse> {
    Json(WorkflowsResponse {
        workflows: state.registry.names(),
    })
}
