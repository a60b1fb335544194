//! RunPod Image Proxy library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `runpod`: Client for a RunPod serverless endpoint (run/status/poll/runsync).
//! - `workflow`: Workflow variants, template loading, and node patching.
//! - `extract`: Normalization of job output into the canonical image string.
//! - `utils`: Data-URI and base64 helpers.
//! - `config`: Env-driven configuration loader, validated once at startup.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `RunpodClient`,
//! `PollConfig`, `VariantRegistry`, and `CanonicalImage`.
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod runpod;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use extract::CanonicalImage;
pub use runpod::{PollConfig, RunpodClient};
pub use workflow::VariantRegistry;
