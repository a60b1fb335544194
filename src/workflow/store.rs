//! Workflow variants and the on-disk template store.
//!
//! A variant is the full description of one generation flavor: which JSON
//! template to load from the workflows directory and which node inputs get
//! overwritten with per-request values. Every route goes through the same
//! generic descriptor instead of carrying its own patching code.
use serde_json::Value;
use tokio::fs;

use crate::error::{AppError, AppResult};
use crate::workflow::patch::{is_probably_graph, patch_node_input};

/// Where a patched value comes from at request time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchSource {
    /// The caller's prompt text.
    Prompt,
    /// The name of the uploaded image in slot `n` (0-based).
    Image(usize),
}

#[derive(Clone, Debug)]
pub struct PatchTarget {
    pub node_id: String,
    pub field: String,
    pub source: PatchSource,
}

impl PatchTarget {
    fn new(node_id: &str, field: &str, source: PatchSource) -> Self {
        PatchTarget {
            node_id: node_id.to_string(),
            field: field.to_string(),
            source,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkflowVariant {
    pub name: String,
    pub template_file: String,
    pub patches: Vec<PatchTarget>,
}

impl WorkflowVariant {
    /// Number of image slots this variant expects the caller to fill.
    pub fn image_slots(&self) -> usize {
        self.patches
            .iter()
            .filter_map(|p| match p.source {
                PatchSource::Image(i) => Some(i + 1),
                PatchSource::Prompt => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Read and parse this variant's template from `workflows_dir`.
    pub async fn load_template(&self, workflows_dir: &str) -> AppResult<Value> {
        let path = format!(
            "{}/{}",
            workflows_dir.trim_end_matches('/'),
            self.template_file
        );
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Workflow(format!("failed to read {}: {}", path, e)))?;
        let graph: Value = serde_json::from_str(&content)
            .map_err(|e| AppError::Workflow(format!("failed to parse {}: {}", path, e)))?;
        if !is_probably_graph(&graph) {
            return Err(AppError::Workflow(format!(
                "{} does not look like a workflow graph",
                path
            )));
        }
        Ok(graph)
    }

    /// Write the per-request values into the template. Missing nodes are
    /// skipped with a warning inside `patch_node_input`; a short prompt or
    /// image list simply leaves the corresponding targets unpatched.
    pub fn apply_patches(&self, graph: &mut Value, prompt: &str, image_names: &[String]) {
        for target in &self.patches {
            let value = match target.source {
                PatchSource::Prompt => Value::String(prompt.to_string()),
                PatchSource::Image(slot) => match image_names.get(slot) {
                    Some(name) => Value::String(name.clone()),
                    None => {
                        tracing::warn!(
                            variant = %self.name,
                            slot,
                            "no image supplied for slot; patch skipped"
                        );
                        continue;
                    }
                },
            };
            patch_node_input(graph, &target.node_id, &target.field, value);
        }
    }
}

/// Registry of the variants this deployment knows about.
pub struct VariantRegistry {
    variants: Vec<WorkflowVariant>,
}

impl VariantRegistry {
    /// The built-in set: a two-image clothing swap, a single-image
    /// segmentation edit, and a single-image Pixar-style restyle.
    pub fn builtin() -> Self {
        let variants = vec![
            WorkflowVariant {
                name: "clothing-swap".to_string(),
                template_file: "clothing_swap.json".to_string(),
                patches: vec![
                    PatchTarget::new("12", "image", PatchSource::Image(0)),
                    PatchTarget::new("13", "image", PatchSource::Image(1)),
                    PatchTarget::new("148", "prompt", PatchSource::Prompt),
                ],
            },
            WorkflowVariant {
                name: "segment".to_string(),
                template_file: "segment.json".to_string(),
                patches: vec![
                    PatchTarget::new("70", "image", PatchSource::Image(0)),
                    PatchTarget::new("86", "prompt", PatchSource::Prompt),
                ],
            },
            WorkflowVariant {
                name: "pixar-style".to_string(),
                template_file: "pixar_style.json".to_string(),
                patches: vec![
                    PatchTarget::new("10", "image", PatchSource::Image(0)),
                    PatchTarget::new("6", "text", PatchSource::Prompt),
                ],
            },
        ];
        VariantRegistry { variants }
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Default variant when the caller names none: the two-image swap if two
    /// images were supplied, otherwise the single-image segmentation edit.
    pub fn default_for(&self, image_count: usize) -> &WorkflowVariant {
        let name = if image_count >= 2 { "clothing-swap" } else { "segment" };
        self.get(name).expect("builtin variant missing")
    }

    pub fn names(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.name.clone()).collect()
    }
}
