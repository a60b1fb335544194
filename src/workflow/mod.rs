pub mod patch;
pub mod store;

pub use patch::patch_node_input;
pub use store::{PatchSource, PatchTarget, VariantRegistry, WorkflowVariant};
