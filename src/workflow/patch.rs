//! In-place patching of ComfyUI workflow graphs.
//!
//! A workflow is a JSON object keyed by node id, each node carrying an
//! `inputs` object plus an optional `class_type`. Per-request values (prompt
//! text, uploaded image names) are written into specific node inputs before
//! submission.
use serde_json::Value;

/// Overwrite `graph[node_id].inputs[field]` with `value`.
///
/// Returns whether the write happened. A missing node or missing `inputs`
/// object is tolerated: the patch is skipped with a warning and the rest of
/// the graph is left untouched, matching how optional nodes behave across
/// workflow variants.
pub fn patch_node_input(graph: &mut Value, node_id: &str, field: &str, value: Value) -> bool {
    let Some(inputs) = graph
        .get_mut(node_id)
        .and_then(|node| node.get_mut("inputs"))
        .and_then(|i| i.as_object_mut())
    else {
        tracing::warn!(
            node_id,
            field,
            "workflow node or its inputs are missing; patch skipped"
        );
        return false;
    };
    inputs.insert(field.to_string(), value);
    true
}

/// Heuristic check that a JSON document looks like a node graph: at least one
/// object value carrying a `class_type` string.
pub fn is_probably_graph(graph: &Value) -> bool {
    if let Some(obj) = graph.as_object() {
        for (_k, v) in obj.iter() {
            if let Some(node) = v.as_object() {
                if node.get("class_type").and_then(|ct| ct.as_str()).is_some() {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_graph() -> Value {
        json!({
            "12": {"inputs": {"image": "placeholder.png"}, "class_type": "LoadImage"},
            "148": {"inputs": {"prompt": ""}, "class_type": "TextInput"}
        })
    }

    #[test]
    fn patches_existing_node_input() {
        let mut graph = sample_graph();
        assert!(patch_node_input(&mut graph, "148", "prompt", json!("red shirt")));
        assert_eq!(graph["148"]["inputs"]["prompt"], "red shirt");
    }

    #[test]
    fn missing_node_is_a_tolerated_noop() {
        let mut graph = sample_graph();
        let before = graph.clone();
        assert!(!patch_node_input(&mut graph, "999", "prompt", json!("x")));
        assert_eq!(graph, before);
    }

    #[test]
    fn node_without_inputs_is_a_tolerated_noop() {
        let mut graph = json!({"7": {"class_type": "Reroute"}});
        let before = graph.clone();
        assert!(!patch_node_input(&mut graph, "7", "image", json!("a.png")));
        assert_eq!(graph, before);
    }

    #[test]
    fn graph_detection() {
        assert!(is_probably_graph(&sample_graph()));
        assert!(!is_probably_graph(&json!({"hello": "world"})));
        assert!(!is_probably_graph(&json!([1, 2, 3])));
    }
}
