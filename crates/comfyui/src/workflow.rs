//! API-format workflow templates.
//!
//! A template is a workflow exported from ComfyUI in API format plus
//! the ids of the nodes a job needs to fill in. Rendering never mutates
//! the template; each job gets its own copy.

use std::path::Path;

use serde_json::Value;

/// Node ids inside the workflow that receive per-job inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowNodes {
    /// CLIPTextEncode node for the positive prompt.
    pub positive: String,
    /// CLIPTextEncode node for the negative prompt.
    pub negative: String,
    /// Sampler node whose `seed` input is randomized.
    pub seed: String,
    /// LoadImage node for an auxiliary input image, if the workflow has one.
    pub load_image: Option<String>,
}

impl Default for WorkflowNodes {
    fn default() -> Self {
        Self {
            positive: "6".to_string(),
            negative: "7".to_string(),
            seed: "3".to_string(),
            load_image: None,
        }
    }
}

/// Per-job values substituted into a template.
#[derive(Debug, Clone)]
pub struct WorkflowInputs<'a> {
    pub positive: &'a str,
    pub negative: &'a str,
    pub seed: u64,
    /// Server-side name of an uploaded input image.
    pub image_name: Option<&'a str>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Failed to read workflow file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workflow file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workflow has no node '{0}' with an inputs object")]
    MissingNode(String),
}

/// A loaded workflow and the nodes to fill in.
#[derive(Debug, Clone)]
pub struct WorkflowTemplate {
    workflow: Value,
    nodes: WorkflowNodes,
}

impl WorkflowTemplate {
    /// Build a template from an in-memory workflow, checking that every
    /// configured node exists.
    pub fn new(workflow: Value, nodes: WorkflowNodes) -> Result<Self, WorkflowError> {
        let required = [&nodes.positive, &nodes.negative, &nodes.seed]
            .into_iter()
            .chain(nodes.load_image.as_ref());
        for id in required {
            if node_inputs(&workflow, id).is_none() {
                return Err(WorkflowError::MissingNode(id.clone()));
            }
        }
        Ok(Self { workflow, nodes })
    }

    /// Read a workflow exported in API format from disk.
    pub async fn load(path: impl AsRef<Path>, nodes: WorkflowNodes) -> Result<Self, WorkflowError> {
        let raw = tokio::fs::read(path.as_ref()).await?;
        let workflow: Value = serde_json::from_slice(&raw)?;
        Self::new(workflow, nodes)
    }

    /// Whether the workflow can take an auxiliary input image.
    pub fn accepts_image(&self) -> bool {
        self.nodes.load_image.is_some()
    }

    /// Produce a ready-to-submit workflow for one job.
    pub fn render(&self, inputs: &WorkflowInputs<'_>) -> Result<Value, WorkflowError> {
        let mut workflow = self.workflow.clone();
        set_input(&mut workflow, &self.nodes.positive, "text", inputs.positive.into())?;
        set_input(&mut workflow, &self.nodes.negative, "text", inputs.negative.into())?;
        set_input(&mut workflow, &self.nodes.seed, "seed", inputs.seed.into())?;
        if let (Some(node), Some(name)) = (&self.nodes.load_image, inputs.image_name) {
            set_input(&mut workflow, node, "image", name.into())?;
        }
        Ok(workflow)
    }
}

fn node_inputs<'a>(workflow: &'a Value, node: &str) -> Option<&'a serde_json::Map<String, Value>> {
    workflow.get(node)?.get("inputs")?.as_object()
}

fn set_input(workflow: &mut Value, node: &str, key: &str, value: Value) -> Result<(), WorkflowError> {
    let inputs = workflow
        .get_mut(node)
        .and_then(|n| n.get_mut("inputs"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| WorkflowError::MissingNode(node.to_string()))?;
    inputs.insert(key.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flux_workflow() -> Value {
        json!({
            "3": {"class_type": "KSampler", "inputs": {"seed": 0, "steps": 20}},
            "6": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}},
            "7": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}},
            "10": {"class_type": "LoadImage", "inputs": {"image": "placeholder.png"}}
        })
    }

    fn inputs<'a>(image_name: Option<&'a str>) -> WorkflowInputs<'a> {
        WorkflowInputs {
            positive: "a red fox",
            negative: "blurry",
            seed: 42,
            image_name,
        }
    }

    #[test]
    fn render_fills_prompts_and_seed() {
        let template = WorkflowTemplate::new(flux_workflow(), WorkflowNodes::default()).unwrap();
        let rendered = template.render(&inputs(None)).unwrap();

        assert_eq!(rendered["6"]["inputs"]["text"], "a red fox");
        assert_eq!(rendered["7"]["inputs"]["text"], "blurry");
        assert_eq!(rendered["3"]["inputs"]["seed"], 42);
        assert_eq!(rendered["3"]["inputs"]["steps"], 20);
    }

    #[test]
    fn render_leaves_template_untouched() {
        let template = WorkflowTemplate::new(flux_workflow(), WorkflowNodes::default()).unwrap();
        template.render(&inputs(None)).unwrap();
        let again = template.render(&inputs(None)).unwrap();
        assert_eq!(again["6"]["inputs"]["text"], "a red fox");
        assert_eq!(template.workflow["6"]["inputs"]["text"], "");
    }

    #[test]
    fn image_input_is_set_when_configured() {
        let nodes = WorkflowNodes {
            load_image: Some("10".to_string()),
            ..Default::default()
        };
        let template = WorkflowTemplate::new(flux_workflow(), nodes).unwrap();
        assert!(template.accepts_image());

        let rendered = template.render(&inputs(Some("upload_1.png"))).unwrap();
        assert_eq!(rendered["10"]["inputs"]["image"], "upload_1.png");
    }

    #[test]
    fn missing_node_is_rejected_up_front() {
        let nodes = WorkflowNodes {
            seed: "99".to_string(),
            ..Default::default()
        };
        let err = WorkflowTemplate::new(flux_workflow(), nodes).unwrap_err();
        assert!(matches!(err, WorkflowError::MissingNode(id) if id == "99"));
    }
}
