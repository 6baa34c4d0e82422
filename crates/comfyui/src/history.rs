//! Output lookup in `/history/{prompt_id}` responses.

use serde::Deserialize;

/// Location of a generated file on the ComfyUI server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_folder_type")]
    pub folder_type: String,
}

fn default_folder_type() -> String {
    "output".to_string()
}

/// Return the first image any output node produced for `prompt_id`.
pub fn first_image(history: &serde_json::Value, prompt_id: &str) -> Option<ImageRef> {
    let outputs = history.get(prompt_id)?.get("outputs")?.as_object()?;
    outputs
        .values()
        .filter_map(|node| node.get("images")?.as_array())
        .flatten()
        .find_map(|img| serde_json::from_value::<ImageRef>(img.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_image_in_output_node() {
        let history = json!({
            "p1": {
                "outputs": {
                    "9": {"images": [{"filename": "ComfyUI_0001.png", "subfolder": "", "type": "output"}]}
                }
            }
        });
        let img = first_image(&history, "p1").unwrap();
        assert_eq!(img.filename, "ComfyUI_0001.png");
        assert_eq!(img.folder_type, "output");
    }

    #[test]
    fn skips_nodes_without_images() {
        let history = json!({
            "p1": {
                "outputs": {
                    "4": {"text": ["hello"]},
                    "9": {"images": [{"filename": "a.png"}]}
                }
            }
        });
        assert_eq!(first_image(&history, "p1").unwrap().filename, "a.png");
    }

    #[test]
    fn missing_prompt_or_outputs_yields_none() {
        assert!(first_image(&json!({}), "p1").is_none());
        assert!(first_image(&json!({"p1": {"outputs": {}}}), "p1").is_none());
    }
}
