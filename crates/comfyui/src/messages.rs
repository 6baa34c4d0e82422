//! ComfyUI WebSocket message types and parser.
//!
//! ComfyUI sends JSON frames shaped `{"type": "<kind>", "data": {...}}`.
//! Only the kinds that drive completion tracking get typed variants;
//! everything else (newer progress formats, crystools stats, ...) is
//! surfaced as [`ComfyUIMessage::Other`] instead of an error.

use serde::Deserialize;

/// Messages the generator reacts to.
#[derive(Debug, Clone)]
pub enum ComfyUIMessage {
    /// Queue depth broadcast.
    Status { queue_remaining: i32 },
    /// A prompt has started executing.
    ExecutionStart(ExecutionStartData),
    /// A node is executing, or the prompt finished when `node` is `None`.
    Executing(ExecutingData),
    /// Step progress from a long-running node (e.g. KSampler).
    Progress(ProgressData),
    /// Execution failed.
    ExecutionError(ErrorData),
    /// Execution was interrupted from the ComfyUI side.
    ExecutionInterrupted(ExecutionStartData),
    /// Any message type not listed above.
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: QueueStatus,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    exec_info: ExecInfo,
}

#[derive(Debug, Deserialize)]
struct ExecInfo {
    queue_remaining: i32,
}

/// Payload for `execution_start` and `execution_interrupted`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStartData {
    pub prompt_id: String,
}

/// Payload for `executing` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    pub node: Option<String>,
    /// Older ComfyUI builds omit this on the final message.
    #[serde(default)]
    pub prompt_id: Option<String>,
}

/// Payload for `progress` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    pub value: i32,
    pub max: i32,
}

/// Payload for `execution_error` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub prompt_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    pub exception_message: String,
    #[serde(default)]
    pub exception_type: String,
}

impl ExecutingData {
    /// `true` when this marks the end of `prompt_id`'s execution.
    pub fn is_completion_of(&self, prompt_id: &str) -> bool {
        self.node.is_none() && self.prompt_id.as_deref().map_or(true, |p| p == prompt_id)
    }
}

/// Parse a ComfyUI WebSocket text frame.
///
/// Returns `Err` only for malformed JSON or a known type whose payload
/// does not match its schema.
pub fn parse_message(text: &str) -> Result<ComfyUIMessage, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let data = envelope.data;
    Ok(match envelope.kind.as_str() {
        "status" => {
            let s: StatusData = serde_json::from_value(data)?;
            ComfyUIMessage::Status {
                queue_remaining: s.status.exec_info.queue_remaining,
            }
        }
        "execution_start" => ComfyUIMessage::ExecutionStart(serde_json::from_value(data)?),
        "executing" => ComfyUIMessage::Executing(serde_json::from_value(data)?),
        "progress" => ComfyUIMessage::Progress(serde_json::from_value(data)?),
        "execution_error" => ComfyUIMessage::ExecutionError(serde_json::from_value(data)?),
        "execution_interrupted" => {
            ComfyUIMessage::ExecutionInterrupted(serde_json::from_value(data)?)
        }
        _ => ComfyUIMessage::Other(envelope.kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn completion_frame_matches_its_prompt() {
        let msg = parse_message(r#"{"type":"executing","data":{"node":null,"prompt_id":"xyz"}}"#)
            .unwrap();
        assert_matches!(msg, ComfyUIMessage::Executing(data) => {
            assert!(data.is_completion_of("xyz"));
            assert!(!data.is_completion_of("other"));
        });
    }

    #[test]
    fn node_frame_is_not_completion() {
        let msg = parse_message(r#"{"type":"executing","data":{"node":"3","prompt_id":"xyz"}}"#)
            .unwrap();
        assert_matches!(msg, ComfyUIMessage::Executing(data) if !data.is_completion_of("xyz"));
    }

    #[test]
    fn status_exposes_queue_depth() {
        let msg = parse_message(
            r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":2}},"sid":"abc"}}"#,
        )
        .unwrap();
        assert_matches!(msg, ComfyUIMessage::Status { queue_remaining: 2 });
    }

    #[test]
    fn execution_error_carries_message() {
        let msg = parse_message(r#"{"type":"execution_error","data":{"prompt_id":"p","node_id":"8","exception_message":"HIP out of memory","exception_type":"RuntimeError"}}"#).unwrap();
        assert_matches!(msg, ComfyUIMessage::ExecutionError(e) => {
            assert_eq!(e.exception_message, "HIP out of memory");
            assert_eq!(e.node_id.as_deref(), Some("8"));
        });
    }

    #[test]
    fn unknown_types_are_not_errors() {
        let msg = parse_message(r#"{"type":"crystools.monitor","data":{"cpu":3}}"#).unwrap();
        assert_matches!(msg, ComfyUIMessage::Other(kind) if kind == "crystools.monitor");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_message("not json").is_err());
    }
}
