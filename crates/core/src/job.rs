//! Job kinds and the accelerator state each one needs.

use serde::{Deserialize, Serialize};

use crate::accelerator::AcceleratorState;

/// The two mutually exclusive workload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Chat,
    Image,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Image => "image",
        }
    }

    /// The accelerator state that must be reached before this job runs.
    pub fn required_state(&self) -> AcceleratorState {
        match self {
            Self::Chat => AcceleratorState::TextResident,
            Self::Image => AcceleratorState::ImageResident,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_resident_states() {
        assert_eq!(JobKind::Chat.required_state(), AcceleratorState::TextResident);
        assert_eq!(JobKind::Image.required_state(), AcceleratorState::ImageResident);
    }

    #[test]
    fn deserializes_lowercase() {
        let kind: JobKind = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(kind, JobKind::Image);
    }
}
