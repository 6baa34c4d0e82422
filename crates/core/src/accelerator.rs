//! Accelerator residency states and the transition table between them.
//!
//! The table is pure: it says which backend call a transition needs but
//! never performs it. The worker's arbiter owns the live state and the
//! lock that serializes transitions.

use serde::{Deserialize, Serialize};

/// Which model family currently occupies accelerator memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorState {
    /// Nothing resident that the arbiter knows of.
    #[default]
    Idle,
    /// The text model's weights are loaded.
    TextResident,
    /// The image pipeline owns the accelerator (loaded per job by the
    /// image backend itself).
    ImageResident,
}

impl AcceleratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TextResident => "text_resident",
            Self::ImageResident => "image_resident",
        }
    }
}

impl std::fmt::Display for AcceleratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend side effect required to move between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    /// Target equals current state. No backend is contacted.
    Noop,
    /// Take ownership without any backend call.
    Claim,
    /// Ask the text backend to load (preload) its model.
    LoadText,
    /// Ask the text backend to release its model before moving on.
    UnloadText,
}

/// Decide which backend call moving `from -> to` requires.
///
/// Loading the text model never requires an image-side unload: the
/// image backend is request-scoped and holds nothing between jobs.
pub fn plan_transition(from: AcceleratorState, to: AcceleratorState) -> TransitionStep {
    use AcceleratorState::*;
    match (from, to) {
        (a, b) if a == b => TransitionStep::Noop,
        (_, TextResident) => TransitionStep::LoadText,
        (TextResident, ImageResident | Idle) => TransitionStep::UnloadText,
        (Idle, ImageResident) | (ImageResident, Idle) => TransitionStep::Claim,
        // Remaining pairs are the equal ones, handled by the first arm.
        _ => TransitionStep::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AcceleratorState::*;

    #[test]
    fn self_transitions_are_noops() {
        for s in [Idle, TextResident, ImageResident] {
            assert_eq!(plan_transition(s, s), TransitionStep::Noop);
        }
    }

    #[test]
    fn entering_text_always_loads() {
        assert_eq!(plan_transition(Idle, TextResident), TransitionStep::LoadText);
        assert_eq!(
            plan_transition(ImageResident, TextResident),
            TransitionStep::LoadText
        );
    }

    #[test]
    fn leaving_text_unloads() {
        assert_eq!(
            plan_transition(TextResident, ImageResident),
            TransitionStep::UnloadText
        );
        assert_eq!(plan_transition(TextResident, Idle), TransitionStep::UnloadText);
    }

    #[test]
    fn image_side_needs_no_backend_call() {
        assert_eq!(plan_transition(Idle, ImageResident), TransitionStep::Claim);
        assert_eq!(plan_transition(ImageResident, Idle), TransitionStep::Claim);
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(AcceleratorState::default(), Idle);
        assert_eq!(Idle.to_string(), "idle");
    }
}
