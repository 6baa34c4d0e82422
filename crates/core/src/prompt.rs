//! Prompt validation and the fixed image prompt-augmentation policy.

use crate::error::CoreError;

/// Prepended to every positive image prompt.
pub const QUALITY_PREFIX: &str =
    "masterpiece, best quality, ultra high res, 8k uhd, photorealistic, ";

/// Subjects the image model is always steered away from.
pub const SAFETY_NEGATIVE: &str = "child, underage, kid, baby, toddler, loli, teen, preteen, ";

/// Generic quality negatives appended after the safety terms.
pub const BASE_NEGATIVE: &str = "worst quality, bad anatomy, watermark";

/// Trim a prompt and reject it if nothing is left.
pub fn validate_prompt(raw: &str) -> Result<&str, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    Ok(trimmed)
}

/// Build the positive prompt sent to the image backend.
pub fn augment_positive(user_prompt: &str) -> String {
    format!("{QUALITY_PREFIX}{user_prompt}")
}

/// Build the negative prompt: safety terms first, then `base`.
pub fn augment_negative(base: &str) -> String {
    format!("{SAFETY_NEGATIVE}{base}")
}
