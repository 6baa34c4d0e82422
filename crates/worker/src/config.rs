use std::time::Duration;

use clair_core::env::{parse_or, var_opt, var_or};
use clair_core::error::CoreError;
use clair_core::prompt::BASE_NEGATIVE;
use clair_core::quota::{QuotaLimits, DEFAULT_DAILY_CHAT_LIMIT, DEFAULT_DAILY_IMAGE_LIMIT};
use clair_core::types::{parse_id_list, RoleId};

use crate::arbiter::DEFAULT_UNLOAD_SETTLE;
use crate::context::{DEFAULT_CONTEXT_TURNS, DEFAULT_PERSONA};

/// Admission and execution policy for the dispatch worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Per-kind daily limits for non-VIP users.
    pub limits: QuotaLimits,
    /// Role ids that bypass quotas entirely.
    pub vip_roles: Vec<RoleId>,
    /// Stored turns replayed into each chat request.
    pub context_turns: usize,
    /// System prompt placed first in every conversation.
    pub persona: String,
    /// Generic negatives appended after the fixed safety negatives.
    pub negative_base: String,
    /// Pause after a text-model unload before image work starts.
    pub unload_settle: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            limits: QuotaLimits::default(),
            vip_roles: Vec::new(),
            context_turns: DEFAULT_CONTEXT_TURNS,
            persona: DEFAULT_PERSONA.to_string(),
            negative_base: BASE_NEGATIVE.to_string(),
            unload_settle: DEFAULT_UNLOAD_SETTLE,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default                               |
    /// |---------------------|---------------------------------------|
    /// | `DAILY_IMAGE_LIMIT` | `3`                                   |
    /// | `DAILY_CHAT_LIMIT`  | `15`                                  |
    /// | `VIP_ROLE_IDS`      | empty (comma-separated role ids)      |
    /// | `CONTEXT_TURNS`     | `20`                                  |
    /// | `PERSONA_PROMPT`    | built-in persona                      |
    /// | `NEGATIVE_PROMPT`   | `worst quality, bad anatomy, ...`     |
    /// | `UNLOAD_SETTLE_MS`  | `2000`                                |
    pub fn from_env() -> Result<Self, CoreError> {
        let limits = QuotaLimits {
            image: parse_or("DAILY_IMAGE_LIMIT", DEFAULT_DAILY_IMAGE_LIMIT)?,
            chat: parse_or("DAILY_CHAT_LIMIT", DEFAULT_DAILY_CHAT_LIMIT)?,
        };

        let vip_roles = match var_opt("VIP_ROLE_IDS") {
            Some(raw) => parse_id_list(&raw)?,
            None => Vec::new(),
        };

        let unload_settle_ms: u64 =
            parse_or("UNLOAD_SETTLE_MS", DEFAULT_UNLOAD_SETTLE.as_millis() as u64)?;

        Ok(Self {
            limits,
            vip_roles,
            context_turns: parse_or("CONTEXT_TURNS", DEFAULT_CONTEXT_TURNS)?,
            persona: var_or("PERSONA_PROMPT", DEFAULT_PERSONA),
            negative_base: var_or("NEGATIVE_PROMPT", BASE_NEGATIVE),
            unload_settle: Duration::from_millis(unload_settle_ms),
        })
    }
}
