//! Daily quota arithmetic shared by the ledger and its stores.
//!
//! Counters are keyed by (user, UTC calendar day). A new day is a new
//! key, so rollover needs no reset job.

use chrono::NaiveDate;
use serde::Serialize;

use crate::job::JobKind;
use crate::types::{RoleId, Timestamp};

/// Image generations allowed per user per day outside the VIP tier.
pub const DEFAULT_DAILY_IMAGE_LIMIT: i32 = 3;

/// Chat turns allowed per user per day outside the VIP tier.
pub const DEFAULT_DAILY_CHAT_LIMIT: i32 = 15;

/// Per-kind daily limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub chat: i32,
    pub image: i32,
}

impl QuotaLimits {
    pub fn limit_for(&self, kind: JobKind) -> i32 {
        match kind {
            JobKind::Chat => self.chat,
            JobKind::Image => self.image,
        }
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            chat: DEFAULT_DAILY_CHAT_LIMIT,
            image: DEFAULT_DAILY_IMAGE_LIMIT,
        }
    }
}

/// Outcome of an atomic check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuotaDecision {
    /// Counted; `used` includes this request.
    Admitted { used: i32, limit: i32 },
    /// VIP identity, never counted.
    Unlimited,
    /// Already at the limit; nothing was counted.
    Denied { limit: i32 },
}

impl QuotaDecision {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }

    /// Turn a post-increment counter value into a decision.
    ///
    /// Stores return `None` when the guarded increment matched no row,
    /// i.e. the counter was already at `limit`.
    pub fn from_counter(counter: Option<i32>, limit: i32) -> Self {
        match counter {
            Some(used) => Self::Admitted { used, limit },
            None => Self::Denied { limit },
        }
    }
}

impl std::fmt::Display for QuotaDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admitted { used, limit } => write!(f, "{used}/{limit}"),
            Self::Unlimited => f.write_str("unlimited"),
            Self::Denied { limit } => write!(f, "{limit}/{limit}"),
        }
    }
}

/// Whether any of the user's roles is in the unlimited tier.
pub fn is_vip(user_roles: &[RoleId], vip_roles: &[RoleId]) -> bool {
    user_roles.iter().any(|r| vip_roles.contains(r))
}

/// The ledger day a timestamp falls on.
pub fn usage_day(at: Timestamp) -> NaiveDate {
    at.date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decisions_render_as_counters() {
        assert_eq!(QuotaDecision::Admitted { used: 2, limit: 3 }.to_string(), "2/3");
        assert_eq!(QuotaDecision::Denied { limit: 3 }.to_string(), "3/3");
        assert_eq!(QuotaDecision::Unlimited.to_string(), "unlimited");
    }

    #[test]
    fn missing_counter_means_denied() {
        assert_eq!(
            QuotaDecision::from_counter(None, 15),
            QuotaDecision::Denied { limit: 15 }
        );
        assert!(QuotaDecision::from_counter(Some(1), 15).is_admitted());
    }

    #[test]
    fn vip_matches_any_role() {
        assert!(is_vip(&[1, 2, 3], &[3, 9]));
        assert!(!is_vip(&[1, 2], &[3, 9]));
        assert!(!is_vip(&[], &[3]));
    }

    #[test]
    fn default_limits_match_free_tier() {
        let limits = QuotaLimits::default();
        assert_eq!(limits.limit_for(JobKind::Image), 3);
        assert_eq!(limits.limit_for(JobKind::Chat), 15);
    }

    #[test]
    fn usage_day_is_utc_date() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(usage_day(at), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }
}
