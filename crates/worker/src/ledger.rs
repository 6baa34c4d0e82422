//! Per-user daily allowances.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clair_core::job::JobKind;
use clair_core::quota::{is_vip, usage_day, QuotaDecision, QuotaLimits};
use clair_core::types::RoleId;

use crate::job::Requester;
use crate::store::{QuotaStore, StoreError};

/// Admits or denies requests against the daily limits.
///
/// VIP requesters are admitted without touching the store. Everyone else
/// goes through the store's atomic check-and-increment, so a denial never
/// consumes anything and concurrent requests cannot overshoot the limit.
pub struct QuotaLedger {
    store: Arc<dyn QuotaStore>,
    limits: QuotaLimits,
    vip_roles: Vec<RoleId>,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn QuotaStore>, limits: QuotaLimits, vip_roles: Vec<RoleId>) -> Self {
        Self {
            store,
            limits,
            vip_roles,
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Consume one unit of today's (UTC) allowance for `kind`.
    pub async fn check_and_consume(
        &self,
        requester: &Requester,
        kind: JobKind,
    ) -> Result<QuotaDecision, StoreError> {
        self.check_and_consume_on(requester, kind, usage_day(Utc::now()))
            .await
    }

    /// Same as [`check_and_consume`](Self::check_and_consume) for an
    /// explicit ledger day.
    pub async fn check_and_consume_on(
        &self,
        requester: &Requester,
        kind: JobKind,
        day: NaiveDate,
    ) -> Result<QuotaDecision, StoreError> {
        if is_vip(&requester.role_ids, &self.vip_roles) {
            return Ok(QuotaDecision::Unlimited);
        }

        let limit = self.limits.limit_for(kind);
        let counter = self
            .store
            .check_and_increment(requester.user_id, day, kind, limit)
            .await?;
        let decision = QuotaDecision::from_counter(counter, limit);
        tracing::debug!(
            user_id = requester.user_id,
            %kind,
            %day,
            %decision,
            "Quota checked"
        );
        Ok(decision)
    }
}
