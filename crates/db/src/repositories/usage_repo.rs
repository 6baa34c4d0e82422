//! Repository for the `daily_usage` table.
//!
//! The only write is [`UsageRepo::check_and_increment`], a single
//! guarded upsert. The limit check and the increment happen in one
//! statement, so concurrent admissions for the same key cannot both
//! slip past the limit.

use chrono::NaiveDate;
use clair_core::job::JobKind;
use clair_core::types::UserId;
use sqlx::PgPool;

use crate::models::usage::DailyUsage;

/// Column list for `daily_usage` queries.
const COLUMNS: &str = "user_id, usage_date, chat_count, image_count, created_at, updated_at";

/// Counter column for a job kind. Never built from caller input.
fn counter_column(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Chat => "chat_count",
        JobKind::Image => "image_count",
    }
}

/// Provides the atomic counter operation and read access for quotas.
pub struct UsageRepo;

impl UsageRepo {
    /// Increment the `kind` counter for `(user_id, day)` if it is below
    /// `limit`.
    ///
    /// Returns the post-increment value, or `None` when the counter was
    /// already at the limit (nothing is written in that case).
    pub async fn check_and_increment(
        pool: &PgPool,
        user_id: UserId,
        day: NaiveDate,
        kind: JobKind,
        limit: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        if limit <= 0 {
            return Ok(None);
        }

        let col = counter_column(kind);
        let query = format!(
            "INSERT INTO daily_usage (user_id, usage_date, {col}) \
             VALUES ($1, $2, 1) \
             ON CONFLICT (user_id, usage_date) DO UPDATE SET \
                 {col} = daily_usage.{col} + 1, \
                 updated_at = NOW() \
             WHERE daily_usage.{col} < $3 \
             RETURNING {col}"
        );
        sqlx::query_scalar::<_, i32>(&query)
            .bind(user_id)
            .bind(day)
            .bind(limit)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the usage row for a user on a given day, if one exists.
    pub async fn find(
        pool: &PgPool,
        user_id: UserId,
        day: NaiveDate,
    ) -> Result<Option<DailyUsage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM daily_usage WHERE user_id = $1 AND usage_date = $2"
        );
        sqlx::query_as::<_, DailyUsage>(&query)
            .bind(user_id)
            .bind(day)
            .fetch_optional(pool)
            .await
    }
}
