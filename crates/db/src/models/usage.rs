use chrono::NaiveDate;
use clair_core::job::JobKind;
use clair_core::types::{Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `daily_usage` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyUsage {
    pub user_id: UserId,
    pub usage_date: NaiveDate,
    pub chat_count: i32,
    pub image_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DailyUsage {
    pub fn count_for(&self, kind: JobKind) -> i32 {
        match kind {
            JobKind::Chat => self.chat_count,
            JobKind::Image => self.image_count,
        }
    }
}
