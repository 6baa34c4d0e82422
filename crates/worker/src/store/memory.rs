use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use clair_core::chat::ChatMessage;
use clair_core::job::JobKind;
use clair_core::types::{ChannelId, UserId};

use super::{ContextStore, QuotaStore, StoreError};

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

/// Process-local quota counters. Lost on restart.
///
/// A single mutex guards the whole map, which makes check-and-increment
/// indivisible without further coordination. Counters for days before the
/// newest day seen are dropped when the day rolls over.
#[derive(Default)]
pub struct MemoryQuotaStore {
    counters: Mutex<DailyCounters>,
}

#[derive(Default)]
struct DailyCounters {
    latest_day: Option<NaiveDate>,
    by_key: HashMap<(UserId, NaiveDate, JobKind), i32>,
}

impl DailyCounters {
    fn roll_over(&mut self, day: NaiveDate) {
        if self.latest_day.is_some_and(|latest| latest >= day) {
            return;
        }
        self.latest_day = Some(day);
        self.by_key.retain(|(_, d, _), _| *d >= day);
    }
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value, zero when absent.
    pub fn count(&self, user_id: UserId, day: NaiveDate, kind: JobKind) -> i32 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.by_key.get(&(user_id, day, kind)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn check_and_increment(
        &self,
        user_id: UserId,
        day: NaiveDate,
        kind: JobKind,
        limit: i32,
    ) -> Result<Option<i32>, StoreError> {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.roll_over(day);
        let counter = counters.by_key.entry((user_id, day, kind)).or_insert(0);
        if *counter >= limit {
            return Ok(None);
        }
        *counter += 1;
        Ok(Some(*counter))
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Process-local conversation history, capped at `capacity` turns per
/// channel. Older turns are evicted first.
pub struct MemoryContextStore {
    capacity: usize,
    channels: Mutex<HashMap<ChannelId, VecDeque<ChatMessage>>>,
}

impl MemoryContextStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ContextStore for MemoryContextStore {
    async fn recent(
        &self,
        channel_id: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let Some(turns) = channels.get(&channel_id) else {
            return Ok(Vec::new());
        };
        let skip = turns.len().saturating_sub(limit);
        Ok(turns.iter().skip(skip).cloned().collect())
    }

    async fn append_exchange(
        &self,
        channel_id: ChannelId,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), StoreError> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let turns = channels.entry(channel_id).or_default();
        turns.push_back(ChatMessage::user(user_content));
        turns.push_back(ChatMessage::assistant(assistant_content));
        while turns.len() > self.capacity {
            turns.pop_front();
        }
        Ok(())
    }
}
