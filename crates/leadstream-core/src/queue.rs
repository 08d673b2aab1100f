//! Email queue counters pushed over the real-time channel.

use serde::{Deserialize, Serialize};

/// Event name carrying queue counters.
pub const QUEUE_UPDATE_EVENT: &str = "emailQueueUpdate";

/// Aggregate email queue totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub failed: u64,
    pub total: u64,
}

/// A named push event as framed on the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushEvent {
    pub fn queue_update(stats: QueueStats) -> Self {
        Self {
            event: QUEUE_UPDATE_EVENT.to_string(),
            data: serde_json::to_value(stats).unwrap_or_default(),
        }
    }

    /// Decode queue counters if this is a queue update.
    pub fn queue_stats(&self) -> Option<QueueStats> {
        if self.event != QUEUE_UPDATE_EVENT {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}
