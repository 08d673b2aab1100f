//! Live email queue counters from the push socket.
//!
//! Unrelated to the activity store: it only keeps the most recent
//! `emailQueueUpdate` totals for dashboard widgets.

use crate::api::check_url;
use crate::error::Result;
use futures_util::StreamExt;
use leadstream_core::{PushEvent, QueueStats};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Decode one text frame. Non-queue events and malformed frames yield `None`.
pub fn decode_frame(text: &str) -> Option<QueueStats> {
    match serde_json::from_str::<PushEvent>(text) {
        Ok(event) => event.queue_stats(),
        Err(e) => {
            tracing::debug!("ignoring malformed push frame: {}", e);
            None
        }
    }
}

pub struct QueueMonitor {
    stats: watch::Receiver<QueueStats>,
    handle: JoinHandle<()>,
}

impl QueueMonitor {
    /// Connect and start listening. The latest event always wins.
    pub async fn connect(url: &str) -> Result<Self> {
        check_url(url, &["ws", "wss"])?;
        let (mut ws, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!("queue monitor connected to {}", url);

        let (tx, rx) = watch::channel(QueueStats::default());
        let handle = tokio::spawn(async move {
            while let Some(msg) = ws.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Some(stats) = decode_frame(text.as_str()) {
                            tx.send_replace(stats);
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("queue socket error: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("queue monitor stopped");
        });

        Ok(Self { stats: rx, handle })
    }

    pub fn latest(&self) -> QueueStats {
        *self.stats.borrow()
    }

    /// Receiver that wakes on every new set of counters.
    pub fn subscribe(&self) -> watch::Receiver<QueueStats> {
        self.stats.clone()
    }

    pub fn is_connected(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for QueueMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
