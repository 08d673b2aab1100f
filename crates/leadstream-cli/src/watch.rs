//! `watch`: follow the feed and the email queue until interrupted.

use std::sync::Arc;
use std::time::Duration;

use leadstream_client::{ActivityTreeStore, Poller, QueueMonitor};
use leadstream_core::{Activity, Lead, QueueStats};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::{print_feed, render};

/// What the last printed feed showed. Any difference, including likes,
/// edits and flags on existing entries, triggers a reprint.
#[derive(Debug, PartialEq)]
struct FeedSnapshot {
    lead: Option<Lead>,
    activities: Vec<Activity>,
}

impl FeedSnapshot {
    fn of(store: &ActivityTreeStore) -> Self {
        Self {
            lead: store.lead(),
            activities: store.activities(),
        }
    }
}

async fn next_queue(rx: &mut Option<watch::Receiver<QueueStats>>) -> Option<QueueStats> {
    let rx = rx.as_mut()?;
    rx.changed().await.ok()?;
    Some(*rx.borrow_and_update())
}

pub async fn run(store: &Arc<ActivityTreeStore>, config: &Config) -> anyhow::Result<()> {
    print_feed(store, false).await?;

    let poller = Poller::spawn(store.clone(), config.poll_interval());
    let monitor = match &config.socket_url {
        Some(url) => match QueueMonitor::connect(url).await {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                warn!("queue updates unavailable: {}", e);
                None
            }
        },
        None => None,
    };
    let mut queue = monitor.as_ref().map(QueueMonitor::subscribe);
    info!(
        lead = store.lead_id(),
        interval = ?config.poll_interval(),
        "watching"
    );

    let mut shown = FeedSnapshot::of(store);
    let mut check = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = check.tick() => {
                let current = FeedSnapshot::of(store);
                if current != shown {
                    shown = current;
                    println!("\n--- {} activities ---", store.total_activities());
                    print_feed(store, false).await?;
                }
            }
            Some(stats) = next_queue(&mut queue) => println!("{}", render::queue_line(&stats)),
        }
    }

    poller.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadstream_client::{ApiConfig, HttpLeadApi, StoreConfig, TracingNotifier};
    use leadstream_mock_crm::MockCrm;
    use tokio::net::TcpListener;

    fn store_for(addr: &str, token: &str) -> ActivityTreeStore {
        let api = HttpLeadApi::new(ApiConfig {
            base_url: format!("http://{}", addr),
            token: Some(token.to_string()),
            timeout_secs: 5,
        })
        .unwrap();
        ActivityTreeStore::new(
            "lead-1",
            Arc::new(api),
            Arc::new(TracingNotifier),
            StoreConfig::default(),
        )
    }

    #[tokio::test]
    async fn like_on_existing_entry_changes_snapshot() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(MockCrm::seeded("test").serve(listener));

        let watcher = store_for(&addr, "u2");
        let actor = store_for(&addr, "u3");
        watcher.load_feed(false).await.unwrap();
        actor.load_feed(false).await.unwrap();
        let shown = FeedSnapshot::of(&watcher);
        let total = watcher.total_activities();

        let followup = actor.visible_feed()[0].id.clone();
        actor.toggle_like(&followup).await.unwrap();
        watcher.load_feed(true).await.unwrap();
        assert_eq!(watcher.total_activities(), total);
        assert_ne!(FeedSnapshot::of(&watcher), shown);

        watcher.load_feed(true).await.unwrap();
        let settled = FeedSnapshot::of(&watcher);
        watcher.load_feed(true).await.unwrap();
        assert_eq!(FeedSnapshot::of(&watcher), settled);
    }
}
