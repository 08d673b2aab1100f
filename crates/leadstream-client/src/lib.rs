//! Client-side activity stream for the lead dashboard.
//!
//! [`ActivityTreeStore`] holds one lead's feed, its lazily loaded reply
//! buckets and the surrounding view state, talking to the server through
//! [`LeadApi`]. [`Poller`] keeps it fresh in the background and
//! [`QueueMonitor`] follows the email queue counters pushed over the socket.
//!
//! ```rust,no_run
//! use leadstream_client::{ActivityTreeStore, ApiConfig, HttpLeadApi, StoreConfig, TracingNotifier};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = HttpLeadApi::new(ApiConfig::default())?;
//! let store = ActivityTreeStore::new("lead-1", Arc::new(api), Arc::new(TracingNotifier), StoreConfig::default());
//! store.load_feed(false).await?;
//! for activity in store.visible_feed() {
//!     println!("{}", activity.text());
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod notify;
mod poll;
mod queue_monitor;
mod store;

#[cfg(test)]
mod test_support;

pub use api::{ApiConfig, HttpLeadApi, LeadApi};
pub use error::{ClientError, GENERIC_FAILURE, Result};
pub use notify::{InMemoryNotifier, Level, Notification, Notifier, NotifierRef, TracingNotifier};
pub use poll::{DEFAULT_POLL_INTERVAL, Poller};
pub use queue_monitor::{QueueMonitor, decode_frame};
pub use store::{ActivityTreeStore, ReplyMode, StoreConfig};
