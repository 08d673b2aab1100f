//! Reconciled view of one lead's activity stream.
//!
//! The server owns every record. The store keeps the last feed snapshot,
//! lazily fetched reply buckets keyed by top-level comment id, and the
//! view state around them (expansion, filter, search overlay, field edits).
//! Mutations go to the server first and are followed by a silent refetch;
//! only likes are patched in place, from the authoritative list the server
//! returns.

use crate::api::LeadApi;
use crate::error::{ClientError, Result};
use crate::notify::{Level, Notification, NotifierRef};
use leadstream_core::wire::{EditComment, LeadUpdate, NestedReply, NewComment, QuoteReply};
use leadstream_core::{
    Activity, ActivityFilter, ActivityPermissions, CurrentUser, EditHistoryEntry, FieldState,
    Lead, LeadField, LeadFieldEditor, QuotedComment,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How a reply is attached to the comment it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Embeds a snapshot of the answered comment's author and text.
    Quote,
    /// Plain threaded reply.
    Nested,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Delay before leaving the view after an access-denied feed load.
    pub redirect_delay: Duration,
    pub redirect_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redirect_delay: Duration::from_secs(2),
            redirect_path: "/leads".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct SearchOverlay {
    query: String,
    results: Vec<Activity>,
}

/// Fetch bookkeeping for one reply bucket.
#[derive(Debug, Default)]
struct BucketFetches {
    issued: u64,
    applied: u64,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    lead: Option<Lead>,
    activities: Vec<Activity>,
    total_activities: u64,
    /// Ticket of the feed response currently applied.
    applied_ticket: u64,
    nested_replies: HashMap<String, Vec<Activity>>,
    expanded: HashSet<String>,
    reply_fetches: HashMap<String, BucketFetches>,
    filter: ActivityFilter,
    search: Option<SearchOverlay>,
    editor: LeadFieldEditor,
    current_user: Option<CurrentUser>,
    redirect_scheduled: bool,
}

pub struct ActivityTreeStore {
    lead_id: String,
    api: Arc<dyn LeadApi>,
    notifier: NotifierRef,
    config: StoreConfig,
    feed_tickets: AtomicU64,
    state: Mutex<StoreState>,
}

impl StoreState {
    fn fetch_in_flight(&self, parent_id: &str) -> bool {
        self.reply_fetches
            .get(parent_id)
            .is_some_and(|f| f.in_flight > 0)
    }

    /// Register a bucket fetch and return its ticket.
    fn begin_fetch(&mut self, parent_id: &str) -> u64 {
        let fetches = self.reply_fetches.entry(parent_id.to_string()).or_default();
        fetches.issued += 1;
        fetches.in_flight += 1;
        fetches.issued
    }
}

/// Releases one in-flight bucket fetch however it ends.
struct InFlight<'a> {
    store: &'a ActivityTreeStore,
    parent_id: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(fetches) = self.store.state().reply_fetches.get_mut(self.parent_id) {
            fetches.in_flight = fetches.in_flight.saturating_sub(1);
        }
    }
}

impl ActivityTreeStore {
    pub fn new(
        lead_id: impl Into<String>,
        api: Arc<dyn LeadApi>,
        notifier: NotifierRef,
        config: StoreConfig,
    ) -> Self {
        Self {
            lead_id: lead_id.into(),
            api,
            notifier,
            config,
            feed_tickets: AtomicU64::new(0),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn lead_id(&self) -> &str {
        &self.lead_id
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, level: Level, message: impl Into<String>) {
        self.notifier.notify(Notification::new(level, message));
    }

    fn report(&self, action: &str, err: &ClientError) {
        tracing::warn!(lead = %self.lead_id, "{} failed: {}", action, err);
        self.notify(Level::Error, err.user_message());
    }

    // ==================== Feed ====================

    /// Fetch the lead and its activity list, replacing the current snapshot.
    ///
    /// Silent loads (background poll, post-mutation refresh) only log
    /// failures. A response older than the one already applied is dropped.
    pub async fn load_feed(&self, silent: bool) -> Result<()> {
        let ticket = self.feed_tickets.fetch_add(1, Ordering::SeqCst) + 1;

        match self.api.load_feed(&self.lead_id).await {
            Ok(feed) => {
                let mut state = self.state();
                if ticket <= state.applied_ticket {
                    tracing::debug!(
                        ticket,
                        applied = state.applied_ticket,
                        "discarding stale feed"
                    );
                    return Ok(());
                }
                state.applied_ticket = ticket;
                state.activities = feed.activities;
                state.total_activities = feed.total_activities;
                state.editor.seed(&feed.lead);
                state.lead = Some(feed.lead);
                Ok(())
            }
            Err(err) if err.is_access_denied() => {
                tracing::warn!(lead = %self.lead_id, "feed access denied: {}", err);
                self.notify(Level::Error, err.user_message());
                self.schedule_redirect();
                Err(err)
            }
            Err(err) if silent => {
                tracing::warn!(lead = %self.lead_id, "background refresh failed: {}", err);
                Err(err)
            }
            Err(err) => {
                self.report("loading feed", &err);
                Err(err)
            }
        }
    }

    fn schedule_redirect(&self) {
        {
            let mut state = self.state();
            if state.redirect_scheduled {
                return;
            }
            state.redirect_scheduled = true;
        }
        let notifier = self.notifier.clone();
        let path = self.config.redirect_path.clone();
        let delay = self.config.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.redirect(&path);
        });
    }

    /// Entries for the main list: the search overlay verbatim when active,
    /// otherwise top-level activities passing the type filter.
    pub fn visible_feed(&self) -> Vec<Activity> {
        let state = self.state();
        if let Some(search) = &state.search {
            return search.results.clone();
        }
        state
            .activities
            .iter()
            .filter(|a| a.is_top_level() && state.filter.matches(a))
            .cloned()
            .collect()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.state().activities.clone()
    }

    pub fn activity(&self, id: &str) -> Option<Activity> {
        let state = self.state();
        state
            .activities
            .iter()
            .chain(state.nested_replies.values().flatten())
            .chain(state.search.iter().flat_map(|s| s.results.iter()))
            .find(|a| a.id == id)
            .cloned()
    }

    pub fn lead(&self) -> Option<Lead> {
        self.state().lead.clone()
    }

    pub fn total_activities(&self) -> u64 {
        self.state().total_activities
    }

    pub fn filter(&self) -> ActivityFilter {
        self.state().filter
    }

    pub fn set_filter(&self, filter: ActivityFilter) {
        self.state().filter = filter;
    }

    // ==================== Replies ====================

    /// Flip expansion of a top-level comment. Returns the new state.
    ///
    /// The first expansion of a never-fetched bucket loads it; a second
    /// click while that load is pending does not start another.
    pub async fn toggle_expand(&self, activity_id: &str) -> Result<bool> {
        let ticket = {
            let mut state = self.state();
            if state.expanded.remove(activity_id) {
                return Ok(false);
            }
            state.expanded.insert(activity_id.to_string());
            let fetch = !state.nested_replies.contains_key(activity_id)
                && !state.fetch_in_flight(activity_id);
            fetch.then(|| state.begin_fetch(activity_id))
        };
        if let Some(ticket) = ticket {
            self.load_bucket(activity_id, ticket, true).await?;
        }
        Ok(true)
    }

    /// Load one reply bucket unless a load for it is already in flight.
    pub async fn fetch_replies(&self, parent_id: &str) -> Result<()> {
        let ticket = {
            let mut state = self.state();
            if state.fetch_in_flight(parent_id) {
                tracing::debug!(parent = parent_id, "reply fetch already in flight");
                return Ok(());
            }
            state.begin_fetch(parent_id)
        };
        self.load_bucket(parent_id, ticket, true).await
    }

    /// Load a bucket even if an older load is still running; that load's
    /// response is dropped if it lands later.
    async fn refresh_bucket(&self, parent_id: &str) -> Result<()> {
        let ticket = self.state().begin_fetch(parent_id);
        self.load_bucket(parent_id, ticket, false).await
    }

    /// Caller has registered the fetch; it is released on every exit path.
    async fn load_bucket(&self, parent_id: &str, ticket: u64, loud: bool) -> Result<()> {
        let _in_flight = InFlight {
            store: self,
            parent_id,
        };
        match self.api.get_replies(&self.lead_id, parent_id).await {
            Ok(response) => {
                let mut state = self.state();
                let fetches = state.reply_fetches.entry(parent_id.to_string()).or_default();
                if ticket <= fetches.applied {
                    tracing::debug!(parent = parent_id, ticket, "discarding stale reply bucket");
                    return Ok(());
                }
                fetches.applied = ticket;
                state
                    .nested_replies
                    .insert(parent_id.to_string(), response.replies);
                Ok(())
            }
            Err(err) => {
                if loud {
                    self.report("loading replies", &err);
                } else {
                    tracing::warn!(parent = parent_id, "reply refresh failed: {}", err);
                }
                Err(err)
            }
        }
    }

    /// Fetched replies of a top-level comment; `None` if never fetched.
    pub fn reply_bucket(&self, parent_id: &str) -> Option<Vec<Activity>> {
        self.state().nested_replies.get(parent_id).cloned()
    }

    pub fn is_expanded(&self, activity_id: &str) -> bool {
        self.state().expanded.contains(activity_id)
    }

    pub fn is_loading_replies(&self, activity_id: &str) -> bool {
        self.state().fetch_in_flight(activity_id)
    }

    /// Answer `parent` and surface the new reply under its thread root.
    ///
    /// Replies never nest deeper than one level: answering a reply attaches
    /// to the reply's own top-level comment.
    pub async fn submit_reply(
        &self,
        parent: &Activity,
        content: &str,
        mode: ReplyMode,
    ) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(self.invalid("Reply cannot be empty"));
        }
        let root = parent.thread_root_id().to_string();

        let posted = match mode {
            ReplyMode::Quote => {
                let body = QuoteReply {
                    content: content.to_string(),
                    quoted_comment: QuotedComment {
                        author: parent.created_by.user_name.clone(),
                        content: parent.text().to_string(),
                    },
                };
                self.api.quote_reply(&self.lead_id, &parent.id, &body).await
            }
            ReplyMode::Nested => {
                let body = NestedReply {
                    parent_comment_id: root.clone(),
                    content: content.to_string(),
                };
                self.api.nested_reply(&self.lead_id, &body).await
            }
        };

        let response = match posted {
            Ok(response) => response,
            Err(err) => {
                self.report("posting reply", &err);
                return Err(err);
            }
        };
        self.notify(
            Level::Success,
            response.message.unwrap_or_else(|| "Reply added".to_string()),
        );

        // The new reply is nested, so the feed refetch alone never shows it.
        let _ = self.load_feed(true).await;
        self.state().expanded.insert(root.clone());
        let _ = self.refresh_bucket(&root).await;
        Ok(())
    }

    // ==================== Comment mutations ====================

    fn invalid(&self, message: &'static str) -> ClientError {
        self.notify(Level::Warning, message);
        ClientError::Validation(message)
    }

    pub async fn add_comment(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.invalid("Comment cannot be empty"));
        }
        let body = NewComment {
            text: text.to_string(),
        };
        let outcome = self.api.add_comment(&self.lead_id, &body).await;
        self.settle("adding comment", outcome.map(|r| r.message), "Comment added").await
    }

    pub async fn edit_comment(
        &self,
        comment_id: &str,
        content: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(self.invalid("Comment cannot be empty"));
        }
        let body = EditComment {
            content: content.to_string(),
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        };
        let outcome = self
            .api
            .edit_comment(&self.lead_id, comment_id, &body)
            .await;
        self.settle("editing comment", outcome.map(|r| r.message), "Comment updated").await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        let outcome = self.api.delete_comment(&self.lead_id, comment_id).await;
        self.settle("deleting comment", outcome.map(|r| r.message), "Comment deleted").await
    }

    pub async fn toggle_pin(&self, comment_id: &str) -> Result<()> {
        let outcome = self.api.toggle_pin(&self.lead_id, comment_id).await;
        self.settle("toggling pin", outcome.map(|r| r.message), "Pin updated").await
    }

    pub async fn toggle_important(&self, comment_id: &str) -> Result<()> {
        let outcome = self.api.toggle_important(&self.lead_id, comment_id).await;
        self.settle(
            "toggling important flag",
            outcome.map(|r| r.message),
            "Important flag updated",
        )
        .await
    }

    /// Report a mutation outcome; on success, refetch the whole feed.
    async fn settle(
        &self,
        action: &str,
        outcome: Result<Option<String>>,
        fallback: &str,
    ) -> Result<()> {
        match outcome {
            Ok(message) => {
                self.notify(
                    Level::Success,
                    message.unwrap_or_else(|| fallback.to_string()),
                );
                let _ = self.load_feed(true).await;
                Ok(())
            }
            Err(err) => {
                self.report(action, &err);
                Err(err)
            }
        }
    }

    /// Toggle the viewer's like and adopt the server's like list.
    ///
    /// Only top-level entries are patched; reply buckets keep their copy
    /// until they are refetched.
    pub async fn toggle_like(&self, activity_id: &str) -> Result<()> {
        let response = match self.api.toggle_like(&self.lead_id, activity_id).await {
            Ok(response) => response,
            Err(err) => {
                self.report("toggling like", &err);
                return Err(err);
            }
        };
        let mut state = self.state();
        if let Some(activity) = state.activities.iter_mut().find(|a| a.id == activity_id) {
            activity.likes = response.likes;
        }
        Ok(())
    }

    /// Prior revisions of an edited comment, oldest first as served.
    pub async fn view_history(&self, comment_id: &str) -> Result<Vec<EditHistoryEntry>> {
        match self.api.get_history(&self.lead_id, comment_id).await {
            Ok(response) => Ok(response.history),
            Err(err) => {
                self.report("loading edit history", &err);
                Err(err)
            }
        }
    }

    // ==================== Search ====================

    /// Server-side full-text search; a blank query leaves search mode.
    pub async fn search_comments(&self, query: &str) -> Result<usize> {
        let query = query.trim();
        if query.is_empty() {
            self.clear_search();
            return Ok(0);
        }
        match self.api.search_comments(&self.lead_id, query).await {
            Ok(response) => {
                let count = response.results.len();
                self.state().search = Some(SearchOverlay {
                    query: query.to_string(),
                    results: response.results,
                });
                Ok(count)
            }
            Err(err) => {
                self.report("searching comments", &err);
                Err(err)
            }
        }
    }

    pub fn clear_search(&self) {
        self.state().search = None;
    }

    pub fn is_searching(&self) -> bool {
        self.state().search.is_some()
    }

    pub fn search_query(&self) -> Option<String> {
        self.state().search.as_ref().map(|s| s.query.clone())
    }

    // ==================== Lead fields ====================

    pub fn field_state(&self, field: LeadField) -> Option<FieldState> {
        self.state().editor.get(field).cloned()
    }

    pub fn begin_edit(&self, field: LeadField) {
        self.state().editor.begin_edit(field);
    }

    pub fn set_field_value(&self, field: LeadField, value: impl Into<String>) -> bool {
        self.state().editor.set_value(field, value)
    }

    pub fn cancel_edit(&self, field: LeadField) {
        self.state().editor.cancel(field);
    }

    /// Persist one edited field, then refetch.
    pub async fn save_field(&self, field: LeadField) -> Result<()> {
        let value = {
            let mut state = self.state();
            let blank = state
                .editor
                .value(field)
                .is_none_or(|v| v.trim().is_empty());
            if blank {
                drop(state);
                return Err(self.invalid("Field cannot be empty"));
            }
            state.editor.mark_saving(field)
        };
        let Some(value) = value else {
            return Err(ClientError::Validation("Field is not being edited"));
        };

        let update = LeadUpdate::from([(field, value.trim().to_string())]);
        match self.api.update_lead(&self.lead_id, &update).await {
            Ok(response) => {
                self.state().editor.finish_save(field, true);
                self.notify(
                    Level::Success,
                    response
                        .message
                        .unwrap_or_else(|| format!("Updated {}", field)),
                );
                let _ = self.load_feed(true).await;
                Ok(())
            }
            Err(err) => {
                self.state().editor.finish_save(field, false);
                self.report("saving lead field", &err);
                Err(err)
            }
        }
    }

    // ==================== Permissions ====================

    pub fn set_current_user(&self, user: CurrentUser) {
        self.state().current_user = Some(user);
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state().current_user.clone()
    }

    /// Permissions of the current viewer on `activity`, computed fresh.
    pub fn permissions(&self, activity: &Activity) -> ActivityPermissions {
        self.state()
            .current_user
            .as_ref()
            .map(|user| ActivityPermissions::evaluate(user, activity))
            .unwrap_or_default()
    }
}
