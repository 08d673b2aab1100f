//! In-memory `LeadApi` for store tests.

use crate::api::LeadApi;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use leadstream_core::wire::{
    EditComment, FeedResponse, HistoryResponse, LeadUpdate, LikeResponse, MutationResponse,
    NestedReply, NewComment, QuoteReply, RepliesResponse, SearchResponse,
};
use leadstream_core::{Activity, ActivityType, Author, Lead, Like, Role};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn activity(id: &str, kind: &str, parent: Option<&str>) -> Activity {
    let activity_type: ActivityType =
        serde_json::from_value(serde_json::Value::String(kind.to_string())).unwrap();
    Activity {
        id: id.to_string(),
        activity_type,
        created_by: Author {
            user_id: "u7".into(),
            user_name: "Ana".into(),
            user_role: Some(Role::SubAdmin),
        },
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        comment: Some(format!("note {}", id)),
        description: None,
        parent_comment_id: parent.map(str::to_string),
        quoted_comment: None,
        is_edited: false,
        is_pinned: false,
        is_important: false,
        likes: Vec::new(),
        replies: Vec::new(),
        mentions: Vec::new(),
        attachments: Vec::new(),
    }
}

pub fn reply(id: &str, parent: &str) -> Activity {
    activity(id, "comment", Some(parent))
}

pub fn like(user_id: &str) -> Like {
    Like {
        user_id: user_id.to_string(),
        user_name: String::new(),
        user_role: None,
        liked_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
    }
}

#[derive(Default)]
pub struct FakeApi {
    feed: Mutex<FeedResponse>,
    replies: Mutex<HashMap<String, Vec<Activity>>>,
    search_results: Mutex<Vec<Activity>>,
    like_response: Mutex<Vec<Like>>,
    failing: Mutex<HashSet<&'static str>>,
    deny_feed: AtomicBool,
    feed_gate: Mutex<Option<Arc<Notify>>>,
    replies_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<&'static str>>,
    nested: Mutex<Vec<NestedReply>>,
    quotes: Mutex<Vec<(String, QuoteReply)>>,
    lead_updates: Mutex<Vec<LeadUpdate>>,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.feed.lock().unwrap().lead = Lead {
            id: "L1".into(),
            name: "Acme".into(),
            status: "New".into(),
            ..Lead::default()
        };
        api
    }

    pub fn set_activities(&self, activities: Vec<Activity>) {
        let mut feed = self.feed.lock().unwrap();
        feed.total_activities = activities.len() as u64;
        feed.activities = activities;
    }

    pub fn rename_lead(&self, name: &str) {
        self.feed.lock().unwrap().lead.name = name.to_string();
    }

    pub fn set_replies(&self, parent: &str, replies: Vec<Activity>) {
        self.replies
            .lock()
            .unwrap()
            .insert(parent.to_string(), replies);
    }

    pub fn set_search_results(&self, results: Vec<Activity>) {
        *self.search_results.lock().unwrap() = results;
    }

    pub fn set_like_response(&self, likes: Vec<Like>) {
        *self.like_response.lock().unwrap() = likes;
    }

    /// Make every call of `op` fail with a server rejection.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn deny_feed(&self) {
        self.deny_feed.store(true, Ordering::SeqCst);
    }

    /// Hold the next feed response until notified.
    pub fn gate_feed(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.feed_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold the next reply fetch until notified.
    pub fn gate_replies(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.replies_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_nested_reply(&self) -> Option<NestedReply> {
        self.nested.lock().unwrap().last().cloned()
    }

    pub fn last_quote_reply(&self) -> Option<(String, QuoteReply)> {
        self.quotes.lock().unwrap().last().cloned()
    }

    pub fn last_lead_update(&self) -> Option<LeadUpdate> {
        self.lead_updates.lock().unwrap().last().cloned()
    }

    fn record(&self, op: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(op) {
            return Err(ClientError::Rejected {
                status: 400,
                message: "Nope".into(),
            });
        }
        Ok(())
    }

    fn done(message: &str) -> Result<MutationResponse> {
        Ok(MutationResponse::ok(message))
    }
}

#[async_trait]
impl LeadApi for FakeApi {
    async fn load_feed(&self, _lead_id: &str) -> Result<FeedResponse> {
        self.record("load_feed")?;
        if self.deny_feed.load(Ordering::SeqCst) {
            return Err(ClientError::AccessDenied("Access denied".into()));
        }
        let snapshot = self.feed.lock().unwrap().clone();
        let gate = self.feed_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(snapshot)
    }

    async fn add_comment(&self, _lead_id: &str, _body: &NewComment) -> Result<MutationResponse> {
        self.record("add_comment")?;
        Self::done("Comment added successfully")
    }

    async fn edit_comment(
        &self,
        _lead_id: &str,
        _comment_id: &str,
        _body: &EditComment,
    ) -> Result<MutationResponse> {
        self.record("edit_comment")?;
        Self::done("Comment updated successfully")
    }

    async fn delete_comment(&self, _lead_id: &str, _comment_id: &str) -> Result<MutationResponse> {
        self.record("delete_comment")?;
        Self::done("Comment deleted successfully")
    }

    async fn toggle_like(&self, _lead_id: &str, _comment_id: &str) -> Result<LikeResponse> {
        self.record("toggle_like")?;
        Ok(LikeResponse {
            success: true,
            message: None,
            likes: self.like_response.lock().unwrap().clone(),
        })
    }

    async fn toggle_pin(&self, _lead_id: &str, _comment_id: &str) -> Result<MutationResponse> {
        self.record("toggle_pin")?;
        Self::done("Comment pinned")
    }

    async fn toggle_important(
        &self,
        _lead_id: &str,
        _comment_id: &str,
    ) -> Result<MutationResponse> {
        self.record("toggle_important")?;
        Self::done("Comment marked as important")
    }

    async fn quote_reply(
        &self,
        _lead_id: &str,
        comment_id: &str,
        body: &QuoteReply,
    ) -> Result<MutationResponse> {
        self.record("quote_reply")?;
        self.quotes
            .lock()
            .unwrap()
            .push((comment_id.to_string(), body.clone()));
        Self::done("Reply added successfully")
    }

    async fn nested_reply(&self, _lead_id: &str, body: &NestedReply) -> Result<MutationResponse> {
        self.record("nested_reply")?;
        self.nested.lock().unwrap().push(body.clone());
        Self::done("Reply added successfully")
    }

    async fn get_replies(&self, _lead_id: &str, parent_id: &str) -> Result<RepliesResponse> {
        self.record("get_replies")?;
        let gate = self.replies_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let replies = self
            .replies
            .lock()
            .unwrap()
            .get(parent_id)
            .cloned()
            .unwrap_or_default();
        Ok(RepliesResponse {
            success: true,
            message: None,
            replies,
        })
    }

    async fn get_history(&self, _lead_id: &str, _comment_id: &str) -> Result<HistoryResponse> {
        self.record("get_history")?;
        Ok(HistoryResponse::default())
    }

    async fn search_comments(&self, _lead_id: &str, _query: &str) -> Result<SearchResponse> {
        self.record("search_comments")?;
        let results = self.search_results.lock().unwrap().clone();
        Ok(SearchResponse {
            success: true,
            message: None,
            count: results.len() as u64,
            results,
        })
    }

    async fn update_lead(&self, _lead_id: &str, update: &LeadUpdate) -> Result<MutationResponse> {
        self.record("update_lead")?;
        self.lead_updates.lock().unwrap().push(update.clone());
        Self::done("Lead updated successfully")
    }
}
