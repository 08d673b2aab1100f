//! Request and response bodies of the lead activity API.
//!
//! Every response carries `success` and an optional `message`; a response
//! with `success: false` is a server-side rejection and its payload fields
//! are absent, hence the defaults.

use crate::activity::{Activity, EditHistoryEntry, Like, QuotedComment};
use crate::lead::{Lead, LeadField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Common shape of every response.
pub trait Envelope {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

macro_rules! envelope {
    ($($ty:ty),* $(,)?) => {
        $(impl Envelope for $ty {
            fn success(&self) -> bool {
                self.success
            }

            fn message(&self) -> Option<&str> {
                self.message.as_deref()
            }
        })*
    };
}

fn yes() -> bool {
    true
}

/// Lead together with its full activity list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub lead: Lead,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub total_activities: u64,
}

/// Outcome of a mutation with no payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MutationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Authoritative like list after a toggle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LikeResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub likes: Vec<Like>,
}

/// Full reply bucket of one top-level comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepliesResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub replies: Vec<Activity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<EditHistoryEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<Activity>,
    #[serde(default)]
    pub count: u64,
}

envelope!(
    FeedResponse,
    MutationResponse,
    LikeResponse,
    RepliesResponse,
    HistoryResponse,
    SearchResponse,
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditComment {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reply that embeds a snapshot of the quoted comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReply {
    pub content: String,
    pub quoted_comment: QuotedComment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedReply {
    pub parent_comment_id: String,
    pub content: String,
}

/// Partial lead update, keyed by field name.
pub type LeadUpdate = BTreeMap<LeadField, String>;
