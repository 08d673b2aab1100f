//! Timeline entries on a lead.
//!
//! An activity is either a user comment or a system event (status change,
//! reassignment, field update, ...). Comments may be replies: a reply carries
//! the id of the top-level comment whose reply bucket it belongs to.

use crate::user::{Author, UserRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Created,
    Comment,
    StatusChange,
    AssignmentChange,
    FieldUpdate,
    EmailSent,
    CallLogged,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Created => "created",
            ActivityType::Comment => "comment",
            ActivityType::StatusChange => "status_change",
            ActivityType::AssignmentChange => "assignment_change",
            ActivityType::FieldUpdate => "field_update",
            ActivityType::EmailSent => "email_sent",
            ActivityType::CallLogged => "call_logged",
        }
    }
}

/// A like on a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_role: Option<String>,
    pub liked_at: DateTime<Utc>,
}

/// A file attached to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
}

/// Snapshot of the comment a quote reply was written against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedComment {
    pub author: String,
    pub content: String,
}

/// A reply as listed on its parent: either a bare id or the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyRef {
    Id(String),
    Inline(Box<Activity>),
}

impl ReplyRef {
    pub fn id(&self) -> &str {
        match self {
            ReplyRef::Id(id) => id,
            ReplyRef::Inline(activity) => &activity.id,
        }
    }
}

/// One entry in a lead's activity stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub created_by: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Top-level comment this entry replies to. Empty strings count as absent.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_comment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_comment: Option<QuotedComment>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub replies: Vec<ReplyRef>,
    #[serde(default)]
    pub mentions: Vec<UserRef>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Activity {
    /// Whether this entry belongs in the main feed.
    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.as_deref().is_none_or(str::is_empty)
    }

    /// Id of the top-level comment a reply to this entry must attach under.
    ///
    /// Replies are flattened one level deep: answering a reply attaches to
    /// the reply's own parent, never to the reply itself.
    pub fn thread_root_id(&self) -> &str {
        match self.parent_comment_id.as_deref() {
            Some(parent) if !parent.is_empty() => parent,
            _ => &self.id,
        }
    }

    /// Display text: the comment body, falling back to the system description.
    pub fn text(&self) -> &str {
        self.comment
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or_default()
    }

    pub fn is_comment(&self) -> bool {
        self.activity_type == ActivityType::Comment
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|l| l.user_id == user_id)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Client-side type filter for the main feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityFilter {
    #[default]
    All,
    Comment,
    StatusChange,
    AssignmentChange,
    FieldUpdate,
    Created,
}

impl ActivityFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityFilter::All => "all",
            ActivityFilter::Comment => "comment",
            ActivityFilter::StatusChange => "status_change",
            ActivityFilter::AssignmentChange => "assignment_change",
            ActivityFilter::FieldUpdate => "field_update",
            ActivityFilter::Created => "created",
        }
    }

    fn activity_type(&self) -> Option<ActivityType> {
        match self {
            ActivityFilter::All => None,
            ActivityFilter::Comment => Some(ActivityType::Comment),
            ActivityFilter::StatusChange => Some(ActivityType::StatusChange),
            ActivityFilter::AssignmentChange => Some(ActivityType::AssignmentChange),
            ActivityFilter::FieldUpdate => Some(ActivityType::FieldUpdate),
            ActivityFilter::Created => Some(ActivityType::Created),
        }
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        self.activity_type()
            .is_none_or(|t| t == activity.activity_type)
    }
}

impl fmt::Display for ActivityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ActivityFilter::All,
            ActivityFilter::Comment,
            ActivityFilter::StatusChange,
            ActivityFilter::AssignmentChange,
            ActivityFilter::FieldUpdate,
            ActivityFilter::Created,
        ]
        .into_iter()
        .find(|f| f.as_str() == s)
        .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity filter: {0}")]
pub struct UnknownFilter(pub String);

/// A prior revision of an edited comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditHistoryEntry {
    pub content: String,
    pub edited_by: UserRef,
    pub edited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity(id: &str, kind: &str, parent: serde_json::Value) -> Activity {
        serde_json::from_value(json!({
            "_id": id,
            "type": kind,
            "createdBy": {"userId": "u1", "userName": "Ana", "userRole": "admin"},
            "createdAt": "2024-05-01T10:00:00Z",
            "comment": "hello",
            "parentCommentId": parent,
        }))
        .unwrap()
    }

    #[test]
    fn top_level_is_absence_of_parent() {
        assert!(activity("1", "comment", json!(null)).is_top_level());
        assert!(activity("1", "comment", json!("")).is_top_level());
        assert!(!activity("3", "comment", json!("1")).is_top_level());
    }

    #[test]
    fn replies_flatten_to_their_root() {
        let top = activity("1", "comment", json!(null));
        let reply = activity("3", "comment", json!("1"));
        assert_eq!(top.thread_root_id(), "1");
        assert_eq!(reply.thread_root_id(), "1");
    }

    #[test]
    fn filter_matches_by_type() {
        let status = activity("2", "status_change", json!(null));
        assert!(ActivityFilter::All.matches(&status));
        assert!(ActivityFilter::StatusChange.matches(&status));
        assert!(!ActivityFilter::Comment.matches(&status));
    }

    #[test]
    fn filter_parses_snake_case() {
        assert_eq!(
            "assignment_change".parse::<ActivityFilter>().unwrap(),
            ActivityFilter::AssignmentChange
        );
        assert!("email_sent".parse::<ActivityFilter>().is_err());
    }

    #[test]
    fn replies_accept_ids_or_records() {
        let mut value = serde_json::to_value(activity("1", "comment", json!(null))).unwrap();
        let inline = serde_json::to_value(activity("4", "comment", json!("1"))).unwrap();
        value["replies"] = json!(["3", inline]);
        let parsed: Activity = serde_json::from_value(value).unwrap();
        let ids: Vec<&str> = parsed.replies.iter().map(ReplyRef::id).collect();
        assert_eq!(ids, ["3", "4"]);
    }

    #[test]
    fn text_falls_back_to_description() {
        let mut a = activity("2", "status_change", json!(null));
        a.comment = None;
        a.description = Some("Status changed to Won".into());
        assert_eq!(a.text(), "Status changed to Won");
    }
}
