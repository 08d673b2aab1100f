//! In-memory CRM data and the rules the real backend enforces.

use chrono::Utc;
use leadstream_core::permissions;
use leadstream_core::wire::LeadUpdate;
use leadstream_core::{
    Activity, ActivityType, Author, CurrentUser, EditHistoryEntry, Lead, LeadAgent, LeadField,
    Like, QuotedComment, ReplyRef, Role, UserRef,
};
use std::collections::HashMap;

/// A refused request: HTTP status plus the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub message: String,
}

impl Rejection {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(404, format!("{} not found", what))
    }

    fn forbidden(message: &str) -> Self {
        Self::new(403, message)
    }
}

pub type Outcome<T> = Result<T, Rejection>;

struct StoredLead {
    lead: Lead,
    /// Newest first.
    activities: Vec<Activity>,
    history: HashMap<String, Vec<EditHistoryEntry>>,
}

pub struct ServerState {
    pub name: String,
    users: HashMap<String, CurrentUser>,
    default_user: String,
    leads: HashMap<String, StoredLead>,
    next_id: u64,
}

impl ServerState {
    pub fn new(name: String) -> Self {
        Self {
            name,
            users: HashMap::new(),
            default_user: String::new(),
            leads: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a user. The first one registered acts for anonymous requests.
    pub fn add_user(&mut self, user: CurrentUser) {
        if self.users.is_empty() {
            self.default_user = user.id.clone();
        }
        self.users.insert(user.id.clone(), user);
    }

    pub fn add_lead(&mut self, lead: Lead) {
        self.leads.insert(
            lead.id.clone(),
            StoredLead {
                lead,
                activities: Vec::new(),
                history: HashMap::new(),
            },
        );
    }

    /// Resolve the acting user from a bearer token (the user id).
    pub fn user(&self, token: Option<&str>) -> Outcome<CurrentUser> {
        let id = token.unwrap_or(&self.default_user);
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| Rejection::new(401, "Unknown user"))
    }

    fn next_id(&mut self) -> String {
        let id = format!("{:024x}", self.next_id);
        self.next_id += 1;
        id
    }

    fn lead_mut(&mut self, user: &CurrentUser, lead_id: &str) -> Outcome<&mut StoredLead> {
        let stored = self
            .leads
            .get_mut(lead_id)
            .ok_or_else(|| Rejection::not_found("Lead"))?;
        // Subadmins only see leads assigned to them.
        let visible = match (&user.role, &stored.lead.agent) {
            (Role::SubAdmin, Some(agent)) => agent.id == user.id,
            _ => true,
        };
        if !visible {
            return Err(Rejection::forbidden("Access denied"));
        }
        Ok(stored)
    }

    fn new_activity(
        &mut self,
        user: &CurrentUser,
        activity_type: ActivityType,
        text: String,
    ) -> Activity {
        Activity {
            id: self.next_id(),
            activity_type,
            created_by: Author {
                user_id: user.id.clone(),
                user_name: user.name.clone(),
                user_role: Some(user.role),
            },
            created_at: Utc::now(),
            comment: (activity_type == ActivityType::Comment).then(|| text.clone()),
            description: (activity_type != ActivityType::Comment).then_some(text),
            parent_comment_id: None,
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

    /// Record a system event or comment on a lead.
    pub fn log(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        activity_type: ActivityType,
        text: &str,
    ) -> Outcome<String> {
        let activity = self.new_activity(user, activity_type, text.to_string());
        let id = activity.id.clone();
        self.lead_mut(user, lead_id)?.activities.insert(0, activity);
        Ok(id)
    }

    pub fn feed(&mut self, user: &CurrentUser, lead_id: &str) -> Outcome<(Lead, Vec<Activity>)> {
        let stored = self.lead_mut(user, lead_id)?;
        Ok((stored.lead.clone(), stored.activities.clone()))
    }

    pub fn add_comment(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        text: &str,
    ) -> Outcome<String> {
        let text = non_blank(text)?;
        self.log(user, lead_id, ActivityType::Comment, text)
    }

    fn comment_mut<'a>(stored: &'a mut StoredLead, comment_id: &str) -> Outcome<&'a mut Activity> {
        stored
            .activities
            .iter_mut()
            .find(|a| a.id == comment_id)
            .ok_or_else(|| Rejection::not_found("Comment"))
    }

    pub fn edit_comment(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        comment_id: &str,
        content: &str,
        reason: Option<String>,
    ) -> Outcome<()> {
        let content = non_blank(content)?;
        let stored = self.lead_mut(user, lead_id)?;
        let comment = Self::comment_mut(stored, comment_id)?;
        if !permissions::can_edit(user, comment) {
            return Err(Rejection::forbidden("You can only edit your own comments"));
        }
        let previous = comment.comment.replace(content.to_string()).unwrap_or_default();
        comment.is_edited = true;
        stored
            .history
            .entry(comment_id.to_string())
            .or_default()
            .push(EditHistoryEntry {
                content: previous,
                edited_by: UserRef {
                    user_id: user.id.clone(),
                    user_name: user.name.clone(),
                },
                edited_at: Utc::now(),
                edit_reason: reason,
            });
        Ok(())
    }

    /// Delete a comment together with its replies.
    pub fn delete_comment(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        comment_id: &str,
    ) -> Outcome<()> {
        let stored = self.lead_mut(user, lead_id)?;
        let comment = Self::comment_mut(stored, comment_id)?;
        if !comment.is_comment() {
            return Err(Rejection::new(400, "Only comments can be deleted"));
        }
        if !permissions::can_delete(user, comment) {
            return Err(Rejection::forbidden(
                "You do not have permission to delete this comment",
            ));
        }
        stored.activities.retain(|a| {
            a.id != comment_id && a.parent_comment_id.as_deref() != Some(comment_id)
        });
        for activity in &mut stored.activities {
            activity.replies.retain(|r| r.id() != comment_id);
        }
        stored.history.remove(comment_id);
        Ok(())
    }

    pub fn toggle_like(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        comment_id: &str,
    ) -> Outcome<Vec<Like>> {
        let stored = self.lead_mut(user, lead_id)?;
        let comment = Self::comment_mut(stored, comment_id)?;
        if comment.is_liked_by(&user.id) {
            comment.likes.retain(|l| l.user_id != user.id);
        } else {
            comment.likes.push(Like {
                user_id: user.id.clone(),
                user_name: user.name.clone(),
                user_role: Some(user.role.to_string()),
                liked_at: Utc::now(),
            });
        }
        Ok(comment.likes.clone())
    }

    pub fn toggle_pin(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        comment_id: &str,
    ) -> Outcome<String> {
        let stored = self.lead_mut(user, lead_id)?;
        let comment = Self::comment_mut(stored, comment_id)?;
        if !permissions::can_pin(user, comment) {
            return Err(Rejection::forbidden("Only admins can pin comments"));
        }
        comment.is_pinned = !comment.is_pinned;
        Ok(if comment.is_pinned {
            "Comment pinned"
        } else {
            "Comment unpinned"
        }
        .to_string())
    }

    pub fn toggle_important(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        comment_id: &str,
    ) -> Outcome<String> {
        let stored = self.lead_mut(user, lead_id)?;
        let comment = Self::comment_mut(stored, comment_id)?;
        if !permissions::can_mark_important(user, comment) {
            return Err(Rejection::forbidden(
                "Only admins can mark comments as important",
            ));
        }
        comment.is_important = !comment.is_important;
        Ok(if comment.is_important {
            "Comment marked as important"
        } else {
            "Comment unmarked as important"
        }
        .to_string())
    }

    /// Add a reply under the thread root of `target_id`.
    pub fn reply(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        target_id: &str,
        content: &str,
        quoted: Option<QuotedComment>,
    ) -> Outcome<String> {
        let content = non_blank(content)?;
        let mut reply = self.new_activity(user, ActivityType::Comment, content.to_string());
        let reply_id = reply.id.clone();

        let stored = self.lead_mut(user, lead_id)?;
        let root = Self::comment_mut(stored, target_id)?.thread_root_id().to_string();
        reply.parent_comment_id = Some(root.clone());
        reply.quoted_comment = quoted;

        if let Some(parent) = stored.activities.iter_mut().find(|a| a.id == root) {
            parent.replies.push(ReplyRef::Id(reply_id.clone()));
        }
        stored.activities.insert(0, reply);
        Ok(reply_id)
    }

    /// Replies under a top-level comment, oldest first.
    pub fn replies(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        parent_id: &str,
    ) -> Outcome<Vec<Activity>> {
        let stored = self.lead_mut(user, lead_id)?;
        Self::comment_mut(stored, parent_id)?;
        let mut replies: Vec<Activity> = stored
            .activities
            .iter()
            .filter(|a| a.parent_comment_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        replies.reverse();
        Ok(replies)
    }

    pub fn history(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        comment_id: &str,
    ) -> Outcome<Vec<EditHistoryEntry>> {
        let stored = self.lead_mut(user, lead_id)?;
        Self::comment_mut(stored, comment_id)?;
        Ok(stored.history.get(comment_id).cloned().unwrap_or_default())
    }

    /// Case-insensitive substring search over comment text.
    pub fn search(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        query: &str,
    ) -> Outcome<Vec<Activity>> {
        let needle = non_blank(query)?.to_lowercase();
        let stored = self.lead_mut(user, lead_id)?;
        Ok(stored
            .activities
            .iter()
            .filter(|a| a.is_comment() && a.text().to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    /// Apply field updates, logging one activity per changed field.
    pub fn update_lead(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        update: LeadUpdate,
    ) -> Outcome<()> {
        for value in update.values() {
            non_blank(value)?;
        }
        let mut events = Vec::new();
        {
            let stored = self.lead_mut(user, lead_id)?;
            for (field, value) in update {
                let value = value.trim().to_string();
                let old = stored.lead.field(field).to_string();
                if old == value {
                    continue;
                }
                let kind = if field == LeadField::Status {
                    ActivityType::StatusChange
                } else {
                    ActivityType::FieldUpdate
                };
                events.push((kind, format!("{} changed from \"{}\" to \"{}\"", field, old, value)));
                stored.lead.set_field(field, value);
            }
        }
        for (kind, text) in events {
            self.log(user, lead_id, kind, &text)?;
        }
        Ok(())
    }

    /// Reassign a lead, logging the change.
    pub fn assign(
        &mut self,
        user: &CurrentUser,
        lead_id: &str,
        agent: &CurrentUser,
    ) -> Outcome<()> {
        let agent_ref = LeadAgent {
            id: agent.id.clone(),
            name: agent.name.clone(),
        };
        self.lead_mut(user, lead_id)?.lead.agent = Some(agent_ref);
        self.log(
            user,
            lead_id,
            ActivityType::AssignmentChange,
            &format!("Lead assigned to {}", agent.name),
        )?;
        Ok(())
    }
}

fn non_blank(text: &str) -> Outcome<&str> {
    let text = text.trim();
    if text.is_empty() {
        Err(Rejection::new(400, "Content is required"))
    } else {
        Ok(text)
    }
}
