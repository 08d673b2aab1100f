//! Plain-text rendering of feed entries.

use leadstream_core::{
    Activity, ActivityPermissions, EditHistoryEntry, Lead, LeadField, QueueStats,
};
use std::fmt::Write;

pub fn activity_line(activity: &Activity, permissions: Option<ActivityPermissions>) -> String {
    let mut line = format!(
        "{}  {}  {} ({})  [{}]",
        activity.id,
        activity.created_at.format("%Y-%m-%d %H:%M"),
        activity.created_by.user_name,
        activity.created_by.user_role.map_or("unknown", |r| r.as_str()),
        activity.activity_type.as_str(),
    );
    if activity.is_pinned {
        line.push_str(" pinned");
    }
    if activity.is_important {
        line.push_str(" important");
    }
    if activity.is_edited {
        line.push_str(" edited");
    }
    let _ = write!(line, "\n    {}", activity.text());
    if let Some(quote) = &activity.quoted_comment {
        let _ = write!(line, "\n    > {}: {}", quote.author, quote.content);
    }

    let mut meta = Vec::new();
    if !activity.likes.is_empty() {
        meta.push(format!("{} likes", activity.likes.len()));
    }
    if !activity.replies.is_empty() {
        meta.push(format!("{} replies", activity.replies.len()));
    }
    if let Some(p) = permissions {
        let actions: Vec<&str> = [
            (p.can_edit, "edit"),
            (p.can_delete, "delete"),
            (p.can_pin, "pin"),
            (p.can_mark_important, "important"),
        ]
        .into_iter()
        .filter_map(|(allowed, name)| allowed.then_some(name))
        .collect();
        if !actions.is_empty() {
            meta.push(format!("can {}", actions.join("/")));
        }
    }
    if !meta.is_empty() {
        let _ = write!(line, "\n    ({})", meta.join(", "));
    }
    line
}

pub fn history_line(entry: &EditHistoryEntry) -> String {
    let mut line = format!(
        "{}  {}: {}",
        entry.edited_at.format("%Y-%m-%d %H:%M"),
        entry.edited_by.user_name,
        entry.content
    );
    if let Some(reason) = &entry.edit_reason {
        let _ = write!(line, " (reason: {})", reason);
    }
    line
}

pub fn lead_summary(lead: &Lead) -> String {
    let mut out = format!("{} [{}]", lead.name, lead.id);
    for field in LeadField::ALL {
        let value = lead.field(field);
        if !value.is_empty() {
            let _ = write!(out, "\n  {:<8} {}", field.as_str(), value);
        }
    }
    if let Some(agent) = &lead.agent {
        let _ = write!(out, "\n  agent    {}", agent.name);
    }
    out
}

pub fn queue_line(stats: &QueueStats) -> String {
    format!(
        "email queue: {} pending, {} processing, {} failed ({} total)",
        stats.pending, stats.processing, stats.failed, stats.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadstream_core::{ActivityType, Author, QuotedComment, Role};

    fn comment(text: &str) -> Activity {
        Activity {
            id: "a1".into(),
            activity_type: ActivityType::Comment,
            created_by: Author {
                user_id: "u2".into(),
                user_name: "Dana".into(),
                user_role: Some(Role::Admin),
            },
            created_at: Utc::now(),
            comment: Some(text.into()),
            description: None,
            parent_comment_id: None,
            quoted_comment: None,
            is_edited: false,
            is_pinned: false,
            is_important: false,
            likes: vec![],
            replies: vec![],
            mentions: vec![],
            attachments: vec![],
        }
    }

    #[test]
    fn shows_author_flags_and_quote() {
        let mut activity = comment("Moved to Tuesday");
        activity.is_pinned = true;
        activity.quoted_comment = Some(QuotedComment {
            author: "Sam".into(),
            content: "Booked for Monday".into(),
        });

        let line = activity_line(&activity, None);
        assert!(line.starts_with("a1  "));
        assert!(line.contains("Dana (admin)  [comment] pinned"));
        assert!(line.contains("\n    Moved to Tuesday"));
        assert!(line.contains("> Sam: Booked for Monday"));
        assert!(!line.contains("can "));
    }

    #[test]
    fn lists_allowed_actions() {
        let activity = comment("hi");
        let permissions = ActivityPermissions {
            can_edit: true,
            can_delete: true,
            can_pin: false,
            can_mark_important: false,
        };
        assert!(activity_line(&activity, Some(permissions)).ends_with("(can edit/delete)"));
    }

    #[test]
    fn lead_summary_skips_blank_fields() {
        let lead = Lead {
            id: "lead-1".into(),
            name: "Acme".into(),
            status: "New".into(),
            ..Lead::default()
        };
        let summary = lead_summary(&lead);
        assert!(summary.contains("status   New"));
        assert!(!summary.contains("email"));
    }
}
