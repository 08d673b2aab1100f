//! Per-comment permission rules.
//!
//! Evaluated against the live viewer on every query; nothing is cached on
//! the activity itself.

use crate::activity::Activity;
use crate::user::{CurrentUser, Role};

/// Only the author may edit, and only user comments.
pub fn can_edit(user: &CurrentUser, activity: &Activity) -> bool {
    activity.is_comment() && activity.created_by.user_id == user.id
}

/// Role hierarchy: superadmin deletes anything, admin deletes own or any
/// subadmin-authored comment, subadmin deletes own only. An author whose
/// role is unknown is never treated as a subadmin.
pub fn can_delete(user: &CurrentUser, activity: &Activity) -> bool {
    let own = activity.created_by.user_id == user.id;
    match user.role {
        Role::SuperAdmin => true,
        Role::Admin => own || activity.created_by.user_role == Some(Role::SubAdmin),
        Role::SubAdmin => own,
    }
}

pub fn can_pin(user: &CurrentUser, _activity: &Activity) -> bool {
    user.role.is_moderator()
}

pub fn can_mark_important(user: &CurrentUser, _activity: &Activity) -> bool {
    user.role.is_moderator()
}

/// All permission bits for one activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityPermissions {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_pin: bool,
    pub can_mark_important: bool,
}

impl ActivityPermissions {
    pub fn evaluate(user: &CurrentUser, activity: &Activity) -> Self {
        Self {
            can_edit: can_edit(user, activity),
            can_delete: can_delete(user, activity),
            can_pin: can_pin(user, activity),
            can_mark_important: can_mark_important(user, activity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityType;
    use crate::user::Author;
    use chrono::Utc;

    fn comment_by(user_id: &str, role: Role) -> Activity {
        Activity {
            id: "c1".into(),
            activity_type: ActivityType::Comment,
            created_by: Author {
                user_id: user_id.into(),
                user_name: String::new(),
                user_role: Some(role),
            },
            created_at: Utc::now(),
            comment: Some("note".into()),
            description: None,
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

    #[test]
    fn subadmin_deletes_only_own() {
        let viewer = CurrentUser::new("u1", "Sam", Role::SubAdmin);
        assert!(!can_delete(&viewer, &comment_by("u2", Role::Admin)));
        assert!(can_delete(&viewer, &comment_by("u1", Role::Admin)));
        assert!(!can_delete(&viewer, &comment_by("u3", Role::SubAdmin)));
    }

    #[test]
    fn admin_deletes_own_and_subadmin_comments() {
        let viewer = CurrentUser::new("u1", "Ada", Role::Admin);
        assert!(can_delete(&viewer, &comment_by("u1", Role::Admin)));
        assert!(can_delete(&viewer, &comment_by("u4", Role::SubAdmin)));
        assert!(!can_delete(&viewer, &comment_by("u5", Role::Admin)));
        assert!(!can_delete(&viewer, &comment_by("u6", Role::SuperAdmin)));
    }

    #[test]
    fn admin_cannot_delete_author_of_unknown_role() {
        let viewer = CurrentUser::new("u1", "Ada", Role::Admin);
        let mut comment = comment_by("u7", Role::SubAdmin);
        comment.created_by.user_role = None;
        assert!(!can_delete(&viewer, &comment));

        let root = CurrentUser::new("root", "Root", Role::SuperAdmin);
        assert!(can_delete(&root, &comment));
    }

    #[test]
    fn superadmin_deletes_anything() {
        let viewer = CurrentUser::new("root", "Root", Role::SuperAdmin);
        assert!(can_delete(&viewer, &comment_by("u6", Role::SuperAdmin)));
    }

    #[test]
    fn system_events_are_never_editable() {
        let viewer = CurrentUser::new("u1", "Ada", Role::SuperAdmin);
        let mut event = comment_by("u1", Role::SuperAdmin);
        assert!(can_edit(&viewer, &event));
        event.activity_type = ActivityType::StatusChange;
        assert!(!can_edit(&viewer, &event));
    }

    #[test]
    fn editing_is_author_only() {
        let viewer = CurrentUser::new("root", "Root", Role::SuperAdmin);
        assert!(!can_edit(&viewer, &comment_by("u1", Role::SubAdmin)));
    }

    #[test]
    fn moderation_ignores_authorship() {
        let someone_else = comment_by("u9", Role::SubAdmin);
        let admin = CurrentUser::new("u1", "Ada", Role::Admin);
        let sub = CurrentUser::new("u9", "Sam", Role::SubAdmin);

        let perms = ActivityPermissions::evaluate(&admin, &someone_else);
        assert!(perms.can_pin && perms.can_mark_important);

        let own = ActivityPermissions::evaluate(&sub, &someone_else);
        assert!(!own.can_pin && !own.can_mark_important);
        assert!(own.can_edit && own.can_delete);
    }
}
