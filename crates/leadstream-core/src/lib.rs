//! Core types for the lead activity stream.
//!
//! This crate holds the data model shared by the client store, the CLI and
//! the mock server: activities, leads, roles, permission rules and the wire
//! envelopes. It performs no I/O.

mod activity;
mod lead;
pub mod permissions;
mod queue;
mod user;
pub mod wire;

pub use activity::{
    Activity, ActivityFilter, ActivityType, Attachment, EditHistoryEntry, Like, QuotedComment,
    ReplyRef, UnknownFilter,
};
pub use lead::{FieldState, Lead, LeadAgent, LeadField, LeadFieldEditor, UnknownField};
pub use permissions::ActivityPermissions;
pub use queue::{PushEvent, QUEUE_UPDATE_EVENT, QueueStats};
pub use user::{Author, CurrentUser, Role, RoleParseError, UserRef};
