//! Lead records and the inline field editor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The user a lead is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadAgent {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A lead as returned with its activity feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<LeadAgent>,
}

impl Lead {
    pub fn field(&self, field: LeadField) -> &str {
        match field {
            LeadField::Name => &self.name,
            LeadField::Email => &self.email,
            LeadField::Phone => &self.phone,
            LeadField::Country => &self.country,
            LeadField::Brand => &self.brand,
            LeadField::Address => &self.address,
            LeadField::Status => &self.status,
        }
    }

    pub fn set_field(&mut self, field: LeadField, value: String) {
        let slot = match field {
            LeadField::Name => &mut self.name,
            LeadField::Email => &mut self.email,
            LeadField::Phone => &mut self.phone,
            LeadField::Country => &mut self.country,
            LeadField::Brand => &mut self.brand,
            LeadField::Address => &mut self.address,
            LeadField::Status => &mut self.status,
        };
        *slot = value;
    }
}

/// Editable scalar fields of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Name,
    Email,
    Phone,
    Country,
    Brand,
    Address,
    Status,
}

impl LeadField {
    pub const ALL: [LeadField; 7] = [
        LeadField::Name,
        LeadField::Email,
        LeadField::Phone,
        LeadField::Country,
        LeadField::Brand,
        LeadField::Address,
        LeadField::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadField::Name => "name",
            LeadField::Email => "email",
            LeadField::Phone => "phone",
            LeadField::Country => "country",
            LeadField::Brand => "brand",
            LeadField::Address => "address",
            LeadField::Status => "status",
        }
    }
}

impl fmt::Display for LeadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lead field: {0}")]
pub struct UnknownField(pub String);

/// Edit state of one lead field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    pub editing: bool,
    pub saving: bool,
    /// Scratch value shown in the input.
    pub value: String,
    /// Last value known to be stored server-side.
    saved: String,
}

impl FieldState {
    pub fn is_dirty(&self) -> bool {
        self.value != self.saved
    }
}

/// Scratch buffer for inline lead edits, one entry per field.
///
/// Seeded once from the first loaded lead; later refreshes never overwrite
/// values the user may be typing.
#[derive(Debug, Clone, Default)]
pub struct LeadFieldEditor {
    fields: BTreeMap<LeadField, FieldState>,
    seeded: bool,
}

impl LeadFieldEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Populate from a lead. Returns false if already seeded.
    pub fn seed(&mut self, lead: &Lead) -> bool {
        if self.seeded {
            return false;
        }
        for field in LeadField::ALL {
            let value = lead.field(field).to_string();
            self.fields.insert(
                field,
                FieldState {
                    value: value.clone(),
                    saved: value,
                    ..FieldState::default()
                },
            );
        }
        self.seeded = true;
        true
    }

    pub fn get(&self, field: LeadField) -> Option<&FieldState> {
        self.fields.get(&field)
    }

    pub fn value(&self, field: LeadField) -> Option<&str> {
        self.fields.get(&field).map(|s| s.value.as_str())
    }

    pub fn begin_edit(&mut self, field: LeadField) {
        self.fields.entry(field).or_default().editing = true;
    }

    /// Update the scratch value. Ignored unless the field is being edited.
    pub fn set_value(&mut self, field: LeadField, value: impl Into<String>) -> bool {
        match self.fields.get_mut(&field) {
            Some(state) if state.editing && !state.saving => {
                state.value = value.into();
                true
            }
            _ => false,
        }
    }

    /// Abandon an edit, restoring the last saved value.
    pub fn cancel(&mut self, field: LeadField) {
        if let Some(state) = self.fields.get_mut(&field) {
            state.value = state.saved.clone();
            state.editing = false;
        }
    }

    /// Flag the field as saving and return the value to send.
    ///
    /// Returns `None` if the field is not being edited or a save is already
    /// in flight.
    pub fn mark_saving(&mut self, field: LeadField) -> Option<String> {
        let state = self.fields.get_mut(&field)?;
        if !state.editing || state.saving {
            return None;
        }
        state.saving = true;
        Some(state.value.clone())
    }

    /// Settle a save. On success the scratch value becomes the saved value
    /// and editing ends; on failure the field stays in edit mode.
    pub fn finish_save(&mut self, field: LeadField, ok: bool) {
        if let Some(state) = self.fields.get_mut(&field) {
            state.saving = false;
            if ok {
                state.saved = state.value.clone();
                state.editing = false;
            }
        }
    }
}
