//! Guest records, write payloads, and change-log entries.
//!
//! # Purpose
//! Defines the single entity the directory owns plus the shapes used to create
//! and patch it. Store backends decode into these types at their boundary so
//! nothing loosely typed travels further in.
use super::slug::Slug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Store-generated guest identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct GuestId(Uuid);

impl GuestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GuestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GuestId {
    type Err = uuid::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(input).map(Self)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Guest {
    pub id: GuestId,
    pub slug: Slug,
    pub name: String,
    pub email: Option<String>,
    pub plus_one: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    /// Number of seats this invitation accounts for.
    pub fn expected_party_size(&self) -> u32 {
        if self.plus_one { 2 } else { 1 }
    }
}

/// Validated insert payload handed to a store. The store assigns the id and
/// both timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestDraft {
    pub slug: Slug,
    pub name: String,
    pub email: Option<String>,
    pub plus_one: bool,
}

/// Partial update. `None` leaves a field untouched; for `email`,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub plus_one: Option<bool>,
}

impl GuestPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.plus_one.is_none()
    }

    pub(crate) fn apply(&self, guest: &mut Guest) {
        if let Some(name) = &self.name {
            guest.name = name.clone();
        }
        if let Some(email) = &self.email {
            guest.email = email.clone();
        }
        if let Some(plus_one) = self.plus_one {
            guest.plus_one = plus_one;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuestChange {
    pub seq: u64,
    pub op: GuestChangeOp,
    pub guest_id: GuestId,
    pub guest: Option<Guest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GuestChangeOp {
    Created,
    Updated,
    Deleted,
}

impl GuestChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestChangeOp::Created => "Created",
            GuestChangeOp::Updated => "Updated",
            GuestChangeOp::Deleted => "Deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Created" => Some(GuestChangeOp::Created),
            "Updated" => Some(GuestChangeOp::Updated),
            "Deleted" => Some(GuestChangeOp::Deleted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(plus_one: bool) -> Guest {
        let now = Utc::now();
        Guest {
            id: GuestId::new(),
            slug: Slug::parse("jane-doe").expect("slug"),
            name: "Jane Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            plus_one,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn party_size_follows_plus_one() {
        assert_eq!(guest(false).expected_party_size(), 1);
        assert_eq!(guest(true).expected_party_size(), 2);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut target = guest(false);
        GuestPatch {
            name: None,
            email: Some(None),
            plus_one: Some(true),
        }
        .apply(&mut target);
        assert_eq!(target.name, "Jane Doe");
        assert_eq!(target.email, None);
        assert!(target.plus_one);
        assert_eq!(target.slug.as_str(), "jane-doe");
    }

    #[test]
    fn guest_id_parses_from_display() {
        let id = GuestId::new();
        let parsed: GuestId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<GuestId>().is_err());
    }

    #[test]
    fn change_op_string_mapping_is_symmetric() {
        for op in [
            GuestChangeOp::Created,
            GuestChangeOp::Updated,
            GuestChangeOp::Deleted,
        ] {
            assert_eq!(GuestChangeOp::parse(op.as_str()), Some(op));
        }
        assert_eq!(GuestChangeOp::parse("Renamed"), None);
    }
}
