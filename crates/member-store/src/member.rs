use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::MemberId;

/// A row in the member ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Natural keys for a member to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub email: String,
}

impl NewMember {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Partial update of a member's fields.
///
/// Updating either field does not change ledger membership, so it never
/// touches the counter. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// The unique natural key a duplicate insert collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKey {
    Name,
    Email,
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NaturalKey::Name => write!(f, "name"),
            NaturalKey::Email => write!(f, "email"),
        }
    }
}

/// Snapshot of the materialized counter row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MemberCount {
    pub count: i64,
    pub last_updated: DateTime<Utc>,
}
