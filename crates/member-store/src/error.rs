use thiserror::Error;

use common::MemberId;

use crate::member::NaturalKey;

/// Errors that can occur when interacting with the member store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A natural key collided with an existing live member.
    /// The insert did not commit; the counter is unchanged.
    #[error("Duplicate member: {0} is already taken")]
    DuplicateMember(NaturalKey),

    /// The member does not exist in the ledger.
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// The single counter row is gone. Any mutation that hits this rolls
    /// back in full, so the ledger and the counter never diverge silently.
    /// A recalculation recreates the row.
    #[error("Member count row is missing")]
    MissingCounterRow,

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for member store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
