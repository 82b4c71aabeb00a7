use async_trait::async_trait;

use common::MemberId;

use crate::{
    Result, StoreError,
    member::{Member, MemberCount, MemberUpdate, NewMember},
};

/// Core trait for member store implementations.
///
/// Implementations own both the ledger and the counter and guarantee that
/// every committed insert or delete carries its counter adjustment in the
/// same atomic unit of work. There is no bypass path: callers can only
/// mutate the ledger through this trait. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Inserts a member and increments the counter atomically.
    ///
    /// Fails with [`StoreError::DuplicateMember`] if either natural key is
    /// taken, and with [`StoreError::MissingCounterRow`] if the counter row
    /// is gone; in both cases nothing is committed.
    async fn add_member(&self, new_member: NewMember) -> Result<Member>;

    /// Deletes a member and decrements the counter atomically.
    ///
    /// Fails with [`StoreError::MemberNotFound`] if the member does not
    /// exist; the counter is only adjusted when a row was actually removed.
    async fn remove_member(&self, id: MemberId) -> Result<()>;

    /// Updates a member's name and/or email.
    ///
    /// Membership does not change, so the counter is not touched.
    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<Member>;

    /// Fetches a single ledger row.
    ///
    /// Returns None if the member doesn't exist.
    async fn get_member(&self, id: MemberId) -> Result<Option<Member>>;

    /// Reads the raw counter row without touching the ledger.
    ///
    /// Returns None if the row is absent. Most callers want
    /// [`MemberStoreExt::current_count`], which self-heals that case.
    async fn counter(&self) -> Result<Option<MemberCount>>;

    /// Rebuilds the counter from a full ledger scan.
    ///
    /// O(n) in ledger size; the repair path, never the read path. Safe to
    /// run concurrently with mutations. Returns the recomputed count.
    async fn recalculate(&self) -> Result<i64>;
}

/// Extension trait providing convenience methods for member stores.
#[async_trait]
pub trait MemberStoreExt: MemberStore {
    /// Returns the current count, O(1) in ledger size.
    ///
    /// If the counter row is absent it is rebuilt from the ledger before
    /// returning, so a deleted or never-provisioned row heals itself on
    /// the next read. Storage errors propagate unchanged.
    async fn current_count(&self) -> Result<MemberCount> {
        if let Some(counter) = self.counter().await? {
            return Ok(counter);
        }

        tracing::warn!("member count row missing, rebuilding from ledger");
        self.recalculate().await?;
        self.counter().await?.ok_or(StoreError::MissingCounterRow)
    }
}

// Blanket implementation for all MemberStore implementations
impl<T: MemberStore + ?Sized> MemberStoreExt for T {}
