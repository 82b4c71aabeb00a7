//! Member ledger and incrementally maintained count store.
//!
//! The ledger (`members`) is the source of truth; the single-row counter
//! (`member_count`) is kept in lockstep with it by applying a +1/-1
//! adjustment inside the same transaction as every insert or delete.
//! Readers consult only the counter, so reads are O(1) in ledger size.
//! [`MemberStore::recalculate`] rebuilds the counter from a full ledger
//! scan when the two have drifted apart.

pub mod error;
pub mod member;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::MemberId;
pub use error::{Result, StoreError};
pub use member::{Member, MemberCount, MemberUpdate, NaturalKey, NewMember};
pub use memory::InMemoryMemberStore;
pub use postgres::PostgresMemberStore;
pub use store::{MemberStore, MemberStoreExt};
