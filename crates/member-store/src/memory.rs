use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::MemberId;

use crate::{
    Result, StoreError,
    member::{Member, MemberCount, MemberUpdate, NaturalKey, NewMember},
    store::MemberStore,
};

/// In-memory member store implementation for testing.
///
/// This implementation keeps the ledger and counter in memory and provides
/// the same interface and failure modes as the PostgreSQL implementation.
/// Every operation validates under a single write lock before mutating, so
/// a failed mutation leaves both the ledger and the counter untouched,
/// matching the transactional rollback of the real store.
#[derive(Clone)]
pub struct InMemoryMemberStore {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    members: HashMap<MemberId, Member>,
    counter: Option<MemberCount>,
}

impl InMemoryMemberStore {
    /// Creates a new store provisioned with a zeroed counter row.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                members: HashMap::new(),
                counter: Some(MemberCount {
                    count: 0,
                    last_updated: Utc::now(),
                }),
            })),
        }
    }

    /// Removes the counter row, simulating corruption or a failed
    /// provisioning.
    pub async fn drop_counter(&self) {
        self.inner.write().await.counter = None;
    }

    /// Overwrites the stored count without touching the ledger,
    /// simulating drift from a bypassed write path.
    pub async fn set_counter(&self, count: i64) {
        self.inner.write().await.counter = Some(MemberCount {
            count,
            last_updated: Utc::now(),
        });
    }

    /// Returns the true ledger cardinality.
    pub async fn member_total(&self) -> usize {
        self.inner.read().await.members.len()
    }
}

impl Default for InMemoryMemberStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_natural_keys(
    members: &HashMap<MemberId, Member>,
    name: &str,
    email: &str,
    exclude: Option<MemberId>,
) -> Result<()> {
    for member in members.values() {
        if Some(member.id) == exclude {
            continue;
        }
        if member.name == name {
            return Err(StoreError::DuplicateMember(NaturalKey::Name));
        }
        if member.email == email {
            return Err(StoreError::DuplicateMember(NaturalKey::Email));
        }
    }
    Ok(())
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    async fn add_member(&self, new_member: NewMember) -> Result<Member> {
        let mut inner = self.inner.write().await;

        // Validate everything before mutating anything.
        check_natural_keys(&inner.members, &new_member.name, &new_member.email, None)?;
        let counter = inner.counter.ok_or(StoreError::MissingCounterRow)?;

        let now = Utc::now();
        let member = Member {
            id: MemberId::new(),
            name: new_member.name,
            email: new_member.email,
            created_at: now,
            updated_at: now,
        };
        inner.members.insert(member.id, member.clone());
        inner.counter = Some(MemberCount {
            count: counter.count + 1,
            last_updated: now,
        });

        Ok(member)
    }

    async fn remove_member(&self, id: MemberId) -> Result<()> {
        let mut inner = self.inner.write().await;

        if !inner.members.contains_key(&id) {
            return Err(StoreError::MemberNotFound(id));
        }
        let counter = inner.counter.ok_or(StoreError::MissingCounterRow)?;

        inner.members.remove(&id);
        inner.counter = Some(MemberCount {
            count: counter.count - 1,
            last_updated: Utc::now(),
        });

        Ok(())
    }

    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<Member> {
        let mut inner = self.inner.write().await;

        let current = inner
            .members
            .get(&id)
            .cloned()
            .ok_or(StoreError::MemberNotFound(id))?;

        let name = update.name.unwrap_or_else(|| current.name.clone());
        let email = update.email.unwrap_or_else(|| current.email.clone());
        check_natural_keys(&inner.members, &name, &email, Some(id))?;

        let member = Member {
            id,
            name,
            email,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        inner.members.insert(id, member.clone());

        Ok(member)
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>> {
        Ok(self.inner.read().await.members.get(&id).cloned())
    }

    async fn counter(&self) -> Result<Option<MemberCount>> {
        Ok(self.inner.read().await.counter)
    }

    async fn recalculate(&self) -> Result<i64> {
        let mut inner = self.inner.write().await;

        let true_count = inner.members.len() as i64;
        match inner.counter {
            None => {
                tracing::warn!(count = true_count, "member count row was missing, recreated");
            }
            Some(counter) if counter.count != true_count => {
                tracing::warn!(
                    stored = counter.count,
                    actual = true_count,
                    "member count drift repaired"
                );
            }
            Some(_) => {}
        }
        inner.counter = Some(MemberCount {
            count: true_count,
            last_updated: Utc::now(),
        });

        Ok(true_count)
    }
}
