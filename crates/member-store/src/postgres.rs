use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use common::MemberId;

use crate::{
    Result, StoreError,
    member::{Member, MemberCount, MemberUpdate, NaturalKey, NewMember},
    store::MemberStore,
};

/// PostgreSQL-backed member store implementation.
#[derive(Clone)]
pub struct PostgresMemberStore {
    pool: PgPool,
}

impl PostgresMemberStore {
    /// Creates a new PostgreSQL member store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    ///
    /// Besides creating the tables, this provisions the counter row at zero.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_member(row: PgRow) -> Result<Member> {
        Ok(Member {
            id: MemberId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn map_unique_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.constraint() {
            Some("members_name_key") => return StoreError::DuplicateMember(NaturalKey::Name),
            Some("members_email_key") => return StoreError::DuplicateMember(NaturalKey::Email),
            _ => {}
        }
    }
    StoreError::Database(e)
}

/// Applies a +1/-1 delta to the counter row inside the caller's transaction.
///
/// The UPDATE takes a row-level lock on the single counter row, so
/// adjustments from concurrent transactions serialize in commit order and
/// no delta is lost. Zero rows affected means the counter row is gone,
/// which fails the enclosing mutation and rolls it back whole.
async fn apply_adjustment(tx: &mut Transaction<'_, Postgres>, delta: i64) -> Result<()> {
    let updated =
        sqlx::query("UPDATE member_count SET count = count + $1, updated_at = now() WHERE id")
            .bind(delta)
            .execute(&mut **tx)
            .await?
            .rows_affected();

    if updated == 0 {
        return Err(StoreError::MissingCounterRow);
    }
    Ok(())
}

#[async_trait]
impl MemberStore for PostgresMemberStore {
    async fn add_member(&self, new_member: NewMember) -> Result<Member> {
        let mut tx = self.pool.begin().await?;

        let id = MemberId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO members (id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new_member.name)
        .bind(&new_member.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        apply_adjustment(&mut tx, 1).await?;
        tx.commit().await?;

        metrics::counter!("members_added_total").increment(1);
        Self::row_to_member(row)
    }

    async fn remove_member(&self, id: MemberId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::MemberNotFound(id));
        }

        apply_adjustment(&mut tx, -1).await?;
        tx.commit().await?;

        metrics::counter!("members_removed_total").increment(1);
        Ok(())
    }

    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<Member> {
        // No membership change, so no transaction with the counter is needed.
        let row = sqlx::query(
            r#"
            UPDATE members
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(update.name)
        .bind(update.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        match row {
            Some(row) => Self::row_to_member(row),
            None => Err(StoreError::MemberNotFound(id)),
        }
    }

    async fn get_member(&self, id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_member).transpose()
    }

    async fn counter(&self) -> Result<Option<MemberCount>> {
        let row = sqlx::query("SELECT count, updated_at FROM member_count WHERE id")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(MemberCount {
                count: row.try_get("count")?,
                last_updated: row.try_get("updated_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn recalculate(&self) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        // REPEATABLE READ gives the ledger scan and the counter overwrite a
        // single consistent snapshot. If an adjustment commits in between,
        // the upsert fails with a serialization error and the caller can
        // retry; on success the snapshot value wins (last-writer-wins).
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let true_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&mut *tx)
            .await?;

        let stored: Option<i64> = sqlx::query_scalar("SELECT count FROM member_count WHERE id")
            .fetch_optional(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO member_count (id, count, updated_at)
            VALUES (TRUE, $1, now())
            ON CONFLICT (id) DO UPDATE SET
                count = EXCLUDED.count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(true_count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::counter!("count_recalculations_total").increment(1);
        match stored {
            None => {
                tracing::warn!(count = true_count, "member count row was missing, recreated");
            }
            Some(stored) if stored != true_count => {
                // Persistent drift means a write path is bypassing the store.
                metrics::counter!("count_drift_repairs_total").increment(1);
                tracing::warn!(stored, actual = true_count, "member count drift repaired");
            }
            Some(_) => {}
        }

        Ok(true_count)
    }
}
