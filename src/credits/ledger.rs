use super::types::{AddCredits, CreditTransaction, CreditTransactionKind};
use crate::error::{Result, SeedanceError};
use crate::pricing::{CreditPackage, PricePlan};
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed-width timestamps so that text comparison matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SeedanceError::Decode(format!("bad timestamp {value}: {e}")))
}

/// Ledger key for a user: surrounding whitespace is not significant.
fn user_key(user_id: &str) -> Result<&str> {
    let key = user_id.trim();
    if key.is_empty() {
        return Err(SeedanceError::InvalidRequest("user id is required".into()));
    }
    Ok(key)
}

/// SQLite-backed credit ledger.
#[derive(Clone, Debug)]
pub struct CreditLedger {
    pool: SqlitePool,
}

impl CreditLedger {
    /// Connects to the database at `database_url` and creates the tables.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// A private in-memory ledger; data lives as long as the value.
    pub async fn in_memory() -> Result<Self> {
        // Each SQLite memory connection is its own database, so pin to one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credit_grants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                remaining INTEGER NOT NULL,
                kind TEXT NOT NULL,
                expires_at TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_credit_grants_user ON credit_grants (user_id, remaining)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credit_transactions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                amount INTEGER NOT NULL,
                description TEXT NOT NULL,
                payment_id TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_credit_transactions_user ON credit_transactions (user_id, seq)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credit_write_lock (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                writes INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO credit_write_lock (id, writes) VALUES (1, 0)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Grants credits to a user.
    pub async fn add_credits(&self, grant: AddCredits) -> Result<()> {
        if grant.amount <= 0 {
            return Err(SeedanceError::InvalidRequest(
                "credit amount must be positive".into(),
            ));
        }
        let user_id = user_key(&grant.user_id)?;

        let now = Utc::now();
        let expires_at = grant
            .expire_days
            .filter(|d| *d > 0)
            .map(|d| timestamp(now + ChronoDuration::days(i64::from(d))));

        let mut tx = self.begin_write().await?;
        sqlx::query(
            r#"
            INSERT INTO credit_grants (user_id, amount, remaining, kind, expires_at, created_at)
            VALUES (?1, ?2, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(user_id)
        .bind(grant.amount)
        .bind(grant.kind.as_str())
        .bind(expires_at.clone())
        .bind(timestamp(now))
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            user_id,
            grant.kind,
            grant.amount,
            &grant.description,
            grant.payment_id.as_deref(),
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            amount = grant.amount,
            kind = %grant.kind,
            expires_at = expires_at.as_deref().unwrap_or("never"),
            "credits added"
        );
        Ok(())
    }

    /// Debits credits, soonest-expiring batches first.
    ///
    /// Fails with [`SeedanceError::InsufficientCredits`] without touching
    /// the ledger when the live balance is too low.
    pub async fn consume_credits(&self, user_id: &str, amount: i64, description: &str) -> Result<()> {
        if amount <= 0 {
            return Err(SeedanceError::InvalidRequest(
                "credit amount must be positive".into(),
            ));
        }
        let user_id = user_key(user_id)?;

        let now = Utc::now();
        let mut tx = self.begin_write().await?;

        let grants: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT id, remaining FROM credit_grants
            WHERE user_id = ?1 AND remaining > 0 AND (expires_at IS NULL OR expires_at > ?2)
            ORDER BY expires_at IS NULL, expires_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(timestamp(now))
        .fetch_all(&mut *tx)
        .await?;

        let available: i64 = grants.iter().map(|(_, remaining)| remaining).sum();
        if available < amount {
            tracing::debug!(user_id = %user_id, required = amount, available, "insufficient credits");
            return Err(SeedanceError::InsufficientCredits {
                required: amount,
                available,
            });
        }

        let mut left = amount;
        for (id, remaining) in grants {
            if left == 0 {
                break;
            }
            let take = remaining.min(left);
            sqlx::query("UPDATE credit_grants SET remaining = remaining - ?1 WHERE id = ?2")
                .bind(take)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            left -= take;
        }

        insert_transaction(
            &mut tx,
            user_id,
            CreditTransactionKind::Usage,
            -amount,
            description,
            None,
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, amount, "credits consumed");
        Ok(())
    }

    /// Returns credits back to the user after a failed generation.
    pub async fn refund(&self, user_id: &str, amount: i64, description: &str) -> Result<()> {
        self.add_credits(AddCredits::new(
            user_id,
            amount,
            CreditTransactionKind::Refund,
            description,
        ))
        .await
    }

    /// Current spendable balance.
    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        let user_id = user_key(user_id)?;
        let balance: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(remaining), 0) FROM credit_grants
            WHERE user_id = ?1 AND remaining > 0 AND (expires_at IS NULL OR expires_at > ?2)
            "#,
        )
        .bind(user_id)
        .bind(timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    /// True when the user can afford `required` credits.
    pub async fn has_enough_credits(&self, user_id: &str, required: i64) -> Result<bool> {
        Ok(self.balance(user_id).await? >= required)
    }

    /// Zeroes every grant that expired at or before `now` and logs the loss.
    ///
    /// Returns the total number of credits removed.
    pub async fn expire_credits(&self, now: DateTime<Utc>) -> Result<i64> {
        let cutoff = timestamp(now);
        let mut tx = self.begin_write().await?;

        let expired: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT user_id, SUM(remaining) FROM credit_grants
            WHERE remaining > 0 AND expires_at IS NOT NULL AND expires_at <= ?1
            GROUP BY user_id
            "#,
        )
        .bind(cutoff.as_str())
        .fetch_all(&mut *tx)
        .await?;

        if expired.is_empty() {
            return Ok(0);
        }

        sqlx::query(
            r#"
            UPDATE credit_grants SET remaining = 0
            WHERE remaining > 0 AND expires_at IS NOT NULL AND expires_at <= ?1
            "#,
        )
        .bind(cutoff.as_str())
        .execute(&mut *tx)
        .await?;

        let mut total = 0;
        for (user_id, amount) in &expired {
            insert_transaction(
                &mut tx,
                user_id,
                CreditTransactionKind::Expire,
                -amount,
                "Expired credits",
                None,
                now,
            )
            .await?;
            total += amount;
        }
        tx.commit().await?;

        tracing::info!(users = expired.len(), total, "expired credits");
        Ok(total)
    }

    /// Most recent transactions for a user, newest first.
    pub async fn transactions(&self, user_id: &str, limit: u32) -> Result<Vec<CreditTransaction>> {
        let user_id = user_key(user_id)?;
        let rows: Vec<(String, String, String, i64, String, Option<String>, String)> =
            sqlx::query_as(
                r#"
                SELECT id, user_id, kind, amount, description, payment_id, created_at
                FROM credit_transactions
                WHERE user_id = ?1
                ORDER BY seq DESC
                LIMIT ?2
                "#,
            )
            .bind(user_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(
                |(id, user_id, kind, amount, description, payment_id, created_at)| {
                    Ok(CreditTransaction {
                        id,
                        user_id,
                        kind: kind.parse()?,
                        amount,
                        description,
                        payment_id,
                        created_at: parse_timestamp(&created_at)?,
                    })
                },
            )
            .collect()
    }

    /// Opens a transaction that holds the write lock from its first
    /// statement.
    ///
    /// A deferred transaction that reads before writing has to upgrade its
    /// lock, and SQLite fails that upgrade with `SQLITE_BUSY` instead of
    /// waiting when another writer is active. Taking the lock up front makes
    /// concurrent writers queue on the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE credit_write_lock SET writes = writes + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Grants a subscription period's allotment.
    pub async fn grant_plan_credits(&self, user_id: &str, plan: &PricePlan) -> Result<i64> {
        let credits = plan.credits.ok_or_else(|| {
            SeedanceError::InvalidRequest(format!("plan {} has no credit allotment", plan.id))
        })?;
        let amount = i64::from(credits.amount);
        self.add_credits(
            AddCredits::new(
                user_id,
                amount,
                CreditTransactionKind::SubscriptionRenewal,
                format!("{} plan credits", plan.id),
            )
            .expiring_in(credits.expire_days),
        )
        .await?;
        Ok(amount)
    }

    /// Grants the credits of a purchased package.
    pub async fn grant_package(
        &self,
        user_id: &str,
        package: &CreditPackage,
        payment_id: &str,
    ) -> Result<i64> {
        let amount = i64::from(package.amount);
        self.add_credits(
            AddCredits::new(
                user_id,
                amount,
                CreditTransactionKind::Purchase,
                format!("{} credit package", package.id),
            )
            .with_payment_id(payment_id),
        )
        .await?;
        Ok(amount)
    }
}

async fn insert_transaction(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    kind: CreditTransactionKind,
    amount: i64,
    description: &str,
    payment_id: Option<&str>,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_transactions (id, user_id, kind, amount, description, payment_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(kind.as_str())
    .bind(amount)
    .bind(description)
    .bind(payment_id)
    .bind(timestamp(at))
    .execute(&mut **tx)
    .await?;
    Ok(())
}
