//! Snapshot persistence for aggregated quotes.
//!
//! One snapshot per currency: a save replaces the previous rows for that
//! currency inside a single transaction, so readers going through the cache
//! never observe a half-replaced set. Saving an empty set is a no-op that
//! leaves the prior snapshot intact.

use async_trait::async_trait;
use cambio_common::{time, Currency, Quote, QuoteSet, Timestamp};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Read/write contract the cache needs from persistent storage.
///
/// Operations are scoped per currency; different currencies never interfere.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Replace the persisted snapshot for `currency` with `quotes`.
    async fn save(&self, currency: Currency, quotes: &[Quote]) -> StoreResult<()>;

    /// The most recently saved snapshot, empty if none exists.
    async fn load(&self, currency: Currency) -> StoreResult<QuoteSet>;

    /// When the current snapshot was captured, if one exists.
    async fn last_fetched_at(&self, currency: Currency) -> StoreResult<Option<Timestamp>>;
}

/// Postgres-backed quote store.
pub struct PgQuoteStore {
    pool: PgPool,
}

impl PgQuoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the quotes table and its lookup index if absent.
    pub async fn init_schema(pool: &PgPool) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id BIGSERIAL PRIMARY KEY,
                currency VARCHAR(3) NOT NULL,
                buy_price NUMERIC(10, 4) NOT NULL,
                sell_price NUMERIC(10, 4) NOT NULL,
                source VARCHAR(255) NOT NULL,
                fetched_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_quotes_currency_fetched \
             ON quotes (currency, fetched_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    async fn save(&self, currency: Currency, quotes: &[Quote]) -> StoreResult<()> {
        if quotes.is_empty() {
            debug!(currency = %currency, "empty quote set, keeping prior snapshot");
            return Ok(());
        }

        // One timestamp for the whole snapshot.
        let fetched_at = time::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM quotes WHERE currency = $1")
            .bind(currency.code())
            .execute(&mut *tx)
            .await?;

        for quote in quotes {
            sqlx::query(
                "INSERT INTO quotes (currency, buy_price, sell_price, source, fetched_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(currency.code())
            .bind(quote.buy_price)
            .bind(quote.sell_price)
            .bind(&quote.source)
            .bind(fetched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load(&self, currency: Currency) -> StoreResult<QuoteSet> {
        let rows = sqlx::query(
            "SELECT buy_price, sell_price, source FROM quotes \
             WHERE currency = $1 ORDER BY fetched_at DESC, source ASC",
        )
        .bind(currency.code())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Quote {
                    buy_price: row.try_get("buy_price")?,
                    sell_price: row.try_get("sell_price")?,
                    source: row.try_get("source")?,
                })
            })
            .collect::<Result<QuoteSet, sqlx::Error>>()
            .map_err(StoreError::from)
    }

    async fn last_fetched_at(&self, currency: Currency) -> StoreResult<Option<Timestamp>> {
        let row = sqlx::query("SELECT MAX(fetched_at) AS last_fetch FROM quotes WHERE currency = $1")
            .bind(currency.code())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("last_fetch")?)
    }
}

/// In-memory quote store for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MemoryQuoteStore {
    snapshots: dashmap::DashMap<Currency, (QuoteSet, Timestamp)>,
    fail_reads: std::sync::atomic::AtomicBool,
    fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self {
            snapshots: dashmap::DashMap::new(),
            fail_reads: std::sync::atomic::AtomicBool::new(false),
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Seed a snapshot with an explicit capture time.
    pub fn set_snapshot(&self, currency: Currency, quotes: QuoteSet, fetched_at: Timestamp) {
        self.snapshots.insert(currency, (quotes, fetched_at));
    }

    /// Make subsequent reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MemoryQuoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn save(&self, currency: Currency, quotes: &[Quote]) -> StoreResult<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted write failure".into()));
        }
        if quotes.is_empty() {
            return Ok(());
        }
        self.snapshots
            .insert(currency, (quotes.to_vec(), time::now()));
        Ok(())
    }

    async fn load(&self, currency: Currency) -> StoreResult<QuoteSet> {
        if self.fail_reads.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted read failure".into()));
        }
        Ok(self
            .snapshots
            .get(&currency)
            .map(|entry| entry.0.clone())
            .unwrap_or_default())
    }

    async fn last_fetched_at(&self, currency: Currency) -> StoreResult<Option<Timestamp>> {
        if self.fail_reads.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted read failure".into()));
        }
        Ok(self.snapshots.get(&currency).map(|entry| entry.1))
    }
}
