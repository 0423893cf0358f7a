use chrono::{DateTime, Utc};
use ndsom_core::calendar::MarketCalendar;
use ndsom_core::error::AppError;
use ndsom_core::models::{MarketRecord, MarketRow, NewMarketRow, UpsertSummary};
use ndsom_core::reconcile::plan_reconciliation;
use sqlx::{PgPool, Pool, Postgres, QueryBuilder, Transaction};

/// Rows per multi-value INSERT; nine binds each stays well under the
/// Postgres limit of 65535 parameters.
const INSERT_CHUNK: usize = 1000;

/// Repository for `regular_market` rows in PostgreSQL.
#[derive(Clone)]
pub struct MarketRepository {
    pool: Pool<Postgres>,
}

impl MarketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reconcile `records` against the latest stored row of each security
    /// inside one transaction.
    ///
    /// Any failure drops the transaction, which rolls back every insert and
    /// update of the batch.
    pub async fn reconcile(
        &self,
        records: &[MarketRecord],
        now: DateTime<Utc>,
        calendar: &MarketCalendar,
    ) -> Result<UpsertSummary, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Failed to begin: {e}")))?;

        let mut securities: Vec<String> =
            records.iter().map(|r| r.security_desc.clone()).collect();
        securities.sort();
        securities.dedup();

        let latest = sqlx::query_as::<_, MarketRowRecord>(
            r#"
            SELECT DISTINCT ON (security_desc)
                id, security_desc, trades, tta, open, high, low, ltp, lty, timestamp
            FROM regular_market
            WHERE security_desc = ANY($1)
            ORDER BY security_desc, timestamp DESC, id DESC
            "#,
        )
        .bind(&securities)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::PersistenceError(e.to_string()))?;

        let plan = plan_reconciliation(
            records,
            latest.into_iter().map(Into::into).collect(),
            now,
            calendar,
        );
        if plan.is_empty() {
            return Ok(plan.summary());
        }

        for row in &plan.updates {
            update_row(&mut tx, row).await?;
        }
        for chunk in plan.inserts.chunks(INSERT_CHUNK) {
            insert_rows(&mut tx, chunk).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::PersistenceError(format!("Commit failed: {e}")))?;

        tracing::debug!(
            inserted = plan.inserts.len(),
            updated = plan.updates.len(),
            "Transaction committed"
        );
        Ok(plan.summary())
    }

    /// Distinct securities ever stored, sorted.
    pub async fn security_descriptions(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT security_desc FROM regular_market ORDER BY security_desc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    /// Every stored row of `security`, oldest first.
    pub async fn history(&self, security: &str) -> Result<Vec<MarketRow>, AppError> {
        let rows = sqlx::query_as::<_, MarketRowRecord>(
            r#"
            SELECT id, security_desc, trades, tta, open, high, low, ltp, lty, timestamp
            FROM regular_market
            WHERE security_desc = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(security)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::PersistenceError(e.to_string()))?;
        Ok(())
    }
}

async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewMarketRow],
) -> Result<(), AppError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO regular_market (security_desc, trades, tta, open, high, low, ltp, lty, timestamp) ",
    );
    builder.push_values(rows, |mut b, row| {
        b.push_bind(&row.security_desc)
            .push_bind(row.trades)
            .push_bind(row.tta)
            .push_bind(row.open)
            .push_bind(row.high)
            .push_bind(row.low)
            .push_bind(row.ltp)
            .push_bind(row.lty)
            .push_bind(row.timestamp);
    });

    builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::PersistenceError(format!("Batch insert failed: {e}")))?;
    Ok(())
}

async fn update_row(tx: &mut Transaction<'_, Postgres>, row: &MarketRow) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE regular_market
        SET trades = $2, tta = $3, open = $4, high = $5, low = $6, ltp = $7, lty = $8,
            timestamp = $9
        WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(row.trades)
    .bind(row.tta)
    .bind(row.open)
    .bind(row.high)
    .bind(row.low)
    .bind(row.ltp)
    .bind(row.lty)
    .bind(row.timestamp)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::PersistenceError(format!("Update of row {} failed: {e}", row.id)))?;
    Ok(())
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct MarketRowRecord {
    id: i64,
    security_desc: String,
    trades: i64,
    tta: f64,
    open: f64,
    high: f64,
    low: f64,
    ltp: f64,
    lty: f64,
    timestamp: DateTime<Utc>,
}

impl From<MarketRowRecord> for MarketRow {
    fn from(row: MarketRowRecord) -> Self {
        MarketRow {
            id: row.id,
            security_desc: row.security_desc,
            trades: row.trades,
            tta: row.tta,
            open: row.open,
            high: row.high,
            low: row.low,
            ltp: row.ltp,
            lty: row.lty,
            timestamp: row.timestamp,
        }
    }
}

// -- Trait implementation --

impl ndsom_core::traits::MarketStore for MarketRepository {
    async fn reconcile(
        &self,
        records: &[MarketRecord],
        now: DateTime<Utc>,
        calendar: &MarketCalendar,
    ) -> Result<UpsertSummary, AppError> {
        MarketRepository::reconcile(self, records, now, calendar).await
    }
}
