use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use ndsom_core::models::{DailyTotal, MarketRow};

// ---------------------------------------------------------------------------
// Securities
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SecurityListResponse {
    pub securities: Vec<String>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Market rows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MarketRowResponse {
    pub id: i64,
    pub security_desc: String,
    pub trades: i64,
    /// Total traded amount
    pub tta: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Last traded price
    pub ltp: f64,
    /// Last traded yield
    pub lty: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<MarketRow> for MarketRowResponse {
    fn from(row: MarketRow) -> Self {
        Self {
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

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MarketHistoryResponse {
    pub security: String,
    pub rows: Vec<MarketRowResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Daily totals
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DailyTotalResponse {
    pub date: NaiveDate,
    pub trades: i64,
    pub tta: f64,
}

impl From<DailyTotal> for DailyTotalResponse {
    fn from(total: DailyTotal) -> Self {
        Self {
            date: total.date,
            trades: total.trades,
            tta: total.tta,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
