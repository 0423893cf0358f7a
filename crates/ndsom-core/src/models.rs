use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Display headers of the columns the reconciler reads.
pub const SECURITY_DESCRIPTION: &str = "Security Description";
pub const TRADES: &str = "Trades";
pub const TTA: &str = "TTA";
pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const LTP: &str = "LTP";
pub const LTY: &str = "LTY";

/// Width of the `security_desc` column.
pub const MAX_SECURITY_DESC_LEN: usize = 255;

/// One scraped table row: column header → trimmed cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, String>);

impl RawRecord {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.0.get(header).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Result of a scrape: either rows, or a well-formed "nothing there".
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Rows(Vec<RawRecord>),
    Empty,
}

impl ScrapeOutcome {
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        if records.is_empty() {
            ScrapeOutcome::Empty
        } else {
            ScrapeOutcome::Rows(records)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScrapeOutcome::Rows(rows) => rows.len(),
            ScrapeOutcome::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A raw record with every field the reconciler needs parsed and present.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRecord {
    pub security_desc: String,
    pub trades: i64,
    pub tta: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub ltp: f64,
    pub lty: f64,
}

impl MarketRecord {
    /// Parse a raw record. The error names the first offending field.
    pub fn from_raw(raw: &RawRecord) -> Result<Self, String> {
        let security_desc = required(raw, SECURITY_DESCRIPTION)?;
        if security_desc.is_empty() {
            return Err(format!("'{SECURITY_DESCRIPTION}' is empty"));
        }
        let desc_len = security_desc.chars().count();
        if desc_len > MAX_SECURITY_DESC_LEN {
            return Err(format!(
                "'{SECURITY_DESCRIPTION}' is {desc_len} characters, limit is {MAX_SECURITY_DESC_LEN}"
            ));
        }

        let trades_text = required(raw, TRADES)?;
        let trades: i64 = parse_number(TRADES, &trades_text)?;
        if trades < 0 {
            return Err(format!("'{TRADES}' is negative: {trades}"));
        }

        Ok(Self {
            security_desc,
            trades,
            tta: parse_real(raw, TTA)?,
            open: parse_real(raw, OPEN)?,
            high: parse_real(raw, HIGH)?,
            low: parse_real(raw, LOW)?,
            ltp: parse_real(raw, LTP)?,
            lty: parse_real(raw, LTY)?,
        })
    }
}

fn required(raw: &RawRecord, header: &str) -> Result<String, String> {
    raw.get(header)
        .map(|v| v.trim().to_string())
        .ok_or_else(|| format!("missing '{header}'"))
}

fn parse_real(raw: &RawRecord, header: &str) -> Result<f64, String> {
    let text = required(raw, header)?;
    let value: f64 = parse_number(header, &text)?;
    if !value.is_finite() {
        return Err(format!("'{header}' is not finite: {text:?}"));
    }
    Ok(value)
}

/// Parses a number as printed on the page, tolerating thousands separators.
fn parse_number<T: std::str::FromStr>(header: &str, text: &str) -> Result<T, String> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse()
        .map_err(|_| format!("'{header}' is not a number: {text:?}"))
}

/// A persisted, reconciled observation for one security.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub id: i64,
    pub security_desc: String,
    pub trades: i64,
    pub tta: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub ltp: f64,
    pub lty: f64,
    pub timestamp: DateTime<Utc>,
}

impl MarketRow {
    /// True when all seven value fields equal the record's.
    pub fn matches(&self, record: &MarketRecord) -> bool {
        self.trades == record.trades
            && self.tta == record.tta
            && self.open == record.open
            && self.high == record.high
            && self.low == record.low
            && self.ltp == record.ltp
            && self.lty == record.lty
    }

    /// Overwrite the value fields and move the timestamp to `now`.
    pub fn apply(&mut self, record: &MarketRecord, now: DateTime<Utc>) {
        self.trades = record.trades;
        self.tta = record.tta;
        self.open = record.open;
        self.high = record.high;
        self.low = record.low;
        self.ltp = record.ltp;
        self.lty = record.lty;
        self.timestamp = now;
    }
}

/// DTO for inserting a new market row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMarketRow {
    pub security_desc: String,
    pub trades: i64,
    pub tta: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub ltp: f64,
    pub lty: f64,
    pub timestamp: DateTime<Utc>,
}

impl NewMarketRow {
    pub fn from_record(record: &MarketRecord, now: DateTime<Utc>) -> Self {
        Self {
            security_desc: record.security_desc.clone(),
            trades: record.trades,
            tta: record.tta,
            open: record.open,
            high: record.high,
            low: record.low,
            ltp: record.ltp,
            lty: record.lty,
            timestamp: now,
        }
    }

    pub fn matches(&self, record: &MarketRecord) -> bool {
        self.trades == record.trades
            && self.tta == record.tta
            && self.open == record.open
            && self.high == record.high
            && self.low == record.low
            && self.ltp == record.ltp
            && self.lty == record.lty
    }
}

/// Counts reported after an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Per-day totals of one security, as charted by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub trades: i64,
    pub tta: f64,
}
