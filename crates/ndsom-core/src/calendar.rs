use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

use crate::error::AppError;
use crate::models::{DailyTotal, MarketRow};

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Decides which calendar day an instant belongs to.
///
/// Timestamps are stored in UTC, but "the same day" is judged in the
/// exchange's local offset so that a morning run and an evening run of the
/// same trading session land on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketCalendar {
    offset: FixedOffset,
}

impl MarketCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// UTC calendar days.
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// India Standard Time (+05:30), the exchange's local time.
    pub fn ist() -> Self {
        match FixedOffset::east_opt(IST_OFFSET_SECS) {
            Some(offset) => Self::new(offset),
            None => Self::utc(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.date_of(a) == self.date_of(b)
    }

    /// Sum `trades` and `tta` per calendar day, oldest day first.
    pub fn daily_totals(&self, rows: &[MarketRow]) -> Vec<DailyTotal> {
        let mut totals: Vec<DailyTotal> = Vec::new();
        let mut sorted: Vec<&MarketRow> = rows.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);

        for row in sorted {
            let date = self.date_of(row.timestamp);
            match totals.last_mut() {
                Some(last) if last.date == date => {
                    last.trades += row.trades;
                    last.tta += row.tta;
                }
                _ => totals.push(DailyTotal {
                    date,
                    trades: row.trades,
                    tta: row.tta,
                }),
            }
        }
        totals
    }
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self::ist()
    }
}

impl FromStr for MarketCalendar {
    type Err = AppError;

    /// Accepts offsets such as `+05:30`, `-04:00`, `Z` or `UTC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }
        s.parse::<FixedOffset>()
            .map(Self::new)
            .map_err(|e| AppError::ConfigError(format!("Invalid UTC offset '{s}': {e}")))
    }
}
