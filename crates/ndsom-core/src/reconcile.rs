//! Same-day upsert reconciliation.
//!
//! At most one row exists per security per calendar day. The first scrape of
//! a day inserts it; later scrapes that day overwrite it in place when any
//! value changed and leave it alone otherwise. Earlier days are never touched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::calendar::MarketCalendar;
use crate::error::AppError;
use crate::models::{MarketRecord, MarketRow, NewMarketRow, RawRecord, UpsertSummary};
use crate::traits::MarketStore;

/// What a reconciliation will write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub inserts: Vec<NewMarketRow>,
    /// Already-persisted rows with their new values applied.
    pub updates: Vec<MarketRow>,
    pub unchanged: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }

    pub fn summary(&self) -> UpsertSummary {
        UpsertSummary {
            inserted: self.inserts.len(),
            updated: self.updates.len(),
            unchanged: self.unchanged,
            skipped: 0,
        }
    }
}

/// Decide inserts and updates for `records` given the latest stored row of
/// each security.
///
/// A security listed twice in one batch still yields a single row; the later
/// record wins.
pub fn plan_reconciliation(
    records: &[MarketRecord],
    latest: Vec<MarketRow>,
    now: DateTime<Utc>,
    calendar: &MarketCalendar,
) -> ReconcilePlan {
    let mut today: HashMap<String, MarketRow> = HashMap::new();
    for row in latest {
        if !calendar.same_day(row.timestamp, now) {
            continue;
        }
        match today.get(&row.security_desc) {
            Some(existing) if existing.timestamp >= row.timestamp => {}
            _ => {
                today.insert(row.security_desc.clone(), row);
            }
        }
    }

    let mut plan = ReconcilePlan::default();
    let mut pending: HashMap<String, usize> = HashMap::new();
    let mut updated: Vec<String> = Vec::new();

    for record in records {
        if let Some(&index) = pending.get(&record.security_desc) {
            let insert = &mut plan.inserts[index];
            if insert.matches(record) {
                plan.unchanged += 1;
            } else {
                *insert = NewMarketRow::from_record(record, now);
            }
            continue;
        }

        if let Some(row) = today.get_mut(&record.security_desc) {
            if row.matches(record) {
                plan.unchanged += 1;
            } else {
                row.apply(record, now);
                if !updated.contains(&record.security_desc) {
                    updated.push(record.security_desc.clone());
                }
            }
            continue;
        }

        pending.insert(record.security_desc.clone(), plan.inserts.len());
        plan.inserts.push(NewMarketRow::from_record(record, now));
    }

    plan.updates = updated
        .iter()
        .filter_map(|security| today.remove(security))
        .collect();
    plan
}

/// Parses raw records and hands the valid ones to a [`MarketStore`].
pub struct UpsertService<S: MarketStore> {
    store: S,
    calendar: MarketCalendar,
}

impl<S: MarketStore> UpsertService<S> {
    pub fn new(store: S, calendar: MarketCalendar) -> Self {
        Self { store, calendar }
    }

    /// Upsert `raw_records` with the current instant as reconciliation time.
    pub async fn upsert(&self, raw_records: &[RawRecord]) -> Result<UpsertSummary, AppError> {
        self.upsert_at(raw_records, Utc::now()).await
    }

    /// Upsert `raw_records`, stamping touched rows with `now`.
    ///
    /// Records with a missing or unparsable field are skipped with a warning;
    /// the rest commit atomically or not at all.
    pub async fn upsert_at(
        &self,
        raw_records: &[RawRecord],
        now: DateTime<Utc>,
    ) -> Result<UpsertSummary, AppError> {
        let mut records = Vec::with_capacity(raw_records.len());
        let mut skipped = 0;

        for (index, raw) in raw_records.iter().enumerate() {
            match MarketRecord::from_raw(raw) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!(
                        row = index,
                        security = raw.get(crate::models::SECURITY_DESCRIPTION).unwrap_or(""),
                        %reason,
                        "Skipping malformed record"
                    );
                }
            }
        }

        let mut summary = if records.is_empty() {
            UpsertSummary::default()
        } else {
            self.store.reconcile(&records, now, &self.calendar).await?
        };
        summary.skipped = skipped;

        if summary.inserted > 0 || summary.updated > 0 {
            tracing::info!(
                inserted = summary.inserted,
                updated = summary.updated,
                unchanged = summary.unchanged,
                skipped = summary.skipped,
                "Committed market rows"
            );
        } else {
            tracing::info!(
                unchanged = summary.unchanged,
                skipped = summary.skipped,
                "No new or updated records to commit"
            );
        }

        Ok(summary)
    }
}
