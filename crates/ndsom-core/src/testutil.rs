//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::calendar::MarketCalendar;
use crate::error::AppError;
use crate::models::{MarketRecord, MarketRow, RawRecord, UpsertSummary};
use crate::reconcile::plan_reconciliation;
use crate::table::TableId;
use crate::traits::{Fetcher, MarketStore, NextControl, PageDriver, PageDriverFactory};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A rendered market table with one row per security name.
pub fn table_page(table: TableId, securities: &[&str]) -> String {
    let rows: String = securities
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{s}</td><td>10</td><td>25.5</td><td>100.1</td>\
                 <td>100.4</td><td>99.8</td><td>100.2</td><td>7.12</td></tr>"
            )
        })
        .collect();

    format!(
        "<html><body><table id=\"{table}\"><thead><tr>\
         <th>Security Description</th><th>Trades</th><th>TTA</th><th>Open</th>\
         <th>High</th><th>Low</th><th>LTP</th><th>LTY</th>\
         </tr></thead><tbody>{rows}</tbody></table></body></html>"
    )
}

/// A raw record as scraped, with fixed prices and the given trade count text.
pub fn raw_market(security: &str, trades: &str) -> RawRecord {
    [
        ("Security Description", security),
        ("Trades", trades),
        ("TTA", "25.5"),
        ("Open", "100.1"),
        ("High", "100.4"),
        ("Low", "99.8"),
        ("LTP", "100.2"),
        ("LTY", "7.12"),
    ]
    .into_iter()
    .collect()
}

pub fn market_row(id: i64, security: &str, trades: i64, timestamp: DateTime<Utc>) -> MarketRow {
    MarketRow {
        id,
        security_desc: security.to_string(),
        trades,
        tta: 25.5,
        open: 100.1,
        high: 100.4,
        low: 99.8,
        ltp: 100.2,
        lty: 7.12,
        timestamp,
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
}

/// Mock fetcher that returns queued responses and records every request.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns an empty body.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockFetcher {
    pub fn new(body: &str) -> Self {
        Self::with_responses(vec![Ok(body.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, method: &'static str, url: &str) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(String::new())
        } else {
            responses.remove(0)
        }
    }
}

impl Fetcher for MockFetcher {
    async fn get(&self, url: &str) -> Result<String, AppError> {
        self.respond("GET", url)
    }

    async fn post_form(&self, url: &str, _form: &[(&str, &str)]) -> Result<String, AppError> {
        self.respond("POST", url)
    }
}

// ---------------------------------------------------------------------------
// MockDriver
// ---------------------------------------------------------------------------

struct DriverState {
    pages: Vec<String>,
    current: usize,
    clicks: Vec<String>,
    tab_present: bool,
    rows_present: bool,
    last_control: NextControl,
    never_ending: bool,
    closed: bool,
}

/// Mock browser tab serving a fixed list of pages.
///
/// Any click on a selector ending in `_next` advances to the following page;
/// every other click is treated as the tab control.
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<DriverState>>,
}

impl MockDriver {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState {
                pages,
                current: 0,
                clicks: Vec::new(),
                tab_present: true,
                rows_present: true,
                last_control: NextControl::Disabled,
                never_ending: false,
                closed: false,
            })),
        }
    }

    /// State of the "next" control on the final page.
    pub fn with_last_control(self, control: NextControl) -> Self {
        self.state.lock().unwrap().last_control = control;
        self
    }

    /// Keep reporting an enabled "next" control forever.
    pub fn never_ending(self) -> Self {
        self.state.lock().unwrap().never_ending = true;
        self
    }

    pub fn without_tab(self) -> Self {
        self.state.lock().unwrap().tab_present = false;
        self
    }

    pub fn without_rows(self) -> Self {
        self.state.lock().unwrap().rows_present = false;
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl PageDriver for MockDriver {
    async fn open(&mut self, _url: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());
        if selector.ends_with("_next") {
            if state.current + 1 < state.pages.len() {
                state.current += 1;
            }
            Ok(true)
        } else {
            Ok(state.tab_present)
        }
    }

    async fn wait_for(&mut self, _selector: &str, _timeout: Duration) -> Result<bool, AppError> {
        Ok(self.state.lock().unwrap().rows_present)
    }

    async fn content(&mut self) -> Result<String, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.pages.get(state.current).cloned().unwrap_or_default())
    }

    async fn next_control(&mut self, _selector: &str) -> Result<NextControl, AppError> {
        let state = self.state.lock().unwrap();
        if state.never_ending || state.current + 1 < state.pages.len() {
            Ok(NextControl::Enabled)
        } else {
            Ok(state.last_control)
        }
    }

    async fn close(self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// Factory handing out clones of one [`MockDriver`].
#[derive(Clone)]
pub struct MockDriverFactory {
    driver: MockDriver,
    opened: Arc<Mutex<usize>>,
}

impl MockDriverFactory {
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver,
            opened: Arc::new(Mutex::new(0)),
        }
    }

    pub fn opened(&self) -> usize {
        *self.opened.lock().unwrap()
    }
}

impl PageDriverFactory for MockDriverFactory {
    type Driver = MockDriver;

    async fn open_driver(&self) -> Result<MockDriver, AppError> {
        *self.opened.lock().unwrap() += 1;
        Ok(self.driver.clone())
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

struct StoreState {
    rows: Vec<MarketRow>,
    next_id: i64,
    fail_commit: bool,
    commit_attempts: usize,
}

/// In-memory store applying the same reconciliation plan as the database.
#[derive(Clone)]
pub struct MockStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<MarketRow>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            state: Arc::new(Mutex::new(StoreState {
                rows,
                next_id,
                fail_commit: false,
                commit_attempts: 0,
            })),
        }
    }

    /// Make every commit fail, leaving stored rows untouched.
    pub fn failing(self) -> Self {
        self.state.lock().unwrap().fail_commit = true;
        self
    }

    pub fn rows(&self) -> Vec<MarketRow> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn commit_attempts(&self) -> usize {
        self.state.lock().unwrap().commit_attempts
    }
}

impl MarketStore for MockStore {
    async fn reconcile(
        &self,
        records: &[MarketRecord],
        now: DateTime<Utc>,
        calendar: &MarketCalendar,
    ) -> Result<UpsertSummary, AppError> {
        let mut state = self.state.lock().unwrap();
        state.commit_attempts += 1;

        let latest: Vec<MarketRow> = state
            .rows
            .iter()
            .filter(|r| records.iter().any(|rec| rec.security_desc == r.security_desc))
            .cloned()
            .collect();
        let plan = plan_reconciliation(records, latest, now, calendar);

        if state.fail_commit {
            return Err(AppError::PersistenceError(
                "commit failed, batch rolled back".into(),
            ));
        }

        for updated in &plan.updates {
            if let Some(row) = state.rows.iter_mut().find(|r| r.id == updated.id) {
                *row = updated.clone();
            }
        }
        for insert in &plan.inserts {
            let id = state.next_id;
            state.next_id += 1;
            state.rows.push(MarketRow {
                id,
                security_desc: insert.security_desc.clone(),
                trades: insert.trades,
                tta: insert.tta,
                open: insert.open,
                high: insert.high,
                low: insert.low,
                ltp: insert.ltp,
                lty: insert.lty,
                timestamp: insert.timestamp,
            });
        }

        Ok(plan.summary())
    }
}
