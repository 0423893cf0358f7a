pub mod ajax;
pub mod browser;
pub mod calendar;
pub mod config;
pub mod error;
pub mod extract;
pub mod job;
pub mod models;
pub mod reconcile;
pub mod scrape;
pub mod table;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use browser::TabMap;
pub use calendar::MarketCalendar;
pub use config::{BrowserOptions, SourceConfig};
pub use error::AppError;
pub use models::{DailyTotal, MarketRecord, MarketRow, NewMarketRow, RawRecord, ScrapeOutcome, UpsertSummary};
pub use reconcile::{ReconcilePlan, UpsertService, plan_reconciliation};
pub use scrape::ScrapeService;
pub use table::{Strategy, TableId};
pub use traits::{Fetcher, MarketStore, NextControl, NoBrowser, PageDriver, PageDriverFactory};
