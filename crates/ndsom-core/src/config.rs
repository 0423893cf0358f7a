use std::str::FromStr;
use std::time::Duration;

use crate::calendar::MarketCalendar;
use crate::error::AppError;
use crate::table::{Strategy, TableId};

pub const DEFAULT_BASE_URL: &str = "https://www.ccilindia.com/web/ccil/rbi-nds-om1";
pub const DEFAULT_PORTLET_ID: &str = "com_ccil_ndsom_NdsomMarketWatchPortlet";
pub const DEFAULT_PAYLOAD_FIELD: &str = "data";

/// Timing knobs for the browser strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserOptions {
    /// Upper bound on page navigation plus network idle.
    pub navigation_timeout: Duration,
    /// How long to wait for the first row after activating the tab.
    pub row_wait: Duration,
    /// Pause after clicking "next" so the table can re-render.
    pub settle_delay: Duration,
    /// Safety cap on pages visited in one run.
    pub max_pages: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            row_wait: Duration::from_secs(10),
            settle_delay: Duration::from_millis(1500),
            max_pages: 200,
        }
    }
}

/// Where and how to scrape. Built once at process start and passed down.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub base_url: String,
    pub table: TableId,
    pub strategy: Strategy,
    /// Portlet namespace (`p_p_id`) of the AJAX resource.
    pub portlet_id: String,
    /// Name of the response field holding the JSON-encoded row array.
    pub payload_field: String,
    pub http_timeout: Duration,
    pub browser: BrowserOptions,
    pub calendar: MarketCalendar,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            table: TableId::Ndsom,
            strategy: Strategy::Direct,
            portlet_id: DEFAULT_PORTLET_ID.to_string(),
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
            http_timeout: Duration::from_secs(30),
            browser: BrowserOptions::default(),
            calendar: MarketCalendar::default(),
        }
    }
}

impl SourceConfig {
    /// Read configuration from environment variables.
    ///
    /// - `NDSOM_BASE_URL`, `NDSOM_TABLE`, `NDSOM_STRATEGY`
    /// - `NDSOM_PORTLET_ID`, `NDSOM_PAYLOAD_FIELD`
    /// - `NDSOM_HTTP_TIMEOUT_SECS`, `NDSOM_NAV_TIMEOUT_SECS`, `NDSOM_ROW_WAIT_SECS`,
    ///   `NDSOM_SETTLE_MILLIS`, `NDSOM_MAX_PAGES`
    /// - `NDSOM_UTC_OFFSET` (defaults to `+05:30`)
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(url) = lookup("NDSOM_BASE_URL") {
            config.base_url = url;
        }
        if let Some(table) = lookup("NDSOM_TABLE") {
            config.table = table.parse()?;
        }
        if let Some(strategy) = lookup("NDSOM_STRATEGY") {
            config.strategy = strategy.parse()?;
        }
        if let Some(portlet) = lookup("NDSOM_PORTLET_ID") {
            config.portlet_id = portlet;
        }
        if let Some(field) = lookup("NDSOM_PAYLOAD_FIELD") {
            config.payload_field = field;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "NDSOM_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "NDSOM_NAV_TIMEOUT_SECS")? {
            config.browser.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "NDSOM_ROW_WAIT_SECS")? {
            config.browser.row_wait = Duration::from_secs(secs);
        }
        if let Some(millis) = parse_var::<u64>(&lookup, "NDSOM_SETTLE_MILLIS")? {
            config.browser.settle_delay = Duration::from_millis(millis);
        }
        if let Some(pages) = parse_var::<usize>(&lookup, "NDSOM_MAX_PAGES")? {
            if pages == 0 {
                return Err(AppError::ConfigError(
                    "NDSOM_MAX_PAGES must be at least 1".into(),
                ));
            }
            config.browser.max_pages = pages;
        }
        if let Some(offset) = lookup("NDSOM_UTC_OFFSET") {
            config.calendar = offset.parse()?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            AppError::ConfigError(format!("Invalid {key} '{raw}': must be a non-negative integer"))
        }),
    }
}
