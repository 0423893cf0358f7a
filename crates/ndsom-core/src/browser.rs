//! Browser-driven pagination over a JS-rendered table.

use std::collections::HashMap;

use crate::config::BrowserOptions;
use crate::error::AppError;
use crate::extract::extract_table;
use crate::models::RawRecord;
use crate::table::TableId;
use crate::traits::{NextControl, PageDriver, PageDriverFactory};

/// Which tab to click to reveal each table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabMap(HashMap<TableId, String>);

impl TabMap {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, table: TableId, selector: impl Into<String>) -> Self {
        self.0.insert(table, selector.into());
        self
    }

    pub fn get(&self, table: TableId) -> Option<&str> {
        self.0.get(&table).map(String::as_str)
    }
}

impl Default for TabMap {
    fn default() -> Self {
        TableId::ALL
            .into_iter()
            .fold(Self::empty(), |map, t| map.with(t, t.default_tab_selector()))
    }
}

/// Open a driver, walk every page of `table`, and close the driver again
/// whether or not the walk succeeded.
pub async fn scrape_with_browser<F: PageDriverFactory>(
    factory: &F,
    tabs: &TabMap,
    url: &str,
    table: TableId,
    options: &BrowserOptions,
) -> Result<Vec<RawRecord>, AppError> {
    let tab = tabs.get(table).ok_or_else(|| {
        AppError::ConfigError(format!("No tab mapping for table '{table}'"))
    })?;

    let mut driver = factory.open_driver().await?;
    let result = paginate(&mut driver, url, tab, table, options).await;
    driver.close().await;
    result
}

/// Walk the pager of `table` until its "next" control is missing or disabled.
///
/// Visiting more than `options.max_pages` pages is treated as a broken pager
/// and fails with [`AppError::FetchError`].
pub async fn paginate<D: PageDriver>(
    driver: &mut D,
    url: &str,
    tab_selector: &str,
    table: TableId,
    options: &BrowserOptions,
) -> Result<Vec<RawRecord>, AppError> {
    tracing::info!(%url, %table, "Opening page in browser");
    driver.open(url).await?;

    if !driver.click(tab_selector).await? {
        return Err(AppError::ConfigError(format!(
            "Tab control '{tab_selector}' for table '{table}' not found on page"
        )));
    }

    if !driver.wait_for(&table.row_selector(), options.row_wait).await? {
        tracing::warn!(
            %table,
            wait_secs = options.row_wait.as_secs_f32(),
            "No rows appeared in time, scraping page as-is"
        );
    }

    let next_selector = table.next_control_selector();
    let mut records = Vec::new();
    let mut page = 1usize;

    loop {
        let html = driver.content().await?;
        let rows = extract_table(&html, table.as_str())?;
        tracing::debug!(%table, page, rows = rows.len(), "Scraped page");
        records.extend(rows);

        match driver.next_control(&next_selector).await? {
            NextControl::Missing | NextControl::Disabled => break,
            NextControl::Enabled => {
                if page >= options.max_pages {
                    return Err(AppError::FetchError(format!(
                        "Pager of '{table}' still enabled after {page} pages"
                    )));
                }
                if !driver.click(&next_selector).await? {
                    tracing::warn!(%table, page, "Next control vanished before click");
                    break;
                }
                tokio::time::sleep(options.settle_delay).await;
                page += 1;
            }
        }
    }

    tracing::info!(%table, pages = page, rows = records.len(), "Browser scrape finished");
    Ok(records)
}
