use crate::ajax::{decode_payload, resource_url};
use crate::browser::{TabMap, scrape_with_browser};
use crate::config::SourceConfig;
use crate::error::AppError;
use crate::extract::extract_table;
use crate::models::ScrapeOutcome;
use crate::table::{Strategy, TableId};
use crate::traits::{Fetcher, PageDriverFactory};

/// Retrieves one market table by the requested strategy.
///
/// Generic over the HTTP fetcher and the browser factory, so every strategy
/// can be exercised without network access.
pub struct ScrapeService<'a, F, B>
where
    F: Fetcher,
    B: PageDriverFactory,
{
    fetcher: F,
    browser: B,
    tabs: TabMap,
    config: &'a SourceConfig,
}

impl<'a, F, B> ScrapeService<'a, F, B>
where
    F: Fetcher,
    B: PageDriverFactory,
{
    pub fn new(fetcher: F, browser: B, config: &'a SourceConfig) -> Self {
        Self {
            fetcher,
            browser,
            tabs: TabMap::default(),
            config,
        }
    }

    /// Scrape `table_identifier` from `url` using `strategy`.
    ///
    /// Both names are validated before any I/O; unknown values fail with
    /// [`AppError::ConfigError`]. Fetch failures propagate unchanged.
    pub async fn scrape(
        &self,
        url: &str,
        table_identifier: &str,
        strategy: &str,
    ) -> Result<ScrapeOutcome, AppError> {
        let table: TableId = table_identifier.parse()?;
        let strategy: Strategy = strategy.parse()?;
        self.scrape_table(url, table, strategy).await
    }

    pub async fn scrape_table(
        &self,
        url: &str,
        table: TableId,
        strategy: Strategy,
    ) -> Result<ScrapeOutcome, AppError> {
        tracing::info!(%url, %table, %strategy, "Scraping table");

        let outcome = match strategy {
            Strategy::Html => self.fetch_html(url, table).await?,
            Strategy::Direct => self.fetch_direct(url, table).await?,
            Strategy::Browser => ScrapeOutcome::from_records(
                scrape_with_browser(&self.browser, &self.tabs, url, table, &self.config.browser)
                    .await?,
            ),
        };

        tracing::info!(%table, rows = outcome.len(), "Scrape finished");
        Ok(outcome)
    }

    async fn fetch_html(&self, url: &str, table: TableId) -> Result<ScrapeOutcome, AppError> {
        let html = self.fetcher.get(url).await?;
        tracing::debug!("Fetched {} bytes of HTML", html.len());
        Ok(ScrapeOutcome::from_records(extract_table(&html, table.as_str())?))
    }

    async fn fetch_direct(&self, url: &str, table: TableId) -> Result<ScrapeOutcome, AppError> {
        let endpoint = resource_url(url, &self.config.portlet_id, table)?;
        let body = self.fetcher.post_form(endpoint.as_str(), &[]).await?;

        match decode_payload(&body, &self.config.payload_field) {
            Ok(records) => Ok(ScrapeOutcome::from_records(records)),
            Err(e) => {
                tracing::warn!(%table, error = %e, "Could not decode resource payload, treating as empty");
                Ok(ScrapeOutcome::Empty)
            }
        }
    }
}
