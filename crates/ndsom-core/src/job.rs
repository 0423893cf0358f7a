use crate::error::AppError;
use crate::models::{ScrapeOutcome, UpsertSummary};
use crate::reconcile::UpsertService;
use crate::scrape::ScrapeService;
use crate::table::{Strategy, TableId};
use crate::traits::{Fetcher, MarketStore, PageDriverFactory};

/// One scheduled run: scrape the table, then reconcile it into storage.
///
/// Returns the upsert summary, or a zero summary when nothing was scraped.
/// Errors are not retried here; the scheduler decides.
pub async fn run_update<F, B, S>(
    scraper: &ScrapeService<'_, F, B>,
    upserter: &UpsertService<S>,
    url: &str,
    table: TableId,
    strategy: Strategy,
) -> Result<UpsertSummary, AppError>
where
    F: Fetcher,
    B: PageDriverFactory,
    S: MarketStore,
{
    tracing::info!(%table, %strategy, "Start scraping");
    let outcome = scraper.scrape_table(url, table, strategy).await?;

    match outcome {
        ScrapeOutcome::Empty => {
            tracing::warn!(%table, %url, "No data scraped");
            Ok(UpsertSummary::default())
        }
        ScrapeOutcome::Rows(records) => {
            let summary = upserter.upsert(&records).await?;
            tracing::info!(
                %table,
                scraped = records.len(),
                inserted = summary.inserted,
                updated = summary.updated,
                "Update finished"
            );
            Ok(summary)
        }
    }
}
