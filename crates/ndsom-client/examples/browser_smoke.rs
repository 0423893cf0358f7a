/// Smoke-test for `ChromiumLauncher`.
///
/// Launches a headless Chromium, opens the NDS-OM market watch page, activates
/// the regular-market tab and walks its pager, printing how many rows it saw.
///
/// Run with:
///   cargo run -p ndsom-client --example browser_smoke --features browser
use ndsom_client::ChromiumLauncher;
use ndsom_core::browser::{TabMap, scrape_with_browser};
use ndsom_core::config::{BrowserOptions, DEFAULT_BASE_URL};
use ndsom_core::table::TableId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let options = BrowserOptions::default();
    let launcher = ChromiumLauncher::new(options.clone());

    println!("Scraping {url} …");
    let records =
        scrape_with_browser(&launcher, &TabMap::default(), &url, TableId::Ndsom, &options).await?;

    println!("OK, got {} rows", records.len());
    if let Some(first) = records.first() {
        println!("First row: {first:?}");
    }
    Ok(())
}
