pub mod fetcher;

#[cfg(feature = "browser")]
pub mod chromium;

#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumLauncher};
pub use fetcher::ReqwestFetcher;
