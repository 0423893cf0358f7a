use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use ndsom_core::config::BrowserOptions;
use ndsom_core::error::AppError;
use ndsom_core::traits::{NextControl, PageDriver, PageDriverFactory};
use tokio::sync::OnceCell;
use tokio::time::{Instant, sleep};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Quiet period after which the network is considered idle.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Headless Chromium driven over the Chrome DevTools Protocol.
///
/// The browser process is launched on the first [`PageDriverFactory::open_driver`]
/// call and shared by every clone; each driver owns one tab.
#[derive(Clone)]
pub struct ChromiumLauncher {
    browser: Arc<OnceCell<Browser>>,
    options: BrowserOptions,
}

impl ChromiumLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            browser: Arc::new(OnceCell::new()),
            options,
        }
    }

    async fn browser(&self) -> Result<&Browser, AppError> {
        self.browser.get_or_try_init(launch).await
    }

    /// Locate a Chrome/Chromium binary, honouring `CHROME_BIN` first.
    ///
    /// Snap-packaged Chromium ships a wrapper that drops unknown flags, so the
    /// real binary inside the snap is preferred over `/snap/bin/chromium`.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }
}

async fn launch() -> Result<Browser, AppError> {
    let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
    if let Some(bin) = ChromiumLauncher::find_chrome_binary() {
        tracing::info!("Using Chrome binary: {}", bin.display());
        builder = builder.chrome_executable(bin);
    }

    let config = builder
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--no-first-run")
        .build()
        .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

    // The CDP handler must be polled for the connection to make progress.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                tracing::warn!("Browser CDP handler error: {event:?}");
                break;
            }
        }
    });

    tracing::info!("Headless browser launched");
    Ok(browser)
}

impl PageDriverFactory for ChromiumLauncher {
    type Driver = ChromiumDriver;

    async fn open_driver(&self) -> Result<ChromiumDriver, AppError> {
        let page = self
            .browser()
            .await?
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open tab: {e}")))?;

        Ok(ChromiumDriver {
            page,
            navigation_timeout: self.options.navigation_timeout,
        })
    }
}

/// One Chromium tab.
pub struct ChromiumDriver {
    page: Page,
    navigation_timeout: Duration,
}

impl ChromiumDriver {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, AppError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| AppError::BrowserError(format!("Script evaluation failed: {e}")))?
            .into_value()
            .map_err(|e| AppError::BrowserError(format!("Unexpected script result: {e}")))
    }

    /// Poll the resource timeline until no new entries appear for [`IDLE_WINDOW`].
    async fn wait_for_network_idle(&self, deadline: Instant) -> Result<(), AppError> {
        let mut last = self
            .eval::<u64>("performance.getEntriesByType('resource').length".into())
            .await?;
        let mut quiet_since = Instant::now();

        while Instant::now() < deadline {
            sleep(POLL_INTERVAL).await;
            let count = self
                .eval::<u64>("performance.getEntriesByType('resource').length".into())
                .await?;
            if count != last {
                last = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= IDLE_WINDOW {
                return Ok(());
            }
        }

        Err(AppError::Timeout(self.navigation_timeout.as_secs()))
    }
}

fn selector_literal(selector: &str) -> Result<String, AppError> {
    Ok(serde_json::to_string(selector)?)
}

impl PageDriver for ChromiumDriver {
    async fn open(&mut self, url: &str) -> Result<(), AppError> {
        let deadline = Instant::now() + self.navigation_timeout;

        let navigate = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| AppError::FetchError(format!("Failed to navigate to {url}: {e}")))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| AppError::FetchError(format!("Navigation to {url} failed: {e}")))?;
            Ok::<(), AppError>(())
        };
        tokio::time::timeout(self.navigation_timeout, navigate)
            .await
            .map_err(|_| AppError::Timeout(self.navigation_timeout.as_secs()))??;

        self.wait_for_network_idle(deadline).await
    }

    async fn click(&mut self, selector: &str) -> Result<bool, AppError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return false; el.click(); return true; }})()",
            selector_literal(selector)?
        );
        self.eval(script).await
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, AppError> {
        let deadline = Instant::now() + timeout;
        let script = format!(
            "document.querySelector({}) !== null",
            selector_literal(selector)?
        );

        loop {
            if self.eval::<bool>(script.clone()).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String, AppError> {
        self.page
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }

    async fn next_control(&mut self, selector: &str) -> Result<NextControl, AppError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return 'missing'; \
             const disabled = el.classList.contains('disabled') \
               || el.hasAttribute('disabled') \
               || el.getAttribute('aria-disabled') === 'true'; \
             return disabled ? 'disabled' : 'enabled'; }})()",
            selector_literal(selector)?
        );

        let state: String = self.eval(script).await?;
        Ok(match state.as_str() {
            "enabled" => NextControl::Enabled,
            "disabled" => NextControl::Disabled,
            _ => NextControl::Missing,
        })
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!("Failed to close tab: {e}");
        }
    }
}
