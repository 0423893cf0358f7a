use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::calendar::MarketCalendar;
use crate::error::AppError;
use crate::models::{MarketRecord, UpsertSummary};

/// Retrieves raw content over HTTP.
pub trait Fetcher: Send + Sync + Clone {
    /// GET a page and return its body.
    fn get(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    /// POST a form-encoded body and return the response body.
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// State of a pager's "next" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Missing,
    Disabled,
    Enabled,
}

/// One open browser tab that can be steered through a paginated table.
pub trait PageDriver: Send {
    /// Navigate to `url` and wait until the network goes quiet.
    fn open(&mut self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Click the element matching `selector`. Returns `false` if nothing matched.
    fn click(&mut self, selector: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Wait until `selector` matches at least one element. Returns `false` on timeout.
    fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// The current rendered DOM.
    fn content(&mut self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Inspect the control matching `selector`.
    fn next_control(
        &mut self,
        selector: &str,
    ) -> impl Future<Output = Result<NextControl, AppError>> + Send;

    /// Release the tab.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens [`PageDriver`]s on demand, so a browser is only launched for the
/// browser strategy.
pub trait PageDriverFactory: Send + Sync + Clone {
    type Driver: PageDriver;

    fn open_driver(&self) -> impl Future<Output = Result<Self::Driver, AppError>> + Send;
}

/// A factory for builds without browser support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowser;

/// Never constructed; exists so [`NoBrowser`] can name a driver type.
pub enum NoDriver {}

impl PageDriver for NoDriver {
    async fn open(&mut self, _url: &str) -> Result<(), AppError> {
        match *self {}
    }

    async fn click(&mut self, _selector: &str) -> Result<bool, AppError> {
        match *self {}
    }

    async fn wait_for(&mut self, _selector: &str, _timeout: Duration) -> Result<bool, AppError> {
        match *self {}
    }

    async fn content(&mut self) -> Result<String, AppError> {
        match *self {}
    }

    async fn next_control(&mut self, _selector: &str) -> Result<NextControl, AppError> {
        match *self {}
    }

    async fn close(self) {
        match self {}
    }
}

impl PageDriverFactory for NoBrowser {
    type Driver = NoDriver;

    async fn open_driver(&self) -> Result<NoDriver, AppError> {
        Err(AppError::ConfigError(
            "Browser strategy requires the `browser` feature".into(),
        ))
    }
}

/// Persists reconciled market rows.
pub trait MarketStore: Send + Sync + Clone {
    /// Reconcile `records` against the latest stored rows and commit the
    /// resulting inserts and updates as one atomic batch.
    ///
    /// `now` is the reconciliation instant stamped on every touched row.
    fn reconcile(
        &self,
        records: &[MarketRecord],
        now: DateTime<Utc>,
        calendar: &MarketCalendar,
    ) -> impl Future<Output = Result<UpsertSummary, AppError>> + Send;
}
