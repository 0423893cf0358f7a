use std::time::Duration;

use ndsom_core::error::AppError;
use ndsom_core::traits::Fetcher;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) ndsom-tracker/0.1";

/// HTTP fetcher using reqwest.
///
/// Issues the page GET and the portlet resource POST with a browser-like
/// User-Agent and a fixed timeout.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::FetchError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<String, AppError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::FetchError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%url, status = status.as_u16(), "Failed to retrieve data");
            return Err(AppError::FetchError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::FetchError(format!("Failed to read response body: {e}")))
    }
}

impl Fetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<String, AppError> {
        self.send(self.client.get(url), url).await
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, AppError> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(encode_form(form));
        self.send(request, url).await
    }
}

fn encode_form(form: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish()
}
