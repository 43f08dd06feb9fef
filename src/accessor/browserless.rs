//! Browserless rendering source
//!
//! This module renders pages through a headless-browser service exposing the
//! Browserless `/content` API, including:
//! - Building the HTTP client with the configured user agent
//! - Passing the authenticated session cookie
//! - Emulating scroll actions with an injected script before the DOM is captured
//! - Classifying backend failures into transient and permanent errors

use crate::accessor::html::HtmlSource;
use crate::accessor::traits::{AccessorError, AccessorResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Settings for a [`BrowserlessSource`]
#[derive(Debug, Clone)]
pub struct BrowserlessOptions {
    /// Base URL of the rendering service
    pub endpoint: String,

    /// API token appended as `?token=`
    pub token: Option<String>,

    /// Name and value of the session cookie sent with every page load
    pub session_cookie: Option<(String, String)>,

    /// User agent presented to the site
    pub user_agent: String,

    /// Pixels scrolled per scroll action
    pub scroll_step_px: u32,

    /// Pause after each emulated scroll step
    pub scroll_pause: Duration,

    /// Time the page is given to settle before the DOM is captured
    pub settle: Duration,

    /// Request timeout for one render
    pub request_timeout: Duration,
}

/// Builds an HTTP client for the rendering service
///
/// # Arguments
///
/// * `user_agent` - User agent sent to the rendering service
/// * `timeout` - Timeout for a whole render request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`HtmlSource`] that renders pages with a Browserless instance
pub struct BrowserlessSource {
    client: Client,
    options: BrowserlessOptions,
}

impl BrowserlessSource {
    /// Creates a new source
    pub fn new(options: BrowserlessOptions) -> Result<Self, AccessorError> {
        let client = build_http_client(&options.user_agent, options.request_timeout)?;
        Ok(Self { client, options })
    }

    fn content_endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.options.endpoint.trim_end_matches('/'));
        if let Some(token) = &self.options.token {
            endpoint.push_str(&format!("?token={}", token));
        }
        endpoint
    }

    /// Builds the `/content` request body for a page after `scrolls` scroll actions
    pub fn request_body(&self, url: &str, scrolls: u32) -> Value {
        let mut body = json!({
            "url": url,
            "gotoOptions": { "waitUntil": "networkidle2" },
            "setExtraHTTPHeaders": { "Accept-Language": "en-US,en;q=0.9" },
            "userAgent": self.options.user_agent,
        });

        if let Some((name, value)) = &self.options.session_cookie {
            let domain = Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(|host| format!(".{}", host)))
                .unwrap_or_default();
            body["cookies"] = json!([{
                "name": name,
                "value": value,
                "domain": domain,
                "path": "/",
                "secure": true,
                "httpOnly": true,
            }]);
        }

        let pause_ms = self.options.scroll_pause.as_millis() as u64;
        if scrolls > 0 {
            let script = format!(
                "(async () => {{ for (let i = 0; i < {}; i++) {{ window.scrollBy(0, {}); \
                 await new Promise(r => setTimeout(r, {})); }} }})();",
                scrolls, self.options.scroll_step_px, pause_ms
            );
            body["addScriptTag"] = json!([{ "content": script }]);
        }

        let settle_ms = self.options.settle.as_millis() as u64 + pause_ms * u64::from(scrolls);
        body["waitForTimeout"] = json!(settle_ms);
        body
    }
}

#[async_trait]
impl HtmlSource for BrowserlessSource {
    async fn render(&mut self, url: &str, scrolls: u32) -> AccessorResult<String> {
        let body = self.request_body(url, scrolls);

        let response = match self
            .client
            .post(self.content_endpoint())
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(AccessorError::Timeout(format!("rendering {}", url)));
            }
            Err(e) if e.is_connect() => {
                return Err(AccessorError::Navigation {
                    url: url.to_string(),
                    message: format!("rendering service unreachable: {}", e),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AccessorError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}
