//! HTTP(S) checks with manual redirect handling and keyword matching

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use tracing::{debug, trace};
use url::Url;

use super::address::normalize_url;
use super::{Check, ProbeResult, error_chain};
use crate::target::{CheckKind, HttpMethod, Target};

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 5;

/// Sentinel returned when the time-to-first-byte measurement fails
pub const TTFB_FAILED: i64 = -1;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Headers sent with every request so servers treat the probe like a browser
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

/// Why an HTTP exchange did not produce a final response
#[derive(Debug)]
enum FetchError {
    TooManyRedirects,
    BadLocation(url::ParseError),
    Transport(reqwest::Error),
}

impl FetchError {
    fn message(&self) -> String {
        match self {
            FetchError::TooManyRedirects => "maximum redirects exceeded".to_string(),
            FetchError::BadLocation(e) => format!("invalid redirect location: {e}"),
            FetchError::Transport(e) if e.is_timeout() => "request timed out".to_string(),
            FetchError::Transport(e) => error_chain(e),
        }
    }
}

/// Method to use for the next hop of a redirect
///
/// 301, 302 and 303 turn anything but GET and HEAD into GET; 307 and 308 keep it.
fn redirect_method(status: StatusCode, method: reqwest::Method) -> reqwest::Method {
    match status {
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
            if method != reqwest::Method::GET && method != reqwest::Method::HEAD =>
        {
            reqwest::Method::GET
        }
        _ => method,
    }
}

/// HTTP and HTTP-keyword check
pub struct HttpCheck {
    client: reqwest::Client,
}

impl HttpCheck {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Send the request, following redirects by hand
    ///
    /// Returns the final response and the time until its status line and
    /// headers arrived.
    async fn fetch(
        &self,
        method: HttpMethod,
        url: Url,
    ) -> Result<(reqwest::Response, u64), FetchError> {
        let start = Instant::now();
        let mut current = url;
        let mut method: reqwest::Method = method.into();

        for hop in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .request(method.clone(), current.clone())
                .send()
                .await
                .map_err(FetchError::Transport)?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|value| value.to_str().ok());

                if let Some(location) = location {
                    current = current.join(location).map_err(FetchError::BadLocation)?;
                    method = redirect_method(response.status(), method);
                    trace!("redirect {} to {current} as {method}", hop + 1);
                    continue;
                }
            }

            return Ok((response, start.elapsed().as_millis() as u64));
        }

        Err(FetchError::TooManyRedirects)
    }

    /// Time until the first body chunk of a fresh GET is available
    ///
    /// Never fails; returns [`TTFB_FAILED`] instead.
    pub async fn measure_ttfb(&self, url: Url) -> i64 {
        let start = Instant::now();

        let mut response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("ttfb request failed: {e}");
                return TTFB_FAILED;
            }
        };

        match response.chunk().await {
            Ok(_) => start.elapsed().as_millis() as i64,
            Err(e) => {
                debug!("ttfb body read failed: {e}");
                TTFB_FAILED
            }
        }
    }
}

#[async_trait]
impl Check for HttpCheck {
    async fn run(&self, target: &Target) -> ProbeResult {
        let (method, keyword) = match &target.check {
            CheckKind::Http { method } => (*method, None),
            CheckKind::HttpKeyword { method, keyword } => (*method, Some(keyword.as_str())),
            other => return ProbeResult::down(format!("not an HTTP check: {}", other.label())),
        };

        if keyword.is_some_and(str::is_empty) {
            return ProbeResult::down("no keyword configured for keyword check");
        }

        let Ok(url) = normalize_url(&target.address) else {
            return ProbeResult::down("invalid URL or host");
        };

        let (response, latency_ms) = match self.fetch(method, url).await {
            Ok(fetched) => fetched,
            Err(e) => return ProbeResult::down(e.message()),
        };

        let code = response.status().as_u16();
        let final_url = response.url().clone();

        let result = match keyword {
            Some(keyword) => match response.text().await {
                Ok(body) if body.contains(keyword) => {
                    ProbeResult::up(latency_ms, format!("keyword '{keyword}' found"))
                }
                Ok(_) => ProbeResult::down(format!("keyword '{keyword}' not found")),
                Err(e) => {
                    ProbeResult::down(format!("failed to read response body: {}", error_chain(&e)))
                }
            },
            None if (200..400).contains(&code) => {
                ProbeResult::up(latency_ms, format!("HTTP {}", response.status()))
            }
            None => ProbeResult::down(format!("HTTP {}", response.status())),
        };

        let mut result = result.with_http_status(code);
        if result.is_up() {
            result.ttfb_ms = Some(self.measure_ttfb(final_url).await);
        }
        result
    }
}
