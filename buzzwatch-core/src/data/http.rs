//! HTTP(S) data source.
//!
//! Fetches a CSV payload with a blocking GET. Every request is bounded by the
//! client timeout. Connect failures, timeouts, 5xx and 429 responses are retried with
//! exponential backoff; other 4xx responses fail immediately.

use super::source::{DataSource, FetchError};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on retries per fetch.
pub const MAX_RETRIES: u32 = 10;

/// Longest single sleep between attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at [`MAX_BACKOFF`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.checked_mul(factor)
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// Settings for an [`HttpSource`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            user_agent: concat!("buzzwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches a table from a URL.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, opts: HttpOptions) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(opts.timeout)
            .user_agent(opts.user_agent)
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            max_retries: opts.max_retries.min(MAX_RETRIES),
            base_delay: opts.base_delay,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single attempt. `Ok(Err(_))` means the failure is worth retrying.
    fn attempt(&self) -> Result<Result<Vec<u8>, FetchError>, FetchError> {
        let resp = match self.client.get(&self.url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return Ok(Err(FetchError::Timeout {
                    url: self.url.clone(),
                }))
            }
            Err(e) if e.is_connect() => {
                return Ok(Err(FetchError::NetworkUnreachable(e.to_string())))
            }
            Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
        };

        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Ok(Err(FetchError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status.is_server_error() {
            return Ok(Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            }));
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        match resp.bytes() {
            Ok(body) => Ok(Ok(body.to_vec())),
            Err(e) if e.is_timeout() => Ok(Err(FetchError::Timeout {
                url: self.url.clone(),
            })),
            Err(e) => Err(FetchError::Other(format!("failed to read body: {e}"))),
        }
    }
}

impl DataSource for HttpSource {
    fn name(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                debug!(url = %self.url, attempt, delay_ms = delay.as_millis() as u64, "retrying fetch");
                std::thread::sleep(delay);
            }

            match self.attempt()? {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "fetch attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}
