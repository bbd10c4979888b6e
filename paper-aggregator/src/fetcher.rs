use crate::types::{FetchConfig, FetchResult, PipelineError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// HTTP client for feed endpoints. Every request carries the configured
/// timeout; a timeout or transport error counts as a failed attempt.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch `url`, retrying with exponential backoff. Never returns `Err` for
    /// network problems: those are reported through `FetchResult::error` so the
    /// caller can degrade to an empty batch.
    pub async fn fetch_feed(&self, url: &str) -> Result<FetchResult> {
        let start_time = Instant::now();

        Url::parse(url)?;
        debug!(url, "Fetching feed");

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = None;
        let mut last_status = None;

        for attempt in 0..=self.config.max_retries {
            match self.send(url).await {
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status.as_u16());

                    if !status.is_success() {
                        last_error = Some(PipelineError::General(format!(
                            "HTTP {}: {}",
                            status,
                            status.canonical_reason().unwrap_or("Unknown")
                        )));
                    } else {
                        if let Some(content_length) = response.content_length() {
                            let size_mb = content_length as usize / (1024 * 1024);
                            if size_mb > self.config.max_feed_size_mb {
                                let error = PipelineError::FeedTooLarge { size_mb };
                                warn!(url, size_mb, "Feed exceeds size limit");
                                return Ok(self.failed(url, start_time, Some(status.as_u16()), error));
                            }
                        }

                        match response.text().await {
                            Ok(content) => {
                                info!(url, bytes = content.len(), "Fetched feed");
                                return Ok(FetchResult {
                                    url: url.to_string(),
                                    success: true,
                                    error: None,
                                    response_time_ms: start_time.elapsed().as_millis() as u64,
                                    http_status: Some(status.as_u16()),
                                    content: Some(content),
                                });
                            }
                            Err(e) => last_error = Some(PipelineError::Http(e)),
                        }
                    }
                }
                Err(e) => last_error = Some(e),
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!(url, attempt = attempt + 1, ?delay, "Fetch attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        let error = last_error.unwrap_or_else(|| PipelineError::General("Unknown error".to_string()));
        error!(url, attempts = self.config.max_retries + 1, %error, "Failed to fetch feed");
        Ok(self.failed(url, start_time, last_status, error))
    }

    async fn send(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Timeout {
                    operation: format!("GET {}", url),
                    seconds: self.config.timeout_seconds,
                }
            } else {
                PipelineError::Http(e)
            }
        })?;
        Ok(response)
    }

    fn failed(
        &self,
        url: &str,
        start_time: Instant,
        http_status: Option<u16>,
        error: PipelineError,
    ) -> FetchResult {
        FetchResult {
            url: url.to_string(),
            success: false,
            error: Some(error.to_string()),
            response_time_ms: start_time.elapsed().as_millis() as u64,
            http_status,
            content: None,
        }
    }
}
