//! HTTP client with client-side rate limiting and retry logic
//!
//! Every external adapter (object store, vision gateway) talks HTTP through
//! this client so throttling and retry behavior live in one place.

use super::retry_policy::{is_retryable_error, RateLimitInfo, RetryPolicy};
use crate::shared::errors::{AppError, AppResult};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::sleep;

type DirectRateLimiter = GovernorRateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

const USER_AGENT: &str = concat!("media-pipeline/", env!("CARGO_PKG_VERSION"));

/// HTTP client that handles rate limiting and retries
pub struct RateLimitClient {
    client: Client,
    rate_limiter: DirectRateLimiter,
    retry_policy: RetryPolicy,
    service_name: String,
}

impl RateLimitClient {
    /// Client for the detection gateway: 5 req/sec with a burst of 10
    pub fn for_vision() -> AppResult<Self> {
        Self::new("Vision", RetryPolicy::vision(), 5.0, 10, Duration::from_secs(30))
    }

    /// Client for the object store: 50 req/sec with a burst of 50
    pub fn for_storage() -> AppResult<Self> {
        Self::new("Storage", RetryPolicy::storage(), 50.0, 50, Duration::from_secs(120))
    }

    pub fn new(
        service_name: &str,
        retry_policy: RetryPolicy,
        requests_per_second: f64,
        burst_size: u32,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to build {} HTTP client: {}", service_name, e))
            })?;

        Ok(Self {
            client,
            rate_limiter: Self::create_rate_limiter(requests_per_second, burst_size),
            retry_policy,
            service_name: service_name.to_string(),
        })
    }

    fn create_rate_limiter(requests_per_second: f64, burst_size: u32) -> DirectRateLimiter {
        let period = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::from_secs(3600)
        };

        let burst = NonZeroU32::new(burst_size.max(1)).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);

        GovernorRateLimiter::direct(quota)
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send_with_retries(|client| {
                client
                    .post(url)
                    .header("Accept", "application/json")
                    .json(body)
            })
            .await?;
        self.parse_response(response).await
    }

    /// PUT raw bytes; success is any 2xx
    pub async fn put_bytes(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: &str,
        bearer_token: Option<&str>,
    ) -> AppResult<()> {
        self.send_with_retries(|client| {
            let request = client
                .put(url)
                .header("Content-Type", content_type)
                .body(body.clone());
            match bearer_token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })
        .await
        .map(|_| ())
    }

    /// Send a request with rate limiting and retries. `build` is called once per attempt.
    pub async fn send_with_retries<F>(&self, build: F) -> AppResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let attempts = self.retry_policy.max_retries + 1;

        for attempt in 0..attempts {
            self.rate_limiter.until_ready().await;
            let is_last = attempt + 1 == attempts;

            match build(&self.client).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().as_u16() == 429 => {
                    if is_last {
                        return Err(AppError::RateLimitError(format!(
                            "{} rate limit exceeded after {} attempts",
                            self.service_name, attempts
                        )));
                    }
                    let info = RateLimitInfo::from_headers(response.headers());
                    let delay = self
                        .retry_policy
                        .calculate_delay(attempt, info.recommended_delay());
                    log::warn!(
                        "{} rate limited (attempt {}/{}). Waiting {:?} before retry.",
                        self.service_name,
                        attempt + 1,
                        attempts,
                        delay
                    );
                    sleep(delay).await;
                }
                Ok(response) => {
                    let status = response.status();
                    let error_msg = format!("{} returned error: {}", self.service_name, status);
                    if status.is_server_error() && !is_last {
                        let delay = self.retry_policy.calculate_delay(attempt, None);
                        log::warn!(
                            "{} (attempt {}/{}). Retrying in {:?}",
                            error_msg,
                            attempt + 1,
                            attempts,
                            delay
                        );
                        sleep(delay).await;
                    } else if status.as_u16() == 404 {
                        return Err(AppError::NotFound(error_msg));
                    } else {
                        return Err(AppError::ApiError(error_msg));
                    }
                }
                Err(e) => {
                    if is_retryable_error(&e) && !is_last {
                        let delay = self.retry_policy.calculate_delay(attempt, None);
                        log::warn!(
                            "{} request failed (attempt {}/{}): {}. Retrying in {:?}",
                            self.service_name,
                            attempt + 1,
                            attempts,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    } else {
                        return Err(AppError::from(e));
                    }
                }
            }
        }

        Err(AppError::ExternalServiceError(format!(
            "{} request failed after {} attempts",
            self.service_name, attempts
        )))
    }

    async fn parse_response<T>(&self, response: Response) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response_text = response.text().await.map_err(|e| {
            AppError::SerializationError(format!(
                "Failed to read {} response: {}",
                self.service_name, e
            ))
        })?;

        serde_json::from_str(&response_text).map_err(|e| {
            let excerpt: String = response_text.chars().take(200).collect();
            AppError::SerializationError(format!(
                "Failed to parse {} response: {}. Response: {}",
                self.service_name, e, excerpt
            ))
        })
    }

    /// Check if a request can be made now (for testing/debugging)
    pub fn can_make_request_now(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
