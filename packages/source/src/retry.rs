//! HTTP retry helpers for transient errors.
//!
//! The crime endpoint is fetched once per session, so a failed fetch would
//! leave the crime overlay empty until the next start. [`send_json`] retries
//! transient failures (timeouts, connection resets, server errors, rate
//! limiting) with exponential backoff according to a [`RetryPolicy`].
//!
//! ```ignore
//! let records: Vec<CrimeRecord> =
//!     retry::send_json(&policy, || client.get(&url)).await?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::SourceError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times, and how patiently, to retry a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that sends each request exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX))
    }
}

impl Default for RetryPolicy {
    /// Two retries, 1s then 2s.
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Sends an HTTP request and deserializes the JSON response body.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (since builders are consumed by
/// `.send()`).
///
/// Connection errors, timeouts, HTTP 429 and HTTP 5xx are retried. HTTP
/// 4xx (except 429) is permanent. A body that cannot be read, or that ends
/// before the JSON value does, is re-fetched. A complete body that is not
/// valid JSON or does not match `T` is returned as an error at once. All
/// of these share the single `policy.max_retries` budget.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body cannot be
/// decoded.
#[allow(clippy::future_not_send)]
pub async fn send_json<T, F>(policy: &RetryPolicy, build_request: F) -> Result<T, SourceError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let response = send_inner(policy, &build_request, &mut attempt).await?;
        let url = response.url().to_string();
        let status = response.status();

        let error = match response.text().await {
            Ok(text) => match serde_json::from_str::<T>(&text) {
                Ok(value) => return Ok(value),
                Err(json_err) => {
                    let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
                    log::warn!(
                        "JSON parse failed\n  \
                         url: {url}\n  \
                         status: {status}\n  \
                         received: {} bytes\n  \
                         parse error: {json_err}\n  \
                         body preview: {preview}",
                        text.len(),
                    );
                    if json_err.classify() != Category::Eof {
                        return Err(SourceError::Json(json_err));
                    }
                    SourceError::Json(json_err)
                }
            },
            Err(e) => {
                log::warn!("Response body read failed\n  url: {url}\n  status: {status}\n  error: {e}");
                SourceError::Http(e)
            }
        };

        if attempt >= policy.max_retries {
            return Err(error);
        }
        attempt += 1;
    }
}

/// Core retry loop: sends the request built by `build_request`, retrying
/// transient errors. Returns the successful [`reqwest::Response`].
///
/// `attempt` counts retries already spent; a non-zero value on entry
/// waits out the backoff before sending.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    policy: &RetryPolicy,
    build_request: &F,
    attempt: &mut u32,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.max_retries;

    loop {
        if *attempt > 0 {
            let delay = policy.delay(*attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && *attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    *attempt += 1;
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if *attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        *attempt += 1;
                        continue;
                    }
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                    });
                }

                // 4xx other than 429 is permanent.
                if status.is_client_error() {
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use region_map_crime_models::CrimeRecord;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves `responses` in order (repeating the last one) on a local port
    /// and counts the requests received.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/crimes/all", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buf[..read]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, hits)
    }

    const fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy {
            max_retries: 100,
            base_delay: Duration::from_secs(1),
        };
        assert!(policy.delay(64) >= policy.delay(10));
    }

    #[test]
    fn none_policy_never_retries() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.delay(1), Duration::ZERO);
    }

    #[tokio::test]
    async fn schema_mismatch_is_not_refetched() {
        let (url, hits) = serve(vec![(
            200,
            r#"[{"region":"a","total":5,"lastUpdated":"2024-01-15T10:00:00Z"}]"#,
        )])
        .await;
        let client = reqwest::Client::new();

        let result: Result<Vec<CrimeRecord>, _> =
            send_json(&fast_policy(), || client.get(&url)).await;

        assert!(matches!(result, Err(SourceError::Json(ref e)) if e.classify() == Category::Data));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_not_refetched() {
        let (url, hits) = serve(vec![(200, "[{]")]).await;
        let client = reqwest::Client::new();

        let result: Result<Vec<CrimeRecord>, _> =
            send_json(&fast_policy(), || client.get(&url)).await;

        assert!(matches!(result, Err(SourceError::Json(ref e)) if e.classify() == Category::Syntax));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn truncated_body_is_refetched() {
        let (url, hits) = serve(vec![
            (200, r#"[{"region":"a","#),
            (200, r#"[{"region":"a","total":5}]"#),
        ])
        .await;
        let client = reqwest::Client::new();

        let records: Vec<CrimeRecord> = send_json(&fast_policy(), || client.get(&url))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total, 5);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn status_and_body_retries_share_one_budget() {
        let (url, hits) = serve(vec![(503, ""), (200, "["), (200, "[")]).await;
        let client = reqwest::Client::new();

        let result: Result<Vec<CrimeRecord>, _> =
            send_json(&fast_policy(), || client.get(&url)).await;

        assert!(matches!(result, Err(SourceError::Json(ref e)) if e.is_eof()));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn server_error_then_success() {
        let (url, hits) = serve(vec![(500, ""), (200, "[]")]).await;
        let client = reqwest::Client::new();

        let records: Vec<CrimeRecord> = send_json(&fast_policy(), || client.get(&url))
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_error_is_permanent() {
        let (url, hits) = serve(vec![(404, "")]).await;
        let client = reqwest::Client::new();

        let result: Result<Vec<CrimeRecord>, _> =
            send_json(&fast_policy(), || client.get(&url)).await;

        assert!(matches!(result, Err(SourceError::Status { status: 404 })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
