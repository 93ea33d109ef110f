//! Subdomain page fetching with bounded retry.
//!
//! Each subdomain is fetched over plain HTTP at its root path. Transient
//! failures (connection errors, timeouts, HTTP 503) are retried with
//! exponential backoff; every other failure is returned immediately.

use reqwest::header::HeaderMap;
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FailureKind, FetchError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_USER_AGENT: &str = concat!("scriptscout/", env!("CARGO_PKG_VERSION"));

/// How often and how patiently a fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Waits between consecutive attempts: `base * 2^n`, capped at `max_delay`.
    ///
    /// Yields `max_attempts - 1` values.
    ///
    /// # Example
    ///
    /// ```
    /// use scriptscout::fetch::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let delays: Vec<_> = RetryPolicy::default().delays().collect();
    /// assert_eq!(delays, vec![Duration::from_secs(4), Duration::from_secs(8)]);
    /// ```
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let Self {
            max_attempts,
            base_delay,
            max_delay,
        } = *self;

        (0..max_attempts.saturating_sub(1))
            .map(move |n| base_delay.saturating_mul(2u32.saturating_pow(n)).min(max_delay))
    }

    pub fn should_retry(&self, kind: FailureKind) -> bool {
        kind == FailureKind::Transient
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Builds a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: FetcherConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// Fetches `http://{subdomain}/`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first
    /// terminal error encountered.
    pub async fn fetch(&self, subdomain: &str) -> Result<Page, FetchError> {
        let url = target_url(subdomain)?;
        let mut attempt = 0u32;

        RetryIf::spawn(
            self.retry.delays(),
            || {
                attempt += 1;
                let attempt = attempt;
                let url = url.clone();
                async move {
                    debug!("GET {} (attempt {})", url, attempt);
                    self.fetch_once(url).await
                }
            },
            |err: &FetchError| {
                let retry = self.retry.should_retry(err.kind());
                if retry {
                    warn!("Transient failure for {}: {}", subdomain, err);
                }
                retry
            },
        )
        .await
    }

    async fn fetch_once(&self, url: Url) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(FetchError::ServiceUnavailable {
                url: response.url().to_string(),
            });
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&final_url, e))?;

        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

/// Builds the root URL for a bare host, e.g. `shop.example.com` -> `http://shop.example.com/`.
pub fn target_url(subdomain: &str) -> Result<Url, FetchError> {
    Url::parse(&format!("http://{}/", subdomain)).map_err(|source| FetchError::InvalidTarget {
        target: subdomain.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_fetcher(timeout: Duration) -> Fetcher {
        Fetcher::new(FetcherConfig {
            timeout,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(25),
            },
            ..FetcherConfig::default()
        })
        .unwrap()
    }

    fn host(server: &MockServer) -> String {
        server.address().to_string()
    }

    #[test]
    fn test_delays_are_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        };
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_delays() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delays().count(), 0);

        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delays().count(), 0);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(FailureKind::Transient));
        assert!(!policy.should_retry(FailureKind::Terminal));
    }

    #[test]
    fn test_target_url() {
        assert_eq!(
            target_url("shop.example.com").unwrap().as_str(),
            "http://shop.example.com/"
        );
        assert_eq!(
            target_url("127.0.0.1:8080").unwrap().as_str(),
            "http://127.0.0.1:8080/"
        );
        assert!(matches!(
            target_url("bad host"),
            Err(FetchError::InvalidTarget { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("server", "nginx")
                    .set_body_string("<script src=\"/app.js\"></script>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let page = quick_fetcher(DEFAULT_TIMEOUT)
            .fetch(&host(&server))
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<script src=\"/app.js\"></script>");
        assert_eq!(page.headers.get("server").unwrap(), "nginx");
    }

    #[tokio::test]
    async fn test_retries_service_unavailable_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = quick_fetcher(DEFAULT_TIMEOUT)
            .fetch(&host(&server))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let page = quick_fetcher(DEFAULT_TIMEOUT)
            .fetch(&host(&server))
            .await
            .unwrap();
        assert_eq!(page.body, "ok");
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        for status in [404u16, 403, 500, 502] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .expect(1)
                .mount(&server)
                .await;

            let err = quick_fetcher(DEFAULT_TIMEOUT)
                .fetch(&host(&server))
                .await
                .unwrap_err();

            assert!(
                matches!(err, FetchError::Status { status: s, .. } if s == status),
                "unexpected error for {}: {}",
                status,
                err
            );
            server.verify().await;
        }
    }

    #[tokio::test]
    async fn test_timeouts_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(3)
            .mount(&server)
            .await;

        let err = quick_fetcher(Duration::from_millis(100))
            .fetch(&host(&server))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
        assert_eq!(err.kind(), FailureKind::Transient);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = quick_fetcher(DEFAULT_TIMEOUT)
            .fetch(&addr.to_string())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Transient);
    }
}
