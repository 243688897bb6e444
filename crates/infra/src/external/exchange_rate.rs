//! HTTP exchange-rate provider.
//!
//! Fetches the rate payload with a per-request timeout and retries
//! connection errors, timeouts and `500/502/504` responses with exponential
//! backoff. Any other non-success status fails at once.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::instrument;

use stockflow_pricing::{ExchangeRateProvider, RateError, parse_rate};

use crate::config::ExchangeRateConfig;
use crate::retry::{IsTransient, retry_on_transient};

const RETRY_STATUSES: [StatusCode; 3] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::GATEWAY_TIMEOUT,
];

/// One failed attempt, tagged with whether another one may help.
#[derive(Debug)]
struct Attempt {
    error: RateError,
    retryable: bool,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl IsTransient for Attempt {
    fn is_transient(&self) -> bool {
        self.retryable
    }
}

impl Attempt {
    fn permanent(error: RateError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpExchangeRateProvider {
    client: reqwest::Client,
    config: ExchangeRateConfig,
}

impl HttpExchangeRateProvider {
    pub fn new(config: ExchangeRateConfig) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RateError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn attempt(&self) -> Result<f64, Attempt> {
        let response = self.client.get(&self.config.url).send().await.map_err(|e| Attempt {
            retryable: e.is_timeout() || e.is_connect() || e.is_request(),
            error: RateError::Unavailable(e.to_string()),
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Attempt {
                error: RateError::Unavailable(format!("rate service answered {status}")),
                retryable: RETRY_STATUSES.contains(&status),
            });
        }

        let body = response.bytes().await.map_err(|e| Attempt {
            retryable: e.is_timeout(),
            error: RateError::Unavailable(e.to_string()),
        })?;

        parse_rate(&body, &self.config.entry).map_err(Attempt::permanent)
    }
}

#[async_trait]
impl ExchangeRateProvider for HttpExchangeRateProvider {
    #[instrument(skip(self), fields(url = %self.config.url, entry = %self.config.entry), err)]
    async fn fetch_rate(&self) -> Result<f64, RateError> {
        retry_on_transient(&self.config.retry, |_| self.attempt())
            .await
            .map_err(|attempt| attempt.error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;

    use super::*;
    use crate::retry::RetryConfig;

    const PAYLOAD: &str = r#"[
        {"casa": {"nombre": "Dolar Oficial", "compra": "95,00"}},
        {"casa": {"nombre": "Dolar Blue", "compra": "150,50"}}
    ]"#;

    /// Serves `failures` responses with `status`, then the payload.
    async fn spawn_rate_server(failures: u32, status: AxumStatus) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let app = Router::new()
            .route(
                "/rates",
                get(
                    move |State(hits): State<Arc<AtomicU32>>| async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        if n < failures {
                            (status, String::new())
                        } else {
                            (AxumStatus::OK, PAYLOAD.to_string())
                        }
                    },
                ),
            )
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/rates"), hits)
    }

    fn config(url: String) -> ExchangeRateConfig {
        ExchangeRateConfig {
            url,
            entry: "Dolar Blue".to_string(),
            timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 3,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                multiplier: 2.0,
            },
        }
    }

    #[tokio::test]
    async fn fetches_the_configured_entry() {
        let (url, hits) = spawn_rate_server(0, AxumStatus::OK).await;
        let provider = HttpExchangeRateProvider::new(config(url)).unwrap();
        assert_eq!(provider.fetch_rate().await.unwrap(), 150.5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_gateway_errors() {
        let (url, hits) = spawn_rate_server(2, AxumStatus::BAD_GATEWAY).await;
        let provider = HttpExchangeRateProvider::new(config(url)).unwrap();
        assert_eq!(provider.fetch_rate().await.unwrap(), 150.5);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let (url, hits) = spawn_rate_server(100, AxumStatus::INTERNAL_SERVER_ERROR).await;
        let provider = HttpExchangeRateProvider::new(config(url)).unwrap();
        assert!(matches!(
            provider.fetch_rate().await,
            Err(RateError::Unavailable(_))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn other_statuses_are_not_retried() {
        let (url, hits) = spawn_rate_server(100, AxumStatus::NOT_FOUND).await;
        let provider = HttpExchangeRateProvider::new(config(url)).unwrap();
        assert!(provider.fetch_rate().await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn payload_errors_are_not_retried() {
        // An empty 200 body is not a rate list.
        let (url, hits) = spawn_rate_server(100, AxumStatus::OK).await;
        let provider = HttpExchangeRateProvider::new(config(url)).unwrap();
        assert!(matches!(provider.fetch_rate().await, Err(RateError::Malformed)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let (url, hits) = spawn_rate_server(0, AxumStatus::OK).await;
        let mut cfg = config(url);
        cfg.entry = "Dolar Tarjeta".to_string();
        let provider = HttpExchangeRateProvider::new(cfg).unwrap();
        assert!(matches!(provider.fetch_rate().await, Err(RateError::NotFound)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let mut cfg = config("http://127.0.0.1:9/rates".to_string());
        cfg.retry.max_retries = 1;
        let provider = HttpExchangeRateProvider::new(cfg).unwrap();
        assert!(matches!(
            provider.fetch_rate().await,
            Err(RateError::Unavailable(_))
        ));
    }
}
