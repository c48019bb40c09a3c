use crate::utils::error::{BridgeError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt_index` 次失敗後的等待時間：`base_delay * 2^attempt_index`
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt_index);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 具逾時與指數退避重試的 HTTP 客戶端，可在多個呼叫端之間共用
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: Client,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_client(Client::new(), policy)
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn fetch_with_retry(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let attempts = self.policy.max_retries.max(1);

        for attempt in 0..attempts {
            match self.attempt(request, attempt).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            "✅ {} {} succeeded on attempt {}/{}",
                            request.method,
                            request.url,
                            attempt + 1,
                            attempts
                        );
                    }
                    return Ok(response);
                }
                Err(err) => {
                    let is_last = attempt + 1 == attempts;
                    tracing::warn!(
                        "⚠️ Attempt {}/{} for {} {} failed: {}",
                        attempt + 1,
                        attempts,
                        request.method,
                        request.url,
                        err
                    );

                    // 4xx 與非網路錯誤不重試
                    if is_last || !err.is_retryable() {
                        return Err(err);
                    }

                    let delay = self.policy.backoff_delay(attempt);
                    tracing::debug!("⏳ Retrying {} in {:?}", request.url, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(BridgeError::MaxRetriesExceeded)
    }

    async fn attempt(&self, request: &UpstreamRequest, attempt: u32) -> Result<UpstreamResponse> {
        let timeout = self.policy.attempt_timeout;

        let exchange = async {
            let mut builder = self
                .client
                .request(request.method.clone(), &request.url)
                .headers(request.headers.clone());
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, BridgeError>((status, headers, body))
        };

        let (status, headers, body) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| BridgeError::Timeout {
                attempt: attempt + 1,
                timeout_ms: timeout.as_millis() as u64,
            })??;

        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(BridgeError::UpstreamStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(UpstreamResponse {
            status: status.as_u16(),
            headers,
            body: body.to_vec(),
        })
    }
}
