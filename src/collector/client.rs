//! 메트릭 데몬 HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.
//! 요청당 한 번만 조회하며 재시도하지 않습니다.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument};

use super::parser::{parse_snapshot, CollectResult, Snapshot};
use crate::error::CollectorError;

/// 업스트림 메트릭 데몬 클라이언트
#[derive(Clone)]
pub struct MetricsClient {
    client: Client,
    url: String,
    timeout_ms: u64,
}

impl MetricsClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `url` - 스냅샷 엔드포인트 URL (예: "http://localhost:5555/metrics")
    /// * `timeout_ms` - 요청 타임아웃 (밀리초)
    ///
    /// # Example
    /// ```ignore
    /// let client = MetricsClient::new("http://localhost:5555/metrics", 5000)?;
    /// ```
    pub fn new(url: &str, timeout_ms: u64) -> CollectResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(CollectorError::HttpClientInit)?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout_ms,
        })
    }

    /// 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 스냅샷 한 건 조회
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_snapshot(&self) -> CollectResult<Snapshot> {
        debug!("Fetching metrics snapshot");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;

        debug!(bytes = body.len(), "Snapshot received");

        parse_snapshot(&body)
    }

    fn classify(&self, err: reqwest::Error) -> CollectorError {
        if err.is_timeout() {
            CollectorError::timeout_with_duration(self.timeout_ms)
        } else {
            CollectorError::from(err)
        }
    }
}
