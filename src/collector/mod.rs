//! 업스트림 메트릭 수집 모듈
//!
//! 로컬 메트릭 데몬에서 JSON 스냅샷을 가져와 파싱합니다.
//!
//! # Example
//!
//! ```ignore
//! use metrics_relay::collector::MetricsClient;
//!
//! let client = MetricsClient::new("http://localhost:5555/metrics", 5000)?;
//! let snapshot = client.fetch_snapshot().await?;
//! ```

mod client;
mod parser;

pub use client::MetricsClient;
pub use parser::{
    parse_snapshot, synthesized, Categories, CollectResult, MetricRecord, RecordExt, Snapshot,
};
