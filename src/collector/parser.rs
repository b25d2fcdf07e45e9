//! 메트릭 스냅샷 JSON 파서
//!
//! 업스트림 메트릭 데몬의 응답을 파싱하여 내부 데이터 구조로 변환합니다.
//! 카테고리와 메트릭 키는 문서 순서 그대로 유지됩니다 (`serde_json`의
//! `preserve_order`). 레코드는 원본 JSON 그대로 보관하므로 전달되는 값은
//! 정밀도 손실 없이 나갑니다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CollectorError;

/// Collector 작업 결과 타입
pub type CollectResult<T> = Result<T, CollectorError>;

/// 단일 메트릭 레코드 (`current_value`, `history`, 그 외 필드)
///
/// 업스트림 JSON 값을 그대로 보관합니다. 숫자 접근은 [`RecordExt`]를 사용합니다.
pub type MetricRecord = Value;

/// 카테고리 이름 -> (메트릭 키 -> 레코드) 객체
///
/// 같은 키가 다시 나오면 처음 위치를 유지하고 값만 교체합니다.
pub type Categories = Map<String, Value>;

/// 레코드의 숫자 뷰
///
/// 없거나 숫자가 아닌 값(`null` 포함)은 모두 0으로 읽습니다.
pub trait RecordExt {
    /// 현재 값
    fn current(&self) -> f64;

    /// 히스토리 길이
    fn history_len(&self) -> usize;

    /// 인덱스의 히스토리 값 (범위 밖이면 0)
    fn sample(&self, index: usize) -> f64;
}

impl RecordExt for MetricRecord {
    fn current(&self) -> f64 {
        self.get("current_value").and_then(Value::as_f64).unwrap_or(0.0)
    }

    fn history_len(&self) -> usize {
        history(self).map_or(0, Vec::len)
    }

    fn sample(&self, index: usize) -> f64 {
        history(self)
            .and_then(|samples| samples.get(index))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }
}

fn history(record: &MetricRecord) -> Option<&Vec<Value>> {
    record.get("history").and_then(Value::as_array)
}

/// 합성 레코드 생성 - `count`는 히스토리 길이
pub fn synthesized(current: f64, history: Vec<f64>) -> MetricRecord {
    let count = history.len();
    let mut record = Map::new();
    record.insert("current_value".to_string(), Value::from(current));
    record.insert("history".to_string(), Value::from(history));
    record.insert("count".to_string(), Value::from(count));
    Value::Object(record)
}

/// 업스트림 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 타임스탬프 (해석하지 않고 전달)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    /// 메타데이터 (선택, 해석하지 않고 전달)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// 카테고리별 메트릭
    pub metrics: Categories,
}

impl Snapshot {
    /// 카테고리를 제거하고 (키, 레코드)를 문서 순서대로 나열
    ///
    /// 객체가 아닌 카테고리는 건너뜁니다.
    pub fn into_records(self) -> impl Iterator<Item = (String, MetricRecord)> {
        self.metrics
            .into_iter()
            .flat_map(|(category, entries)| match entries {
                Value::Object(records) => records,
                _ => {
                    tracing::warn!(category = %category, "Skipping non-object metric category");
                    Map::new()
                }
            })
    }
}

/// 스냅샷 응답 파싱
pub fn parse_snapshot(json: &str) -> CollectResult<Snapshot> {
    serde_json::from_str(json).map_err(|e| CollectorError::JsonParse(e.to_string()))
}
