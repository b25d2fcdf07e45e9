//! Transform engine - raw snapshot to relay snapshot conversion
//!
//! This module provides the core transformation logic that turns the
//! category-nested upstream snapshot into the flat, curated metric map
//! served to dashboard clients.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::collector::{MetricRecord, Snapshot};

use super::derive::{aggregate_clusters, TotalRam};
use super::rules::{
    classify, is_curated, ClusterKind, KeyClass, RamKind, Rename, COMPUTE_RENAMES, IO_RENAMES,
    POWER_RENAMES,
};

/// Upper bound of a swap percentage; swap can exceed physical memory.
const SWAP_PERCENT_CAP: f64 = 100.0;

/// Ordered output metric map with unique keys
///
/// Keys are emitted in the order the engine produces them. A second
/// emission for an existing key is rejected and logged; the first record
/// stays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSet(Map<String, Value>);

impl MetricSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a metric
    ///
    /// Returns `false` (and keeps the existing record) when `key` was already emitted.
    pub fn emit(&mut self, key: impl Into<String>, record: MetricRecord) -> bool {
        let key = key.into();
        if self.0.contains_key(&key) {
            tracing::warn!(key = %key, "Duplicate output metric key, keeping first emission");
            return false;
        }
        self.0.insert(key, record);
        true
    }

    /// Look up an emitted metric
    pub fn get(&self, key: &str) -> Option<&MetricRecord> {
        self.0.get(key)
    }

    /// Whether a key was emitted
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Emitted keys, in output order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Snapshot served to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelaySnapshot {
    /// Upstream timestamp, forwarded as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    /// Upstream metadata, forwarded as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Curated flat metrics
    pub metrics: MetricSet,
}

/// Raw inputs gathered in the single pass over the snapshot
///
/// Keyed groups keep the first position and the last record of a repeated key.
#[derive(Default)]
struct Collected {
    efficiency: Map<String, Value>,
    performance: Map<String, Value>,
    ram_used: Option<MetricRecord>,
    ram_used_percent: Option<MetricRecord>,
    ram_wired: Option<MetricRecord>,
    swap_used: Option<MetricRecord>,
    survivors: Map<String, Value>,
    dropped: usize,
}

impl Collected {
    fn absorb(mut self, key: String, record: MetricRecord) -> Self {
        match classify(&key) {
            KeyClass::RawClusterTotal { kind, cores, index } => {
                tracing::trace!(key = %key, ?kind, cores, index, "Collected cluster total");
                let group = match kind {
                    ClusterKind::Efficiency => &mut self.efficiency,
                    ClusterKind::Performance => &mut self.performance,
                };
                group.insert(key, record);
            }
            KeyClass::RamRaw(kind) => {
                let slot = match kind {
                    RamKind::Used => &mut self.ram_used,
                    RamKind::UsedPercent => &mut self.ram_used_percent,
                    RamKind::Wired => &mut self.ram_wired,
                    RamKind::SwapUsed => &mut self.swap_used,
                };
                *slot = Some(record);
            }
            class if class.is_dropped() => {
                tracing::trace!(key = %key, ?class, "Dropped metric");
                self.dropped += 1;
            }
            _ => {
                self.survivors.insert(key, record);
            }
        }
        self
    }
}

/// Metrics transformer
///
/// Stateless: one instance can be shared across concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTransformer;

impl MetricsTransformer {
    /// Create a new transformer
    pub fn new() -> Self {
        Self
    }

    /// Transform an upstream snapshot into the relay snapshot
    ///
    /// Output order: compute group (`E-CPU %`, `P-CPU %`, `GPU %`, `ANE %`),
    /// memory group (`RAM used %`, `RAM wired %`, `Swap %`), IO group,
    /// `Power`, then every remaining metric in input order.
    pub fn transform(&self, mut snapshot: Snapshot) -> RelaySnapshot {
        let timestamp = snapshot.timestamp.take();
        let metadata = snapshot.metadata.take();

        let mut collected = snapshot
            .into_records()
            .fold(Collected::default(), |acc, (key, record)| acc.absorb(key, record));

        let mut out = MetricSet::new();

        // Compute group
        for (kind, group) in [
            (ClusterKind::Efficiency, &collected.efficiency),
            (ClusterKind::Performance, &collected.performance),
        ] {
            if let Some(record) = aggregate_clusters(group.values()) {
                out.emit(kind.output_key(), record);
            }
        }
        emit_renamed(&mut out, &collected.survivors, COMPUTE_RENAMES);

        // Memory group
        if let (Some(used), Some(used_percent), Some(wired)) = (
            collected.ram_used.as_ref(),
            collected.ram_used_percent.take(),
            collected.ram_wired.as_ref(),
        ) {
            let total = TotalRam::derive(used, &used_percent);
            out.emit(RamKind::UsedPercent.raw_key(), used_percent);
            out.emit("RAM wired %", total.percent_of(wired, None));
            if let Some(swap) = collected.swap_used.as_ref() {
                out.emit("Swap %", total.percent_of(swap, Some(SWAP_PERCENT_CAP)));
            }
        }

        // IO and power groups
        emit_renamed(&mut out, &collected.survivors, IO_RENAMES);
        emit_renamed(&mut out, &collected.survivors, POWER_RENAMES);

        // Remainder
        for (key, record) in collected.survivors {
            if !is_curated(&key) {
                out.emit(key, record);
            }
        }

        tracing::debug!(
            emitted = out.len(),
            dropped = collected.dropped,
            e_clusters = collected.efficiency.len(),
            p_clusters = collected.performance.len(),
            "Snapshot transformed"
        );

        RelaySnapshot {
            timestamp,
            metadata,
            metrics: out,
        }
    }
}

fn emit_renamed(out: &mut MetricSet, survivors: &Map<String, Value>, renames: &[Rename]) {
    for (raw, renamed) in renames {
        if let Some(record) = survivors.get(*raw) {
            out.emit(*renamed, record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{parse_snapshot, RecordExt};
    use serde_json::json;

    fn snapshot(value: Value) -> Snapshot {
        parse_snapshot(&value.to_string()).expect("valid snapshot")
    }

    fn record(current: f64, history: &[f64]) -> Value {
        json!({ "current_value": current, "history": history })
    }

    fn series(record: &MetricRecord) -> Vec<f64> {
        (0..record.history_len()).map(|i| record.sample(i)).collect()
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_passthrough_unchanged() {
        let temperature = json!({ "current_value": 42.5, "history": [40, 41], "unit": "C" });
        let input = snapshot(json!({
            "timestamp": 1700000000,
            "metrics": { "thermal": { "temperature": temperature.clone() } }
        }));

        let output = MetricsTransformer::new().transform(input);
        assert_eq!(output.metrics.get("temperature"), Some(&temperature));
        assert_eq!(output.timestamp, Some(json!(1700000000)));
    }

    #[test]
    fn test_passthrough_keeps_number_representation() {
        let input = parse_snapshot(
            r#"{"metrics": {"io": {
                "bytes": {"current_value": 18446744073709551615, "history": [40, 41, null]}
            }}}"#,
        )
        .unwrap();

        let output = MetricsTransformer::new().transform(input);
        let text = serde_json::to_string(&output).unwrap();
        assert_eq!(
            text,
            r#"{"metrics":{"bytes":{"current_value":18446744073709551615,"history":[40,41,null]}}}"#
        );
    }

    #[test]
    fn test_excluded_keys_absent() {
        let input = snapshot(json!({
            "metrics": {
                "cpu": {
                    "cluster CPU 0": record(1.0, &[1.0]),
                    "E0-cluster CPU 3": record(1.0, &[1.0]),
                    "mock.test.value.count": record(1.0, &[1.0]),
                    "mock": record(1.0, &[1.0]),
                    "CPU power": record(1.0, &[1.0]),
                    "RAM wired": record(1.0, &[1.0]),
                    "swap used": record(1.0, &[1.0]),
                    "kept": record(1.0, &[1.0])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        let keys: Vec<&str> = output.metrics.keys().collect();
        assert_eq!(keys, vec!["kept"]);
    }

    #[test]
    fn test_cluster_aggregation() {
        let input = snapshot(json!({
            "metrics": {
                "cpu": {
                    "[4] E0-cluster total": record(10.0, &[1.0, 2.0, 3.0]),
                    "[4] E1-cluster total": record(20.0, &[4.0, 5.0, 6.0]),
                    "[6] P0-cluster total": record(50.0, &[50.0, 50.0, 50.0])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        let e_cpu = output.metrics.get("E-CPU %").unwrap();
        assert!(approx_eq(e_cpu.current(), 15.0));
        assert_eq!(series(e_cpu), vec![2.5, 3.5, 4.5]);
        assert_eq!(e_cpu["count"], json!(3));

        let p_cpu = output.metrics.get("P-CPU %").unwrap();
        assert!(approx_eq(p_cpu.current(), 50.0));
        assert!(!output.metrics.keys().any(|k| k.contains("cluster total")));
    }

    #[test]
    fn test_empty_cluster_group_not_emitted() {
        let input = snapshot(json!({
            "metrics": { "cpu": { "[6] P0-cluster total": record(50.0, &[50.0]) } }
        }));

        let output = MetricsTransformer::new().transform(input);
        assert!(!output.metrics.contains_key("E-CPU %"));
        assert!(output.metrics.contains_key("P-CPU %"));
    }

    #[test]
    fn test_memory_derivation() {
        let input = snapshot(json!({
            "metrics": {
                "memory": {
                    "RAM used": record(50.0, &[50.0]),
                    "RAM used %": record(25.0, &[25.0]),
                    "RAM wired": record(20.0, &[20.0]),
                    "swap used": record(300.0, &[300.0])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        let keys: Vec<&str> = output.metrics.keys().collect();
        assert_eq!(keys, vec!["RAM used %", "RAM wired %", "Swap %"]);

        let used_pct = output.metrics.get("RAM used %").unwrap();
        assert!(used_pct.get("count").is_none());
        assert!(approx_eq(used_pct.current(), 25.0));

        let wired = output.metrics.get("RAM wired %").unwrap();
        assert!(approx_eq(wired.current(), 10.0));
        assert_eq!(wired["count"], json!(1));

        let swap = output.metrics.get("Swap %").unwrap();
        assert!(approx_eq(swap.current(), 100.0));
        assert!(approx_eq(swap.sample(0), 100.0));
    }

    #[test]
    fn test_null_samples_in_derived_inputs() {
        let input = snapshot(json!({
            "metrics": {
                "cpu": {
                    "[4] E0-cluster total": { "current_value": 10, "history": [2, null, 6] },
                    "[4] E1-cluster total": { "current_value": 20, "history": [4, 8, null] }
                },
                "memory": {
                    "RAM used": { "current_value": 50, "history": [50, null] },
                    "RAM used %": { "current_value": 25, "history": [25, 25] },
                    "RAM wired": { "current_value": 20, "history": [null, 20] }
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);

        let e_cpu = output.metrics.get("E-CPU %").unwrap();
        assert!(approx_eq(e_cpu.current(), 15.0));
        assert_eq!(series(e_cpu), vec![3.0, 4.0, 3.0]);

        // total: [200, 0]; a zero total yields 0
        let wired = output.metrics.get("RAM wired %").unwrap();
        assert!(approx_eq(wired.current(), 10.0));
        assert_eq!(series(wired), vec![0.0, 0.0]);
    }

    #[test]
    fn test_memory_requires_all_three_inputs() {
        let input = snapshot(json!({
            "metrics": {
                "memory": {
                    "RAM used %": record(25.0, &[25.0]),
                    "RAM wired": record(20.0, &[20.0]),
                    "swap used": record(300.0, &[300.0])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        assert!(output.metrics.is_empty());
    }

    #[test]
    fn test_swap_omitted_without_raw_swap() {
        let input = snapshot(json!({
            "metrics": {
                "memory": {
                    "RAM used": record(50.0, &[50.0]),
                    "RAM used %": record(25.0, &[25.0]),
                    "RAM wired": record(20.0, &[20.0])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        assert!(output.metrics.contains_key("RAM wired %"));
        assert!(!output.metrics.contains_key("Swap %"));
    }

    #[test]
    fn test_repeated_key_across_categories() {
        let input = snapshot(json!({
            "metrics": {
                "first": {
                    "fan": record(1.0, &[]),
                    "[4] E0-cluster total": record(10.0, &[10.0]),
                    "RAM used": record(999.0, &[999.0]),
                    "temp": record(2.0, &[])
                },
                "second": {
                    "[4] E1-cluster total": record(30.0, &[30.0]),
                    "fan": record(5.0, &[]),
                    "[4] E0-cluster total": record(50.0, &[50.0]),
                    "RAM used": record(50.0, &[50.0]),
                    "RAM used %": record(25.0, &[25.0]),
                    "RAM wired": record(20.0, &[20.0])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);

        // survivors: first position, last value
        let keys: Vec<&str> = output.metrics.keys().collect();
        assert_eq!(keys, vec!["E-CPU %", "RAM used %", "RAM wired %", "fan", "temp"]);
        assert!(approx_eq(output.metrics.get("fan").unwrap().current(), 5.0));

        // E0 counted once, with its later record: (50 + 30) / 2
        let e_cpu = output.metrics.get("E-CPU %").unwrap();
        assert!(approx_eq(e_cpu.current(), 40.0));
        assert_eq!(series(e_cpu), vec![40.0]);

        // RAM used is the later record: total 200, wired 10 %
        let wired = output.metrics.get("RAM wired %").unwrap();
        assert!(approx_eq(wired.current(), 10.0));
    }

    #[test]
    fn test_curated_renames_and_output_order() {
        let input = snapshot(json!({
            "metadata": { "host": "studio" },
            "metrics": {
                "misc": { "uptime": record(1.0, &[]) },
                "power": { "total power": record(12.0, &[]), "GPU power": record(3.0, &[]) },
                "io": {
                    "disk write": record(4.0, &[]),
                    "network tx": record(2.0, &[]),
                    "disk read": record(3.0, &[]),
                    "network rx": record(1.0, &[]),
                    "network errors": record(0.0, &[])
                },
                "memory": {
                    "RAM used": record(50.0, &[]),
                    "RAM used %": record(25.0, &[]),
                    "RAM wired": record(20.0, &[])
                },
                "gpu": { "ANE util %": record(5.0, &[]), "GPU util %": record(30.0, &[]) },
                "cpu": { "[4] E0-cluster total": record(10.0, &[]) }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        let keys: Vec<&str> = output.metrics.keys().collect();
        assert_eq!(
            keys,
            vec![
                "E-CPU %",
                "GPU %",
                "ANE %",
                "RAM used %",
                "RAM wired %",
                "Network RX",
                "Network TX",
                "Disk Read",
                "Disk Write",
                "Power",
                "uptime",
            ]
        );
        assert_eq!(output.metadata, Some(json!({ "host": "studio" })));
        assert!(approx_eq(output.metrics.get("Power").unwrap().current(), 12.0));
    }

    #[test]
    fn test_remainder_collision_keeps_first_emission() {
        let input = snapshot(json!({
            "metrics": {
                "cpu": {
                    "[4] E0-cluster total": record(10.0, &[]),
                    "E-CPU %": record(99.0, &[])
                }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        assert_eq!(output.metrics.len(), 1);
        assert!(approx_eq(output.metrics.get("E-CPU %").unwrap().current(), 10.0));
    }

    #[test]
    fn test_metric_set_rejects_duplicates() {
        let mut set = MetricSet::new();
        assert!(set.emit("a", record(1.0, &[])));
        assert!(!set.emit("a", record(2.0, &[])));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").unwrap().current(), 1.0);
    }

    #[test]
    fn test_serialized_key_order() {
        let input = snapshot(json!({
            "timestamp": "t",
            "metrics": {
                "a": { "zeta": record(1.0, &[]), "total power": record(2.0, &[]) }
            }
        }));

        let output = MetricsTransformer::new().transform(input);
        let text = serde_json::to_string(&output).unwrap();
        let power = text.find("\"Power\"").unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        assert!(power < zeta, "{}", text);
        assert!(!text.contains("metadata"));
    }
}
