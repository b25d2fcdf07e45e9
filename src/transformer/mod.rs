//! Metric transformation module
//!
//! This module turns the raw upstream snapshot into the curated relay
//! snapshot: per-core, mock and component power keys are dropped, cluster
//! totals are averaged, memory percentages are derived and a few keys are
//! renamed.

pub mod derive;
pub mod engine;
pub mod rules;

pub use derive::{aggregate_clusters, TotalRam};
pub use engine::{MetricSet, MetricsTransformer, RelaySnapshot};
pub use rules::{classify, ClusterKind, KeyClass, RamKind};
