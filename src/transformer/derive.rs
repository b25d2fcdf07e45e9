//! Synthesized metrics
//!
//! Cluster utilization averages and memory percentages computed from
//! several raw records. Every function here produces a record with `count`
//! set to the length of the history it builds.

use crate::collector::{synthesized, MetricRecord, RecordExt};

/// Average a group of cluster records index by index
///
/// The history length is taken from the first member; members with a
/// shorter history contribute `0` for the missing samples.
/// Returns `None` for an empty group.
pub fn aggregate_clusters<'a, I>(members: I) -> Option<MetricRecord>
where
    I: IntoIterator<Item = &'a MetricRecord>,
{
    let members: Vec<&MetricRecord> = members.into_iter().collect();
    let first = members.first()?;
    let divisor = members.len() as f64;

    let history = (0..first.history_len())
        .map(|i| members.iter().map(|m| m.sample(i)).sum::<f64>() / divisor)
        .collect();
    let current = members.iter().map(|m| m.current()).sum::<f64>() / divisor;

    Some(synthesized(current, history))
}

/// Total physical memory, reconstructed from used bytes and used percentage
///
/// Not emitted; only used as the denominator of other memory percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalRam {
    /// Total at the current sample
    pub current: f64,
    /// Total per history index (follows the `RAM used` history length)
    pub history: Vec<f64>,
}

impl TotalRam {
    /// `total = used / (percent / 100)`, or `0` when the percentage is not positive
    pub fn derive(used: &MetricRecord, used_percent: &MetricRecord) -> Self {
        let history = (0..used.history_len())
            .map(|i| total_from(used.sample(i), used_percent.sample(i)))
            .collect();

        Self {
            current: total_from(used.current(), used_percent.current()),
            history,
        }
    }

    /// Express `part` as a percentage of this total
    ///
    /// Indices where the total is not positive yield `0`. When `cap` is set,
    /// results are clamped to it from above.
    pub fn percent_of(&self, part: &MetricRecord, cap: Option<f64>) -> MetricRecord {
        let total_at = |i: usize| self.history.get(i).copied().unwrap_or(0.0);

        let history = (0..part.history_len())
            .map(|i| percent(part.sample(i), total_at(i), cap))
            .collect();
        let current = percent(part.current(), self.current, cap);

        synthesized(current, history)
    }
}

fn total_from(used: f64, used_percent: f64) -> f64 {
    if used_percent > 0.0 {
        used / (used_percent / 100.0)
    } else {
        0.0
    }
}

fn percent(part: f64, total: f64, cap: Option<f64>) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let value = (part / total) * 100.0;
    match cap {
        Some(max) => value.min(max),
        None => value,
    }
}
