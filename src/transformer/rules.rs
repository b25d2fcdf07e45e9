//! Raw metric key classification
//!
//! Every raw key from the upstream snapshot is parsed once into a
//! [`KeyClass`]; the engine then dispatches on the variant instead of
//! re-matching strings at every step.
//!
//! # Example
//!
//! ```ignore
//! use metrics_relay::transformer::rules::{classify, ClusterKind, KeyClass};
//!
//! assert_eq!(
//!     classify("[4] E0-cluster total"),
//!     KeyClass::RawClusterTotal { kind: ClusterKind::Efficiency, cores: 4, index: 0 },
//! );
//! assert_eq!(classify("cluster CPU 3"), KeyClass::RawPerCore);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// `[<cores>] E<n>-cluster total` / `[<cores>] P<n>-cluster total`
static CLUSTER_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+)\]\s+([EP])(\d+)-cluster\s+total").expect("cluster total pattern is valid")
});

/// `cluster CPU <n>`
static PER_CORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cluster CPU \d+").expect("per-core pattern is valid"));

const MOCK_PREFIX: &str = "mock";
const POWER_SUFFIX: &str = " power";
const TOTAL_POWER: &str = "total power";

/// Processor cluster family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterKind {
    /// Efficiency cores
    Efficiency,
    /// Performance cores
    Performance,
}

impl ClusterKind {
    /// Output key of the aggregated cluster utilization
    pub fn output_key(&self) -> &'static str {
        match self {
            ClusterKind::Efficiency => "E-CPU %",
            ClusterKind::Performance => "P-CPU %",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "E" => Some(ClusterKind::Efficiency),
            "P" => Some(ClusterKind::Performance),
            _ => None,
        }
    }
}

/// Raw memory keys held back for derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RamKind {
    /// `RAM used`
    Used,
    /// `RAM used %`
    UsedPercent,
    /// `RAM wired`
    Wired,
    /// `swap used`
    SwapUsed,
}

impl RamKind {
    /// Raw upstream key
    pub fn raw_key(&self) -> &'static str {
        match self {
            RamKind::Used => "RAM used",
            RamKind::UsedPercent => "RAM used %",
            RamKind::Wired => "RAM wired",
            RamKind::SwapUsed => "swap used",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        [
            RamKind::Used,
            RamKind::UsedPercent,
            RamKind::Wired,
            RamKind::SwapUsed,
        ]
        .into_iter()
        .find(|kind| kind.raw_key() == key)
    }
}

/// Classification of a raw metric key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass<'a> {
    /// Individual core utilization (`cluster CPU <n>`), dropped
    RawPerCore,
    /// Mock/test key (`mock...`), dropped
    MockKey,
    /// Per-cluster total, consumed by aggregation
    RawClusterTotal {
        kind: ClusterKind,
        cores: u32,
        index: u32,
    },
    /// Component power breakdown (`* power` except `total power`), dropped
    ComponentPower,
    /// Memory input for derived percentages
    RamRaw(RamKind),
    /// Anything else
    Plain(&'a str),
}

impl KeyClass<'_> {
    /// Whether the key is removed without contributing to any output
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            KeyClass::RawPerCore | KeyClass::MockKey | KeyClass::ComponentPower
        )
    }
}

/// Classify a raw metric key
pub fn classify(key: &str) -> KeyClass<'_> {
    if let Some(kind) = RamKind::from_key(key) {
        return KeyClass::RamRaw(kind);
    }

    if let Some(caps) = CLUSTER_TOTAL.captures(key) {
        if let Some(kind) = ClusterKind::from_tag(&caps[2]) {
            // Digit runs too long for u32 still classify; the numbers are informational.
            return KeyClass::RawClusterTotal {
                kind,
                cores: caps[1].parse().unwrap_or(u32::MAX),
                index: caps[3].parse().unwrap_or(u32::MAX),
            };
        }
    }

    if PER_CORE.is_match(key) {
        return KeyClass::RawPerCore;
    }

    if key.starts_with(MOCK_PREFIX) {
        return KeyClass::MockKey;
    }

    if key.ends_with(POWER_SUFFIX) && key != TOTAL_POWER {
        return KeyClass::ComponentPower;
    }

    KeyClass::Plain(key)
}

/// Renamed passthrough: `(raw key, output key)`
pub type Rename = (&'static str, &'static str);

/// Compute group renames, emitted after the cluster aggregates
pub const COMPUTE_RENAMES: &[Rename] = &[("GPU util %", "GPU %"), ("ANE util %", "ANE %")];

/// IO group renames
pub const IO_RENAMES: &[Rename] = &[
    ("network rx", "Network RX"),
    ("network tx", "Network TX"),
    ("disk read", "Disk Read"),
    ("disk write", "Disk Write"),
];

/// Power group renames
pub const POWER_RENAMES: &[Rename] = &[(TOTAL_POWER, "Power")];

/// Keys containing any of these never reach the remainder passthrough
pub const CURATED_FRAGMENTS: &[&str] = &["GPU util", "ANE util", "network", "disk", TOTAL_POWER];

/// Whether a surviving key belongs to the curated groups
pub fn is_curated(key: &str) -> bool {
    CURATED_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}
