//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - produced by any of the three source readers (store, statistics API, file)
//! - aggregated in-memory without copies of the string keys beyond grouping
//! - exported to CSV or formatted for the terminal

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One tidy record: keyed by every dimension, exactly one value column.
///
/// Immutable once produced by a source reader. `period` is always `YYYYMM`;
/// readers working from daily or yearly sources reduce to months up front.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub region: String,
    pub period: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub value: f64,
}

/// The fixed, ordered set of age buckets every in-scope age label maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBucket {
    Under15,
    From15To24,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    From65To74,
    From75,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 8] = [
        AgeBucket::Under15,
        AgeBucket::From15To24,
        AgeBucket::From25To34,
        AgeBucket::From35To44,
        AgeBucket::From45To54,
        AgeBucket::From55To64,
        AgeBucket::From65To74,
        AgeBucket::From75,
    ];

    /// Canonical bucket label used in aggregated tables and chart legends.
    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::Under15 => "00-14",
            AgeBucket::From15To24 => "15-24",
            AgeBucket::From25To34 => "25-34",
            AgeBucket::From35To44 => "35-44",
            AgeBucket::From45To54 => "45-54",
            AgeBucket::From55To64 => "55-64",
            AgeBucket::From65To74 => "65-74",
            AgeBucket::From75 => "75-99",
        }
    }

    /// Bucket for an exact age in years. Total over all of `u32`; the open
    /// top bucket absorbs everything from 75 up (including "100 and over").
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=14 => AgeBucket::Under15,
            15..=24 => AgeBucket::From15To24,
            25..=34 => AgeBucket::From25To34,
            35..=44 => AgeBucket::From35To44,
            45..=54 => AgeBucket::From45To54,
            55..=64 => AgeBucket::From55To64,
            65..=74 => AgeBucket::From65To74,
            _ => AgeBucket::From75,
        }
    }
}

/// The reduction of all observations sharing (region, period, bucket).
///
/// Derived data: recomputed from the tidy table, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub region: String,
    pub period: String,
    pub bucket: String,
    pub metric: f64,
}

/// The bucket-free aggregation level: one total per (region, period).
///
/// Also the output shape of filter-then-group subsets (e.g. foreign visitors
/// only).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTotal {
    pub region: String,
    pub period: String,
    pub metric: f64,
}

/// Everything the presentation layer receives for one dataset.
///
/// `totals` and `subset` are absent where the dataset has no meaningful
/// bucket-free view (sentiment) or no subset definition.
#[derive(Debug, Clone)]
pub struct DatasetTables {
    pub tidy: Vec<RawObservation>,
    pub bucketed: Vec<AggregatedRow>,
    pub totals: Option<Vec<RegionTotal>>,
    pub subset: Option<Vec<RegionTotal>>,
}

/// Which origin the population dataset is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Per-region table scans against the relational store.
    Store,
    /// Windowed requests against the remote statistics API.
    Api,
}
