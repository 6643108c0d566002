//! Region slicing for downstream consumers.
//!
//! The selector never owns data: it returns borrowed rows in their original
//! order. A region with no rows yields an empty vec, not an error.

use crate::domain::{AggregatedRow, RawObservation, RegionTotal};

/// Anything keyed by a region name.
pub trait Regional {
    fn region(&self) -> &str;
}

impl Regional for RawObservation {
    fn region(&self) -> &str {
        &self.region
    }
}

impl Regional for AggregatedRow {
    fn region(&self) -> &str {
        &self.region
    }
}

impl Regional for RegionTotal {
    fn region(&self) -> &str {
        &self.region
    }
}

/// Exact-match filter down to one region's rows.
pub fn select<'a, T: Regional>(table: &'a [T], region: &str) -> Vec<&'a T> {
    table.iter().filter(|row| row.region() == region).collect()
}
