//! Export aggregated tables to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts; values are written with full precision.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{AggregatedRow, RegionTotal};
use crate::error::AppError;

/// Write the bucketed table to a CSV file.
pub fn write_bucketed_csv(path: &Path, rows: &[&AggregatedRow]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(AppError::Export)?;

    writeln!(file, "region,period,bucket,metric").map_err(AppError::Export)?;
    for row in rows {
        writeln!(
            file,
            "{},{},{},{}",
            row.region, row.period, row.bucket, row.metric
        )
        .map_err(AppError::Export)?;
    }

    Ok(())
}

/// Write a (region, period) totals table to a CSV file.
pub fn write_totals_csv(path: &Path, rows: &[&RegionTotal]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(AppError::Export)?;

    writeln!(file, "region,period,metric").map_err(AppError::Export)?;
    for row in rows {
        writeln!(file, "{},{},{}", row.region, row.period, row.metric).map_err(AppError::Export)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucketed_export_round_trips_through_text() {
        let rows = vec![AggregatedRow {
            region: "가평군".to_string(),
            period: "200801".to_string(),
            bucket: "00-14".to_string(),
            metric: 15.0,
        }];
        let refs: Vec<&AggregatedRow> = rows.iter().collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bucketed.csv");
        write_bucketed_csv(&path, &refs).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "region,period,bucket,metric\n가평군,200801,00-14,15\n");
    }

    #[test]
    fn totals_export_has_three_columns() {
        let rows = vec![RegionTotal {
            region: "가평군".to_string(),
            period: "200801".to_string(),
            metric: 17.5,
        }];
        let refs: Vec<&RegionTotal> = rows.iter().collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("totals.csv");
        write_totals_csv(&path, &refs).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "region,period,metric\n가평군,200801,17.5\n");
    }
}
