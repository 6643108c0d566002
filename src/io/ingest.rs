//! Visits file ingest and normalization.
//!
//! Turns the heterogeneous tourist-visit export into clean tidy observations:
//!
//! - **Strict schema** for required columns (clear errors + exit code 4)
//! - **Row-level validation**: skip bad rows, but report what happened
//! - **Deterministic behavior**: cutoff and collapsing rules come from config
//!
//! Daily rows are reduced to `YYYYMM` periods here so every downstream stage
//! sees the same tidy shape as the other datasets.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::warn;

use crate::config::{RegionAlias, VisitsConfig};
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::normalize::canonicalize_region;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: tidy observations + what was read and dropped.
#[derive(Debug, Clone)]
pub struct VisitsIngest {
    pub rows: Vec<RawObservation>,
    pub rows_read: usize,
    pub rows_used: usize,
    pub row_errors: Vec<RowError>,
}

/// Load and normalize the visits table from its file path.
pub fn load_visits(
    path: &Path,
    cfg: &VisitsConfig,
    aliases: &[RegionAlias],
) -> Result<VisitsIngest, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::source_unavailable(format!("failed to open visits file '{}'", path.display()), e)
    })?;
    read_visits(file, cfg, aliases)
}

/// Reader-generic body of [`load_visits`].
pub fn read_visits(
    input: impl std::io::Read,
    cfg: &VisitsConfig,
    aliases: &[RegionAlias],
) -> Result<VisitsIngest, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::source_unavailable("failed to read visits headers", e))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in ["signgunm", "baseymd", "toudivnm", "tounum"] {
        if !header_map.contains_key(required) {
            return Err(AppError::source_unavailable(
                "visits file schema mismatch",
                format!("missing required column `{required}`"),
            ));
        }
    }

    let cutoff = parse_ymd(&cfg.cutoff_ymd)
        .map_err(|e| AppError::Config(format!("invalid visits cutoff: {e}")))?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, cutoff, aliases) {
            Ok(Some(obs)) => rows.push(obs),
            Ok(None) => {} // on/after cutoff
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in &row_errors {
        warn!(line = err.line, "{}", err.message);
    }

    if rows.is_empty() {
        return Err(AppError::EmptyDataset("visits"));
    }

    let rows_used = rows.len();
    Ok(VisitsIngest {
        rows,
        rows_read,
        rows_used,
        row_errors,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM; if we
    // don't strip it, schema validation reports a missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    cutoff: NaiveDate,
    aliases: &[RegionAlias],
) -> Result<Option<RawObservation>, String> {
    let region = get_required(record, header_map, "signgunm")?;
    let base_ymd = get_required(record, header_map, "baseymd")?;
    let visitor_kind = get_required(record, header_map, "toudivnm")?;
    let count_raw = get_required(record, header_map, "tounum")?;

    let date = parse_ymd(base_ymd)?;
    if date >= cutoff {
        return Ok(None);
    }

    let value = count_raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid visit count '{count_raw}'"))?;

    Ok(Some(RawObservation {
        region: canonicalize_region(region, aliases),
        period: date.format("%Y%m").to_string(),
        category: visitor_kind.to_string(),
        subcategory: None,
        value,
    }))
}

fn parse_ymd(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|e| format!("invalid date '{s}': {e}"))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required value: `{name}`"))
}
