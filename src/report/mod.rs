//! Formatted terminal output for the pipeline's tables.
//!
//! We keep formatting code in one place so:
//! - the fetch/aggregate code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{AggregatedRow, DatasetTables, RegionTotal};

/// Format the run summary: what was fetched and how it aggregated.
pub fn format_run_summary(dataset: &str, tables: &DatasetTables) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== rpulse - {dataset} ===\n"));
    out.push_str(&format!("Tidy rows: {}\n", tables.tidy.len()));

    let mut regions: Vec<&str> = tables.tidy.iter().map(|r| r.region.as_str()).collect();
    regions.sort_unstable();
    regions.dedup();
    out.push_str(&format!("Regions: {}\n", regions.len()));

    let first = tables.tidy.iter().map(|r| r.period.as_str()).min();
    let last = tables.tidy.iter().map(|r| r.period.as_str()).max();
    if let (Some(first), Some(last)) = (first, last) {
        out.push_str(&format!("Periods: {first}..{last}\n"));
    }

    out.push_str(&format!("Aggregated rows: {}\n", tables.bucketed.len()));
    out.push('\n');

    out
}

/// Format the bucketed table with aligned columns.
pub fn format_bucketed_table(rows: &[&AggregatedRow]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<12} {:>8} {:<12} {:>16}\n",
        "region", "period", "bucket", "metric"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<8} {:-<12} {:-<16}\n",
        "", "", "", ""
    ));

    for row in rows {
        out.push_str(&format!(
            "{:<12} {:>8} {:<12} {:>16}\n",
            truncate(&row.region, 12),
            row.period,
            truncate(&row.bucket, 12),
            fmt_metric(row.metric),
        ));
    }

    out
}

/// Format a (region, period) totals table.
pub fn format_totals_table(title: &str, rows: &[&RegionTotal]) -> String {
    let mut out = String::new();

    out.push_str(&format!("{title}:\n"));
    out.push_str(&format!(
        "{:<12} {:>8} {:>16}\n",
        "region", "period", "metric"
    ));
    out.push_str(&format!("{:-<12} {:-<8} {:-<16}\n", "", "", ""));

    for row in rows {
        out.push_str(&format!(
            "{:<12} {:>8} {:>16}\n",
            truncate(&row.region, 12),
            row.period,
            fmt_metric(row.metric),
        ));
    }

    out
}

/// Counts get thousands separators; index-like values keep two decimals.
fn fmt_metric(v: f64) -> String {
    if v.fract().abs() > 1e-9 {
        return format!("{v:.2}");
    }
    let negative = v < 0.0;
    let grouped = group_thousands(v.abs() as u64);
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
