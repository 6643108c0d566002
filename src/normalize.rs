//! Category label normalization.
//!
//! Raw labels arrive in whatever shape the source uses (`"5세"`, `"100세 이상"`,
//! `"고양시덕양구"`). This module maps them onto the canonical vocabulary the
//! aggregator groups by. Normalization never guesses: a label that matches no
//! expected pattern is an error, not a silent bucket.

use crate::config::RegionAlias;
use crate::domain::AgeBucket;
use crate::error::AppError;

/// Suffix on per-age labels ("5세", "62세").
pub const AGE_SUFFIX: &str = "세";

/// Open-ended top label; folds into the top bucket.
pub const AGE_OPEN_ENDED: &str = "100세 이상";

/// "All ages" sentinel. Rows carrying it are excluded before bucketing.
pub const AGE_TOTAL: &str = "계";

/// "Both sexes" sentinel used by the relational population table.
pub const SEX_TOTAL: &str = "총인구수";

/// Map a raw age label to its canonical bucket.
///
/// Accepts the open-ended sentinel and labels of the form `<age>세`. Anything
/// else (including an unparseable numeric prefix) is a `LabelParse` error.
pub fn normalize_age(label: &str) -> Result<AgeBucket, AppError> {
    let label = label.trim();
    if label == AGE_OPEN_ENDED {
        return Ok(AgeBucket::From75);
    }

    let prefix = label
        .strip_suffix(AGE_SUFFIX)
        .ok_or_else(|| AppError::LabelParse(label.to_string()))?;
    let age: u32 = prefix
        .trim()
        .parse()
        .map_err(|_| AppError::LabelParse(label.to_string()))?;

    Ok(AgeBucket::from_age(age))
}

/// Collapse region name variants onto their canonical form.
///
/// Any label containing a configured alias substring (district-suffixed city
/// names, mostly) becomes the canonical name; everything else passes through
/// unchanged. Total: no region label is ever dropped.
pub fn canonicalize_region(label: &str, aliases: &[RegionAlias]) -> String {
    for alias in aliases {
        if label.contains(&alias.contains) {
            return alias.canonical.clone();
        }
    }
    label.to_string()
}
