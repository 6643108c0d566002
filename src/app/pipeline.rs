//! Shared dataset pipeline used by every command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! cached fetch -> sentinel filter -> label normalization -> aggregation
//!
//! The CLI (and any future front-end) can then focus on presentation.

use std::path::Path;

use crate::aggregate::{Reducer, aggregate, aggregate_totals};
use crate::cache::{CacheKey, FetchCache};
use crate::config::AppConfig;
use crate::data::kosis::KosisClient;
use crate::data::store::{self, PopulationSource, SentimentSource};
use crate::domain::{DatasetTables, RawObservation};
use crate::error::AppError;
use crate::io::ingest;
use crate::normalize::{AGE_TOTAL, SEX_TOTAL, normalize_age};

/// Process-wide memo cache over fetched tidy tables.
pub type TableCache = FetchCache<Vec<RawObservation>>;

/// Population via per-region store scans.
pub fn population_from_store(
    cfg: &AppConfig,
    cache: &mut TableCache,
    source: &mut impl PopulationSource,
) -> Result<DatasetTables, AppError> {
    let names = cfg.region_names();
    let key = CacheKey::new("population")
        .arg("store")
        .arg(names.join("+"));
    let tidy = cache.get_or_fetch(&key, || {
        store::read_population(source, &names, &cfg.region_aliases)
    })?;
    population_tables(tidy)
}

/// Population via the statistics API's sampling grid.
pub fn population_from_api(
    cfg: &AppConfig,
    cache: &mut TableCache,
    client: &KosisClient,
) -> Result<DatasetTables, AppError> {
    let codes: Vec<&str> = cfg.regions.iter().map(|r| r.code.as_str()).collect();
    let key = CacheKey::new("population")
        .arg("api")
        .arg(cfg.kosis.start_year)
        .arg(cfg.kosis.end_year)
        .arg(cfg.kosis.step_years)
        .arg(cfg.kosis.window_months)
        .arg(codes.join("+"));
    let tidy = cache.get_or_fetch(&key, || {
        client.fetch_observations(&cfg.regions, &cfg.region_aliases)
    })?;
    population_tables(tidy)
}

fn population_tables(tidy: Vec<RawObservation>) -> Result<DatasetTables, AppError> {
    if tidy.is_empty() {
        return Err(AppError::EmptyDataset("population"));
    }

    let detail: Vec<RawObservation> = tidy
        .iter()
        .filter(|o| is_population_detail(o))
        .cloned()
        .collect();

    let bucketed = aggregate(
        &detail,
        |o| normalize_age(&o.category).map(|b| b.label().to_string()),
        Reducer::Sum,
    )?;
    let totals = aggregate_totals(&detail);

    Ok(DatasetTables {
        tidy,
        bucketed,
        totals: Some(totals),
        subset: None,
    })
}

/// Sentinel rows ("all ages", "both sexes") are aggregates themselves; they
/// are excluded before bucketing, never mapped to a bucket.
fn is_population_detail(obs: &RawObservation) -> bool {
    if obs.category == AGE_TOTAL {
        return false;
    }
    match obs.subcategory.as_deref() {
        Some(sub) => sub != SEX_TOTAL && sub != AGE_TOTAL,
        None => true,
    }
}

/// Sentiment: both series pass through keyed by series name; each group holds
/// one value, so the rolling mean survives unchanged.
pub fn sentiment(
    cfg: &AppConfig,
    cache: &mut TableCache,
    source: &mut impl SentimentSource,
) -> Result<DatasetTables, AppError> {
    let key = CacheKey::new("sentiment")
        .arg("store")
        .arg(cfg.cities.join("+"));
    let tidy = cache.get_or_fetch(&key, || {
        store::read_sentiment(source, &cfg.cities, &cfg.region_aliases)
    })?;
    if tidy.is_empty() {
        return Err(AppError::EmptyDataset("sentiment"));
    }

    let bucketed = aggregate(&tidy, |o| Ok(o.category.clone()), Reducer::Mean)?;

    Ok(DatasetTables {
        tidy,
        bucketed,
        totals: None,
        subset: None,
    })
}

/// Visits: bucketed by visitor type, plus overall and foreigner-only totals.
pub fn visits(
    cfg: &AppConfig,
    cache: &mut TableCache,
    path: &Path,
) -> Result<DatasetTables, AppError> {
    let key = CacheKey::new("visits")
        .arg(path.display())
        .arg(&cfg.visits.cutoff_ymd);
    let tidy = cache.get_or_fetch(&key, || {
        ingest::load_visits(path, &cfg.visits, &cfg.region_aliases).map(|i| i.rows)
    })?;

    let bucketed = aggregate(&tidy, |o| Ok(o.category.clone()), Reducer::Sum)?;
    let totals = aggregate_totals(&tidy);
    let subset = aggregate_totals(
        tidy.iter()
            .filter(|o| o.category == cfg.visits.foreigner_label),
    );

    Ok(DatasetTables {
        tidy,
        bucketed,
        totals: Some(totals),
        subset: Some(subset),
    })
}
