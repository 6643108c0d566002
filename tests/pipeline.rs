//! End-to-end pipeline scenarios against fake sources.
//!
//! No database or network: sources are in-memory fakes, the visits file is a
//! temp CSV. These cover the behaviors a live run depends on: memoized
//! fetching, sentinel exclusion, bucketing, totals/subset math, and region
//! slicing.

use std::collections::HashMap;
use std::io::Write;

use region_pulse::app::pipeline::{self, TableCache};
use region_pulse::config::{AppConfig, RegionSpec};
use region_pulse::data::store::{
    PopulationRecord, PopulationSource, SentimentRecord, SentimentSource,
};
use region_pulse::error::AppError;
use region_pulse::select::select;

struct CountingPopulation {
    calls: usize,
    by_region: HashMap<String, Vec<PopulationRecord>>,
}

impl PopulationSource for CountingPopulation {
    fn rows_for_region(&mut self, region: &str) -> Result<Vec<PopulationRecord>, AppError> {
        self.calls += 1;
        Ok(self.by_region.get(region).cloned().unwrap_or_default())
    }
}

struct FakeSentiment {
    by_city: HashMap<String, Vec<SentimentRecord>>,
}

impl SentimentSource for FakeSentiment {
    fn rows_for_city(&mut self, city: &str) -> Result<Vec<SentimentRecord>, AppError> {
        Ok(self.by_city.get(city).cloned().unwrap_or_default())
    }
}

fn single_region_config(name: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.regions = vec![RegionSpec {
        name: name.to_string(),
        code: "00000".to_string(),
    }];
    cfg
}

fn record(region: &str, period: &str, age: &str, sex: &str, count: i64) -> PopulationRecord {
    PopulationRecord {
        region: region.to_string(),
        period: period.to_string(),
        age_label: age.to_string(),
        sex_label: sex.to_string(),
        count,
    }
}

#[test]
fn population_aggregation_excludes_totals_and_buckets_ages() {
    let cfg = single_region_config("A");
    let mut cache = TableCache::in_memory();
    let mut source = CountingPopulation {
        calls: 0,
        by_region: HashMap::from([(
            "A".to_string(),
            vec![
                record("A", "200801", "5세", "남자", 10),
                record("A", "200801", "12세", "남자", 5),
                record("A", "200801", "계", "남자", 999),
            ],
        )]),
    };

    let tables = pipeline::population_from_store(&cfg, &mut cache, &mut source).unwrap();

    assert_eq!(tables.bucketed.len(), 1);
    let row = &tables.bucketed[0];
    assert_eq!(row.region, "A");
    assert_eq!(row.period, "200801");
    assert_eq!(row.bucket, "00-14");
    assert!((row.metric - 15.0).abs() < 1e-12);

    // The excluded sentinel never reaches the totals either.
    let totals = tables.totals.as_ref().unwrap();
    assert_eq!(totals.len(), 1);
    assert!((totals[0].metric - 15.0).abs() < 1e-12);

    // The tidy table still carries everything the source produced.
    assert_eq!(tables.tidy.len(), 3);
}

#[test]
fn repeated_fetches_hit_the_cache_not_the_source() {
    let cfg = single_region_config("A");
    let mut cache = TableCache::in_memory();
    let mut source = CountingPopulation {
        calls: 0,
        by_region: HashMap::from([(
            "A".to_string(),
            vec![record("A", "200801", "5세", "남자", 10)],
        )]),
    };

    let first = pipeline::population_from_store(&cfg, &mut cache, &mut source).unwrap();
    let second = pipeline::population_from_store(&cfg, &mut cache, &mut source).unwrap();

    assert_eq!(source.calls, 1);
    assert_eq!(first.bucketed, second.bucketed);
    assert_eq!(first.tidy, second.tidy);
}

#[test]
fn sentiment_series_carry_the_rolling_mean_through() {
    let mut cfg = AppConfig::default();
    cfg.cities = vec!["가평".to_string()];
    let mut cache = TableCache::in_memory();
    let mut source = FakeSentiment {
        by_city: HashMap::from([(
            "가평".to_string(),
            vec![
                SentimentRecord {
                    city: "가평".to_string(),
                    period: "202001".to_string(),
                    score: 0.42,
                    score_ma: 0.40,
                },
                SentimentRecord {
                    city: "가평".to_string(),
                    period: "202002".to_string(),
                    score: 0.48,
                    score_ma: 0.43,
                },
            ],
        )]),
    };

    let tables = pipeline::sentiment(&cfg, &mut cache, &mut source).unwrap();

    assert_eq!(tables.tidy.len(), 4);
    assert_eq!(tables.bucketed.len(), 4);
    let ma_rows: Vec<_> = tables
        .bucketed
        .iter()
        .filter(|r| r.bucket == "sentindex_ma")
        .collect();
    assert_eq!(ma_rows.len(), 2);
    assert!((ma_rows[0].metric - 0.40).abs() < 1e-12);
    assert!(tables.totals.is_none());
}

#[test]
fn visits_pipeline_builds_totals_and_foreigner_subset() {
    let cfg = AppConfig::default();
    let mut cache = TableCache::in_memory();

    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(
        tmp,
        "signguNm,baseYmd,touDivNm,touNum\n\
         파주시,20191015,현지인(a),100\n\
         파주시,20191020,현지인(a),50\n\
         파주시,20191015,외국인(c),7\n\
         고양시일산동구,20191015,외국인(c),3\n\
         파주시,20240905,현지인(a),999\n"
    )
    .unwrap();

    let tables = pipeline::visits(&cfg, &mut cache, tmp.path()).unwrap();

    // The post-cutoff row is gone.
    assert_eq!(tables.tidy.len(), 4);

    // Bucketed by visitor type; daily rows collapse into the month.
    let local: Vec<_> = tables
        .bucketed
        .iter()
        .filter(|r| r.bucket == "현지인(a)")
        .collect();
    assert_eq!(local.len(), 1);
    assert!((local[0].metric - 150.0).abs() < 1e-12);

    // District rows collapsed onto the canonical city.
    assert!(tables.bucketed.iter().any(|r| r.region == "고양시"));

    let totals = tables.totals.as_ref().unwrap();
    let paju: Vec<_> = select(totals, "파주시");
    assert_eq!(paju.len(), 1);
    assert!((paju[0].metric - 157.0).abs() < 1e-12);

    let subset = tables.subset.as_ref().unwrap();
    let foreign_sum: f64 = subset.iter().map(|r| r.metric).sum();
    assert!((foreign_sum - 10.0).abs() < 1e-12);
}

#[test]
fn region_slices_are_views_and_unknown_regions_are_empty() {
    let cfg = single_region_config("A");
    let mut cache = TableCache::in_memory();
    let mut source = CountingPopulation {
        calls: 0,
        by_region: HashMap::from([(
            "A".to_string(),
            vec![
                record("A", "200801", "5세", "남자", 10),
                record("A", "200802", "40세", "여자", 4),
            ],
        )]),
    };

    let tables = pipeline::population_from_store(&cfg, &mut cache, &mut source).unwrap();

    let here = select(&tables.bucketed, "A");
    assert_eq!(here.len(), tables.bucketed.len());
    assert!(select(&tables.bucketed, "nonexistent").is_empty());
}
