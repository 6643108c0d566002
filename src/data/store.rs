//! Relational store readers.
//!
//! One scoped query per region of interest (`WHERE region = $1`), iterated
//! sequentially over the configured list; a region with no rows contributes
//! nothing and is not an error. The traits seam the Postgres client away from
//! the loop logic so tests run against in-memory fakes.
//!
//! Connections are scoped per fetch invocation: the caller connects, runs one
//! dataset's loop, and drops the store, which closes the connection on every
//! exit path.

use postgres::{Client, NoTls};
use tracing::info;

use crate::config::{RegionAlias, StoreConfig};
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::normalize::canonicalize_region;

/// Series name for the raw sentiment index.
pub const SENT_RAW: &str = "sentindex";
/// Series name for the pre-computed rolling mean, carried through unchanged.
pub const SENT_MA: &str = "sentindex_ma";

/// One row of the population table.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub region: String,
    pub period: String,
    pub age_label: String,
    pub sex_label: String,
    pub count: i64,
}

/// One row of the sentiment table.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRecord {
    pub city: String,
    pub period: String,
    pub score: f64,
    pub score_ma: f64,
}

pub trait PopulationSource {
    fn rows_for_region(&mut self, region: &str) -> Result<Vec<PopulationRecord>, AppError>;
}

pub trait SentimentSource {
    fn rows_for_city(&mut self, city: &str) -> Result<Vec<SentimentRecord>, AppError>;
}

/// Store access over a live Postgres connection.
pub struct PgStore {
    client: Client,
    population_table: String,
    sentiment_table: String,
}

impl PgStore {
    pub fn connect(cfg: &StoreConfig) -> Result<Self, AppError> {
        let params = cfg.conn_params()?;
        let client = Client::connect(&params, NoTls)
            .map_err(|e| AppError::source_unavailable("store connection failed", e))?;
        Ok(PgStore {
            client,
            population_table: cfg.population_table.clone(),
            sentiment_table: cfg.sentiment_table.clone(),
        })
    }
}

impl PopulationSource for PgStore {
    fn rows_for_region(&mut self, region: &str) -> Result<Vec<PopulationRecord>, AppError> {
        let query = format!(
            "SELECT region, age_label, sex_label, period, population \
             FROM {} WHERE region = $1",
            self.population_table
        );
        let rows = self.client.query(query.as_str(), &[&region]).map_err(|e| {
            AppError::source_unavailable(format!("population query failed for '{region}'"), e)
        })?;

        Ok(rows
            .into_iter()
            .map(|row| PopulationRecord {
                region: row.get(0),
                age_label: row.get(1),
                sex_label: row.get(2),
                period: row.get(3),
                count: row.get(4),
            })
            .collect())
    }
}

impl SentimentSource for PgStore {
    fn rows_for_city(&mut self, city: &str) -> Result<Vec<SentimentRecord>, AppError> {
        let query = format!(
            "SELECT city, period, score, score_ma FROM {} WHERE city = $1",
            self.sentiment_table
        );
        let rows = self.client.query(query.as_str(), &[&city]).map_err(|e| {
            AppError::source_unavailable(format!("sentiment query failed for '{city}'"), e)
        })?;

        Ok(rows
            .into_iter()
            .map(|row| SentimentRecord {
                city: row.get(0),
                period: row.get(1),
                score: row.get(2),
                score_ma: row.get(3),
            })
            .collect())
    }
}

/// Scan every configured region and flatten the results into tidy records.
pub fn read_population(
    source: &mut impl PopulationSource,
    regions: &[&str],
    aliases: &[RegionAlias],
) -> Result<Vec<RawObservation>, AppError> {
    let mut out = Vec::new();
    for region in regions {
        let records = source.rows_for_region(region)?;
        info!(region, rows = records.len(), "population rows fetched");
        for rec in records {
            out.push(RawObservation {
                region: canonicalize_region(&rec.region, aliases),
                period: rec.period,
                category: rec.age_label,
                subcategory: Some(rec.sex_label),
                value: rec.count as f64,
            });
        }
    }
    Ok(out)
}

/// Scan every configured city; the raw index and its rolling mean become two
/// tidy records per (city, period).
pub fn read_sentiment(
    source: &mut impl SentimentSource,
    cities: &[String],
    aliases: &[RegionAlias],
) -> Result<Vec<RawObservation>, AppError> {
    let mut out = Vec::new();
    for city in cities {
        let records = source.rows_for_city(city)?;
        info!(city, rows = records.len(), "sentiment rows fetched");
        for rec in records {
            let region = canonicalize_region(&rec.city, aliases);
            out.push(RawObservation {
                region: region.clone(),
                period: rec.period.clone(),
                category: SENT_RAW.to_string(),
                subcategory: None,
                value: rec.score,
            });
            out.push(RawObservation {
                region,
                period: rec.period,
                category: SENT_MA.to_string(),
                subcategory: None,
                value: rec.score_ma,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakePopulation {
        by_region: HashMap<String, Vec<PopulationRecord>>,
        fail_on: Option<String>,
    }

    impl PopulationSource for FakePopulation {
        fn rows_for_region(&mut self, region: &str) -> Result<Vec<PopulationRecord>, AppError> {
            if self.fail_on.as_deref() == Some(region) {
                return Err(AppError::source_unavailable(
                    format!("population query failed for '{region}'"),
                    "connection reset",
                ));
            }
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

    fn pop_record(region: &str, age: &str, sex: &str, count: i64) -> PopulationRecord {
        PopulationRecord {
            region: region.to_string(),
            period: "200801".to_string(),
            age_label: age.to_string(),
            sex_label: sex.to_string(),
            count,
        }
    }

    #[test]
    fn empty_regions_contribute_zero_rows() {
        let mut source = FakePopulation {
            by_region: HashMap::from([(
                "양주시".to_string(),
                vec![pop_record("양주시", "5세", "남자", 10)],
            )]),
            fail_on: None,
        };
        let rows = read_population(&mut source, &["양주시", "포천시"], &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region, "양주시");
        assert_eq!(rows[0].subcategory.as_deref(), Some("남자"));
    }

    #[test]
    fn query_failure_discards_the_whole_invocation() {
        let mut source = FakePopulation {
            by_region: HashMap::from([(
                "양주시".to_string(),
                vec![pop_record("양주시", "5세", "남자", 10)],
            )]),
            fail_on: Some("포천시".to_string()),
        };
        let out = read_population(&mut source, &["양주시", "포천시"], &[]);
        assert!(matches!(out, Err(AppError::SourceUnavailable { .. })));
    }

    #[test]
    fn district_rows_collapse_to_the_canonical_city() {
        let aliases = vec![crate::config::RegionAlias {
            contains: "고양시".to_string(),
            canonical: "고양시".to_string(),
        }];
        let mut source = FakePopulation {
            by_region: HashMap::from([(
                "고양시".to_string(),
                vec![pop_record("고양시덕양구", "5세", "여자", 3)],
            )]),
            fail_on: None,
        };
        let rows = read_population(&mut source, &["고양시"], &aliases).unwrap();
        assert_eq!(rows[0].region, "고양시");
    }

    #[test]
    fn sentiment_rows_fan_out_into_both_series() {
        let mut source = FakeSentiment {
            by_city: HashMap::from([(
                "가평".to_string(),
                vec![SentimentRecord {
                    city: "가평".to_string(),
                    period: "202001".to_string(),
                    score: 0.42,
                    score_ma: 0.40,
                }],
            )]),
        };
        let rows = read_sentiment(&mut source, &["가평".to_string()], &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, SENT_RAW);
        assert_eq!(rows[1].category, SENT_MA);
        assert!((rows[1].value - 0.40).abs() < 1e-12);
    }
}
