//! Statistics-API integration (KOSIS-style parameterized endpoint).
//!
//! Retrieval is grid-driven: a lazily produced, finite sequence of
//! (region, sampling-window) request tuples — every Nth January widened into
//! a short window — iterated region-outer, period-inner. One blocking GET per
//! cell, no retry, no timeout beyond the client's defaults.
//!
//! Failure handling per cell:
//! - transport or HTTP-status failure: fatal for the whole invocation
//! - a well-formed body carrying an `err` member: that cell is skipped and
//!   the loop continues
//! - a row whose value string does not parse: that row is skipped with a
//!   warning, the rest of the cell survives

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{KosisConfig, RegionAlias, RegionSpec};
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::normalize::canonicalize_region;

/// One (region, sampling-window) pair driving a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub region_name: String,
    pub region_code: String,
    pub start_period: String,
    pub end_period: String,
}

/// Build the request grid without executing anything.
///
/// Kept lazy so grid correctness is testable independent of the network, and
/// so iteration order (the memo-key order) stays explicit: regions outer,
/// sampled years inner.
pub fn sample_grid<'a>(
    regions: &'a [RegionSpec],
    cfg: &'a KosisConfig,
) -> impl Iterator<Item = GridCell> + 'a {
    let step = cfg.step_years.max(1) as usize;
    let window_end = cfg.window_months.clamp(1, 12);
    regions.iter().flat_map(move |region| {
        (cfg.start_year..=cfg.end_year)
            .step_by(step)
            .map(move |year| GridCell {
                region_name: region.name.clone(),
                region_code: region.code.clone(),
                start_period: format!("{year}01"),
                end_period: format!("{year}{window_end:02}"),
            })
    })
}

#[derive(Debug, Deserialize)]
pub struct KosisRow {
    #[serde(rename = "PRD_DE")]
    pub period: String,
    #[serde(rename = "C1_NM")]
    pub region: String,
    #[serde(rename = "C2_NM")]
    pub category: String,
    #[serde(rename = "ITM_NM")]
    pub item: String,
    #[serde(rename = "DT")]
    pub value: String,
}

/// Error envelope the API returns instead of a row array.
#[derive(Debug, Deserialize)]
pub struct KosisFault {
    pub err: serde_json::Value,
    #[serde(rename = "errMsg", default)]
    pub msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KosisReply {
    Rows(Vec<KosisRow>),
    Fault(KosisFault),
}

pub struct KosisClient {
    client: Client,
    api_key: String,
    cfg: KosisConfig,
}

impl KosisClient {
    pub fn from_env(cfg: &KosisConfig) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = cfg.api_key()?;
        Ok(KosisClient {
            client: Client::new(),
            api_key,
            cfg: cfg.clone(),
        })
    }

    /// Walk the whole grid and collect tidy observations.
    pub fn fetch_observations(
        &self,
        regions: &[RegionSpec],
        aliases: &[RegionAlias],
    ) -> Result<Vec<RawObservation>, AppError> {
        let mut out = Vec::new();
        for cell in sample_grid(regions, &self.cfg) {
            match self.fetch_window(&cell)? {
                KosisReply::Fault(fault) => {
                    warn!(
                        region = %cell.region_name,
                        window = %cell.start_period,
                        code = %fault.err,
                        msg = fault.msg.as_deref().unwrap_or(""),
                        "statistics API fault; skipping cell"
                    );
                }
                KosisReply::Rows(rows) => {
                    info!(
                        region = %cell.region_name,
                        window = %cell.start_period,
                        rows = rows.len(),
                        "statistics API window fetched"
                    );
                    out.extend(observations_from_rows(rows, aliases));
                }
            }
        }
        Ok(out)
    }

    fn fetch_window(&self, cell: &GridCell) -> Result<KosisReply, AppError> {
        let resp = self
            .client
            .get(&self.cfg.endpoint)
            .query(&[
                ("method", "getList"),
                ("apiKey", self.api_key.as_str()),
                ("itmId", self.cfg.itm_id.as_str()),
                ("objL1", cell.region_code.as_str()),
                ("objL2", "ALL"),
                ("format", "json"),
                ("jsonVD", "Y"),
                ("prdSe", "M"),
                ("startPrdDe", cell.start_period.as_str()),
                ("endPrdDe", cell.end_period.as_str()),
                ("orgId", self.cfg.org_id.as_str()),
                ("tblId", self.cfg.tbl_id.as_str()),
            ])
            .send()
            .map_err(|e| {
                AppError::source_unavailable(
                    format!(
                        "statistics API request failed for {} {}",
                        cell.region_name, cell.start_period
                    ),
                    e,
                )
            })?;

        if !resp.status().is_success() {
            return Err(AppError::source_unavailable(
                format!(
                    "statistics API request failed for {} {}",
                    cell.region_name, cell.start_period
                ),
                format!("status {}", resp.status()),
            ));
        }

        resp.json::<KosisReply>()
            .map_err(|e| AppError::source_unavailable("unreadable statistics API response", e))
    }
}

/// Convert one window's rows into tidy observations, skipping rows whose
/// value string does not parse.
pub fn observations_from_rows(
    rows: Vec<KosisRow>,
    aliases: &[RegionAlias],
) -> Vec<RawObservation> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(value) = parse_value(&row.value) else {
            warn!(
                region = %row.region,
                period = %row.period,
                category = %row.category,
                raw = %row.value,
                "unparseable observation value; skipping row"
            );
            continue;
        };
        out.push(RawObservation {
            region: canonicalize_region(&row.region, aliases),
            period: row.period,
            category: row.category,
            subcategory: Some(row.item),
            value,
        });
    }
    out
}

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
