//! Run configuration.
//!
//! Everything the original deployment hard-coded — the city list, region
//! codes, alias collapsing, store table names, API sampling grid, the visits
//! cutoff — lives here as plain data so tests can substitute their own.
//!
//! Sources, in order: compiled defaults, then an optional TOML file, with
//! secrets (store password, API key) always read from the environment via
//! `dotenvy`, never from the file.

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "region-pulse.toml";

/// A region of interest: display name plus its statistics-API code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionSpec {
    pub name: String,
    pub code: String,
}

/// Collapse rule for region name variants (district-suffixed city names).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionAlias {
    /// Any label containing this substring…
    pub contains: String,
    /// …is replaced by this canonical form.
    pub canonical: String,
}

/// Relational store settings. The password comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    pub population_table: String,
    pub sentiment_table: String,
    /// Name of the environment variable holding the password.
    pub password_env: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "pulse".to_string(),
            dbname: "regionpulse".to_string(),
            population_table: "population".to_string(),
            sentiment_table: "sentindex".to_string(),
            password_env: "DB_PASSWORD".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn password(&self) -> Result<String, AppError> {
        std::env::var(&self.password_env).map_err(|_| {
            AppError::Config(format!(
                "missing {} in environment (.env)",
                self.password_env
            ))
        })
    }

    pub fn conn_params(&self) -> Result<String, AppError> {
        let password = self.password()?;
        Ok(format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, password, self.dbname
        ))
    }
}

/// Statistics-API settings, including the sampling grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KosisConfig {
    pub endpoint: String,
    pub org_id: String,
    pub tbl_id: String,
    pub itm_id: String,
    /// First sampled year (January).
    pub start_year: i32,
    /// Last sampled year (inclusive).
    pub end_year: i32,
    /// Sample every Nth January.
    pub step_years: u32,
    /// Widen each sample into a window of this many months, January first.
    pub window_months: u32,
}

impl Default for KosisConfig {
    fn default() -> Self {
        KosisConfig {
            endpoint: "https://kosis.kr/openapi/Param/statisticsParameterData.do".to_string(),
            org_id: "101".to_string(),
            tbl_id: "DT_1B04005N".to_string(),
            itm_id: "T2".to_string(),
            start_year: 1995,
            end_year: 2025,
            step_years: 5,
            window_months: 2,
        }
    }
}

impl KosisConfig {
    pub fn api_key(&self) -> Result<String, AppError> {
        std::env::var("KOSIS_API_KEY")
            .map_err(|_| AppError::Config("missing KOSIS_API_KEY in environment (.env)".to_string()))
    }
}

/// Tourist-visit file settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisitsConfig {
    pub path: String,
    /// Rows dated on or after this day (YYYYMMDD) are excluded.
    pub cutoff_ymd: String,
    /// Visitor-type label selecting the foreigner-only subset.
    pub foreigner_label: String,
}

impl Default for VisitsConfig {
    fn default() -> Self {
        VisitsConfig {
            path: "data/visits.csv".to_string(),
            cutoff_ymd: "20240901".to_string(),
            foreigner_label: "외국인(c)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Population regions (full administrative names + API codes).
    pub regions: Vec<RegionSpec>,
    /// Sentiment cities (the short names the sentiment table is keyed by).
    pub cities: Vec<String>,
    pub region_aliases: Vec<RegionAlias>,
    pub store: StoreConfig,
    pub kosis: KosisConfig,
    pub visits: VisitsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let region = |name: &str, code: &str| RegionSpec {
            name: name.to_string(),
            code: code.to_string(),
        };
        AppConfig {
            regions: vec![
                region("동두천시", "41250"),
                region("양주시", "41630"),
                region("포천시", "41650"),
                region("연천군", "41800"),
                region("가평군", "41820"),
                region("의정부시", "41150"),
                region("고양시", "41280"),
                region("구리시", "41310"),
                region("남양주시", "41360"),
                region("파주시", "41480"),
            ],
            cities: [
                "동두천", "양주", "포천", "연천", "가평", "의정부", "고양", "구리", "남양주",
                "파주",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            region_aliases: vec![RegionAlias {
                contains: "고양시".to_string(),
                canonical: "고양시".to_string(),
            }],
            store: StoreConfig::default(),
            kosis: KosisConfig::default(),
            visits: VisitsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration: explicit path, else the default file if present,
    /// else compiled defaults. Also loads `.env` for secrets.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if !fallback.exists() {
                    return Ok(AppConfig::default());
                }
                fallback.to_path_buf()
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("failed to parse '{}': {e}", path.display())))
    }

    pub fn region_names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }
}
