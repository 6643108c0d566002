//! Crate-wide error type.
//!
//! Exit codes follow the convention used across the tooling:
//!
//! - 2: usage / configuration problems
//! - 3: the pipeline ran but produced no usable rows
//! - 4: a source failed (store, network) or delivered unusable data

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A category label matched none of the expected patterns. Never
    /// defaulted to a bucket; the caller decides what to do.
    #[error("unrecognized category label '{0}'")]
    LabelParse(String),

    /// The relational store or the statistics API could not deliver data.
    /// Fatal for the enclosing fetch invocation; partial results are dropped.
    #[error("{context}: {source}")]
    SourceUnavailable {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The fetch succeeded but nothing usable remained.
    #[error("no usable rows in the {0} dataset")]
    EmptyDataset(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("export failed: {0}")]
    Export(#[source] std::io::Error),
}

impl AppError {
    pub fn source_unavailable(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        AppError::SourceUnavailable {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Export(_) => 2,
            AppError::EmptyDataset(_) => 3,
            AppError::LabelParse(_) | AppError::SourceUnavailable { .. } => 4,
        }
    }
}
