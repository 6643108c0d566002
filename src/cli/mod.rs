//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pipeline code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::SourceKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "rpulse",
    version,
    about = "Regional indicator pipeline (relational store / statistics API)"
)]
pub struct Cli {
    /// TOML config file (falls back to region-pulse.toml, then defaults).
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands, one per dataset.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Population by age bucket for the configured regions.
    Population(PopulationArgs),
    /// Monthly sentiment index (raw + rolling mean) per city.
    Sentiment(SeriesArgs),
    /// Monthly tourist visits by visitor type, plus the foreigner subset.
    Visits(VisitsArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct PopulationArgs {
    /// Where to read the dataset from.
    #[arg(long, value_enum, default_value_t = SourceKind::Store)]
    pub source: SourceKind,

    #[command(flatten)]
    pub common: SeriesArgs,
}

/// Options shared by every dataset command.
#[derive(Debug, Parser, Clone)]
pub struct SeriesArgs {
    /// Slice every table down to one region before printing/exporting.
    #[arg(short, long)]
    pub region: Option<String>,

    /// Export the aggregated tables as CSV files into this directory.
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct VisitsArgs {
    /// Override the configured visits file path.
    #[arg(long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub common: SeriesArgs,
}
