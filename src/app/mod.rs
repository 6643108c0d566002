//! Command dispatch: wire configuration, cache, sources, and reporting.

pub mod pipeline;

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Command, SeriesArgs};
use crate::config::AppConfig;
use crate::data::{KosisClient, PgStore};
use crate::domain::{DatasetTables, SourceKind};
use crate::error::AppError;
use crate::io::export;
use crate::report;
use crate::select::select;

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init();
    let cfg = AppConfig::load(cli.config.as_deref())?;

    let mut cache = pipeline::TableCache::in_memory();

    match cli.command {
        Command::Population(args) => {
            let tables = match args.source {
                SourceKind::Store => {
                    // Connection scope is this fetch invocation: the store is
                    // dropped (and the connection closed) on every exit path.
                    let mut store = PgStore::connect(&cfg.store)?;
                    pipeline::population_from_store(&cfg, &mut cache, &mut store)?
                }
                SourceKind::Api => {
                    let client = KosisClient::from_env(&cfg.kosis)?;
                    pipeline::population_from_api(&cfg, &mut cache, &client)?
                }
            };
            emit("population", &tables, &args.common)
        }
        Command::Sentiment(args) => {
            let mut store = PgStore::connect(&cfg.store)?;
            let tables = pipeline::sentiment(&cfg, &mut cache, &mut store)?;
            emit("sentiment", &tables, &args)
        }
        Command::Visits(args) => {
            let path = args
                .file
                .clone()
                .unwrap_or_else(|| PathBuf::from(&cfg.visits.path));
            let tables = pipeline::visits(&cfg, &mut cache, &path)?;
            emit("visits", &tables, &args.common)
        }
    }
}

/// Print the (optionally region-sliced) tables and run the CSV export.
fn emit(dataset: &str, tables: &DatasetTables, args: &SeriesArgs) -> Result<(), AppError> {
    print!("{}", report::format_run_summary(dataset, tables));

    let bucketed = match &args.region {
        Some(region) => select(&tables.bucketed, region),
        None => tables.bucketed.iter().collect(),
    };
    print!("{}", report::format_bucketed_table(&bucketed));

    let totals = tables.totals.as_ref().map(|rows| match &args.region {
        Some(region) => select(rows, region),
        None => rows.iter().collect(),
    });
    if let Some(rows) = &totals {
        println!();
        print!("{}", report::format_totals_table("Overall totals", rows));
    }

    let subset = tables.subset.as_ref().map(|rows| match &args.region {
        Some(region) => select(rows, region),
        None => rows.iter().collect(),
    });
    if let Some(rows) = &subset {
        println!();
        print!("{}", report::format_totals_table("Foreign visitors", rows));
    }

    if let Some(dir) = &args.export {
        std::fs::create_dir_all(dir).map_err(AppError::Export)?;
        export::write_bucketed_csv(&dir.join(format!("{dataset}_bucketed.csv")), &bucketed)?;
        if let Some(rows) = &totals {
            export::write_totals_csv(&dir.join(format!("{dataset}_totals.csv")), rows)?;
        }
        if let Some(rows) = &subset {
            export::write_totals_csv(&dir.join(format!("{dataset}_subset.csv")), rows)?;
        }
    }

    Ok(())
}
