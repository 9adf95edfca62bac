pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod index;
pub mod io_utils;
pub mod label;
pub mod lookup;
pub mod report;
pub mod rows;
pub mod schema;
pub mod session;
pub mod source;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::Settings,
    session::Session,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("magcore", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Cores(args) => handle_cores(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Lookup(args) => lookup::execute(&args),
    }
}

/// Loads the dataset named by the merged flags and config.
pub(crate) fn open_session(settings: Settings) -> Result<Session> {
    let source = settings.source();
    let identity = source.identity();
    info!("Loading cores from {identity}");
    let session = Session::load(source)
        .with_context(|| format!("Loading dataset from {:?}", settings.input))?;
    Ok(session
        .with_metrics(settings.metrics)
        .with_placeholder(settings.placeholder))
}

fn handle_cores(args: &cli::CoresArgs) -> Result<()> {
    let settings = Settings::resolve(&args.source)?;
    let session = open_session(settings)?;
    let dataset = session.dataset();
    let identifiers = dataset.identifiers();
    for identifier in &identifiers {
        println!("{identifier}");
    }
    info!(
        "Listed {} core(s) by field '{}'",
        identifiers.len(),
        dataset.identity_field()
    );
    Ok(())
}
