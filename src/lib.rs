pub mod advisor;
pub mod chart;
pub mod cli;
pub mod config;
pub mod data;
pub mod explore;
pub mod io_utils;
pub mod mock;
pub mod refresh;
pub mod roles;
pub mod schema;
pub mod table;
pub mod traffic;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("terminal_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Dispatching {:?}", cli.command);
    match cli.command {
        Commands::Classify(args) => schema::execute(&args),
        Commands::Suggest(args) => advisor::execute(&args),
        Commands::Chart(args) => chart::execute(&args),
        Commands::Explore(args) => explore::execute(&args),
        Commands::Validate(args) => explore::execute_validate(&args),
        Commands::Analyze(args) => traffic::execute(&args),
        Commands::Watch(args) => refresh::execute(&args),
        Commands::Generate(args) => mock::execute(&args),
    }
}
