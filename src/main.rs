mod common;
mod config;
mod map;
mod scenario;
mod searcher;
mod stat;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::Query;
use config::{Cli, Config};
use map::Map;
use scenario::Scenario;
use searcher::{DelayAStar, ExpandSideMode, Searcher, SfbdsAStar};

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            Config::from_yaml_str(&raw)?
        }
        None => Config::default(),
    };
    let config = config.override_from_command_line(&cli)?;

    let map = Map::from_file(&config.map_path)?;
    let queries = match &config.queries_path {
        Some(path) => Scenario::load_queries_from_yaml(path)?,
        None => {
            let scenario = Scenario::load_from_scen(&config.scen_path)?;
            let mut rng = StdRng::seed_from_u64(config.seed);
            let queries = scenario.generate_queries(config.num_queries, &mut rng)?;
            // Dump the sample so a run can be replayed with --queries.
            Scenario::write_queries_to_yaml("queries-debug.yaml", &queries)?;
            queries
        }
    };

    for query in &queries {
        if !query.verify(&map) {
            warn!("query {} has an impassable endpoint, skipping", query.id);
            continue;
        }
        match config.engine.as_str() {
            "delay" => run_delay(&map, query)?,
            "sfbds" => run_sfbds(&map, query, &config)?,
            _ => unreachable!(),
        }
    }

    Ok(())
}

fn run_delay(map: &Map, query: &Query) -> Result<()> {
    let mut searcher = DelayAStar::new(map);
    let solve_start = Instant::now();
    match searcher.search_all(query.start, query.goal)? {
        Some(solution) => {
            if !solution.verify(map) {
                return Err(anyhow!("query {} produced an invalid path", query.id));
            }
            info!(
                "delay query {} cost {:?} path length {:?} time(microseconds) {:?}",
                query.id,
                solution.cost,
                solution.path.len(),
                solve_start.elapsed().as_micros()
            );
        }
        None => info!("delay query {}: no path", query.id),
    }
    searcher.stats().print();
    Ok(())
}

fn run_sfbds(map: &Map, query: &Query, config: &Config) -> Result<()> {
    let mode = ExpandSideMode::from_index(config.expansion_side_mode)
        .ok_or_else(|| anyhow!("invalid expansion side mode"))?;
    let mut searcher = SfbdsAStar::new(map, mode).with_seed(config.seed);
    let solve_start = Instant::now();
    match searcher.search_all(query.start, query.goal)? {
        Some(solution) => {
            if !solution.verify(map) {
                return Err(anyhow!("query {} produced an invalid path", query.id));
            }
            info!(
                "sfbds query {} cost {:?} path length {:?} time(microseconds) {:?}",
                query.id,
                solution.cost,
                solution.path.len(),
                solve_start.elapsed().as_micros()
            );
        }
        None => info!("sfbds query {}: no path", query.id),
    }
    searcher.stats().print();
    Ok(())
}
