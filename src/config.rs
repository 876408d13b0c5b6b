use anyhow::bail;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::searcher::ExpandSideMode;

#[derive(Parser, Debug)]
#[command(
    name = "rust-sfbds",
    about = "Delay A* and single-frontier bidirectional A* search implemented in Rust.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, short, help = "Path to the YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Search engine to run: delay or sfbds")]
    pub engine: Option<String>,

    #[arg(long, help = "Path to the map file")]
    pub map: Option<String>,

    #[arg(long, help = "Path to the scenario file")]
    pub scen: Option<String>,

    #[arg(long, help = "Expansion side mode for sfbds (0-5)")]
    pub mode: Option<u8>,

    #[arg(long, help = "YAML file of fixed queries, bypassing scenario sampling")]
    pub queries: Option<String>,

    #[arg(long, help = "Number of queries to sample from the scenario")]
    pub num_queries: Option<usize>,

    #[arg(long, help = "Seed for query sampling and side mode 3")]
    pub seed: Option<u64>,
}

#[derive(Serialize, Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub map_path: String,
    pub scen_path: String,
    pub queries_path: Option<String>,
    pub engine: String,
    pub expansion_side_mode: u8,
    pub num_queries: usize,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map_path: "map_file/arena/arena.map".to_string(),
            scen_path: "map_file/arena/arena-random-1.scen".to_string(),
            queries_path: None,
            engine: "delay".to_string(),
            expansion_side_mode: 2,
            num_queries: 2,
            seed: 0,
        }
    }
}

impl Config {
    pub fn from_yaml_str(config_str: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(config_str)?;
        config.validate()
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(engine) = &cli.engine {
            self.engine = engine.clone();
        }
        if let Some(map) = &cli.map {
            self.map_path = map.clone();
        }
        if let Some(scen) = &cli.scen {
            self.scen_path = scen.clone();
        }
        if let Some(queries) = &cli.queries {
            self.queries_path = Some(queries.clone());
        }
        if let Some(mode) = cli.mode {
            self.expansion_side_mode = mode;
        }
        if let Some(num_queries) = cli.num_queries {
            self.num_queries = num_queries;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        self.validate()
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        if !matches!(self.engine.as_str(), "delay" | "sfbds") {
            bail!("unknown engine {:?}, expected delay or sfbds", self.engine);
        }
        if ExpandSideMode::from_index(self.expansion_side_mode).is_none() {
            bail!(
                "expansion side mode {} is out of range (0-5)",
                self.expansion_side_mode
            );
        }
        if self.num_queries == 0 {
            bail!("num_queries must be at least 1");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = Config::from_yaml_str("engine: sfbds\nexpansion_side_mode: 5\n").unwrap();
        assert_eq!(config.engine, "sfbds");
        assert_eq!(config.expansion_side_mode, 5);
        // Untouched fields keep their defaults.
        assert_eq!(config.num_queries, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::from_yaml_str("engine: dijkstra\n").is_err());
        assert!(Config::from_yaml_str("expansion_side_mode: 6\n").is_err());
        assert!(Config::from_yaml_str("num_queries: 0\n").is_err());
    }
}
