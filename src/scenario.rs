use anyhow::{anyhow, Context, Result};
use rand::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use tracing::info;

use crate::common::Query;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub start_x: usize,
    pub start_y: usize,
    pub goal_x: usize,
    pub goal_y: usize,
}

type Bucket = Vec<Route>;

/// A MovingAI `.scen` benchmark file: routes grouped into difficulty
/// buckets over one map.
#[derive(Debug)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub buckets: HashMap<usize, Bucket>,
}

impl Scenario {
    pub fn load_from_scen(path: &str) -> Result<Scenario> {
        let file = File::open(path).with_context(|| format!("opening scenario {path}"))?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        // First line is "version x.x".
        let _version = lines
            .next()
            .ok_or_else(|| anyhow!("scenario {path} is empty"))??;

        let mut scenario = Scenario {
            map: String::new(),
            map_width: 0,
            map_height: 0,
            buckets: HashMap::new(),
        };

        for line in lines {
            let line = line?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                return Err(anyhow!("malformed scenario line: {line:?}"));
            }
            let bucket_index: usize = parts[0].parse()?;

            // Scenario files store (column, row); queries use (row, column).
            let route = Route {
                start_x: parts[5].parse()?,
                start_y: parts[4].parse()?,
                goal_x: parts[7].parse()?,
                goal_y: parts[6].parse()?,
            };

            if scenario.map.is_empty() {
                scenario.map = parts[1].to_string();
                scenario.map_width = parts[2].parse()?;
                scenario.map_height = parts[3].parse()?;
            }

            scenario
                .buckets
                .entry(bucket_index)
                .or_default()
                .push(route);
        }

        Ok(scenario)
    }

    /// Samples `count` distinct routes across all buckets. Deterministic for
    /// a given seed.
    pub fn generate_queries<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Query>> {
        let mut routes: Vec<Route> = self.buckets.values().flatten().cloned().collect();
        routes.sort();

        if routes.len() < count {
            return Err(anyhow!(
                "scenario holds {} routes but {count} queries were requested",
                routes.len()
            ));
        }

        routes.shuffle(rng);
        let queries: Vec<Query> = routes
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(id, route)| Query {
                id,
                start: (route.start_x, route.start_y),
                goal: (route.goal_x, route.goal_y),
            })
            .collect();

        info!("Generated queries: {queries:?}");
        Ok(queries)
    }

    pub fn load_queries_from_yaml(path: &str) -> Result<Vec<Query>> {
        let file = File::open(path).with_context(|| format!("opening queries {path}"))?;
        let reader = BufReader::new(file);
        let queries = serde_yaml::from_reader(reader)?;
        Ok(queries)
    }

    pub fn write_queries_to_yaml(path: &str, queries: &[Query]) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {path}"))?;
        let mut writer = BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(&queries)?;
        writer.write_all(yaml_data.as_bytes())?;
        Ok(())
    }
}
