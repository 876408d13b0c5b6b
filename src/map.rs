use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::searcher::SearchEnv;

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    pub neighbors: Vec<(usize, usize)>,
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

/// Grid world in the MovingAI benchmark format. Movement is 4-connected
/// with unit edge costs, so the Manhattan distance is a consistent estimate
/// between any two cells.
#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    pub fn from_file(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening map {path}"))?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let mut header = |name: &str| -> Result<String> {
            lines
                .next()
                .ok_or_else(|| anyhow!("map {path} is truncated before {name}"))?
                .with_context(|| format!("reading {name}"))
        };

        let _type = header("type")?;
        let height = header("height")?
            .split_whitespace()
            .last()
            .ok_or_else(|| anyhow!("missing height value"))?
            .parse::<usize>()?;
        let width = header("width")?
            .split_whitespace()
            .last()
            .ok_or_else(|| anyhow!("missing width value"))?
            .parse::<usize>()?;
        let _map = header("map")?;

        let mut grid = Vec::with_capacity(height);
        for line in lines.take(height) {
            let row: Vec<Tile> = line?
                .chars()
                .map(|ch| Tile {
                    passable: ch == '.',
                    neighbors: Vec::new(),
                })
                .collect();
            grid.push(row);
        }
        if grid.len() != height {
            return Err(anyhow!("map {path} has fewer rows than its header claims"));
        }

        let mut map = Map {
            height,
            width,
            grid,
        };
        map.initialize_neighbors();

        Ok(map)
    }

    fn initialize_neighbors(&mut self) {
        for x in 0..self.height {
            for y in 0..self.width {
                if self.grid[x][y].passable {
                    self.grid[x][y].neighbors = self.compute_neighbors(x, y);
                }
            }
        }
    }

    fn compute_neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        let mut neighbors = Vec::new();

        for &(dx, dy) in &directions {
            let new_x = x as i32 + dx;
            let new_y = y as i32 + dy;
            if new_x >= 0
                && new_y >= 0
                && new_x < self.height as i32
                && new_y < self.width as i32
                && self.grid[new_x as usize][new_y as usize].passable
            {
                neighbors.push((new_x as usize, new_y as usize));
            }
        }

        neighbors
    }

    pub fn get_neighbors(&self, x: usize, y: usize) -> &[(usize, usize)] {
        &self.grid[x][y].neighbors
    }

    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        x < self.height && y < self.width && self.grid[x][y].is_passable()
    }
}

impl SearchEnv for Map {
    type State = (usize, usize);

    fn successors(&self, s: (usize, usize)) -> Vec<(usize, usize)> {
        self.get_neighbors(s.0, s.1).to_vec()
    }

    fn edge_cost(&self, _from: (usize, usize), _to: (usize, usize)) -> f64 {
        1.0
    }

    fn heuristic(&self, from: (usize, usize), to: (usize, usize)) -> f64 {
        let dx = from.0.abs_diff(to.0);
        let dy = from.1.abs_diff(to.1);
        (dx + dy) as f64
    }

    fn is_valid(&self, s: (usize, usize)) -> bool {
        self.is_passable(s.0, s.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::{DelayAStar, ExpandSideMode, Searcher, SfbdsAStar};

    #[test]
    fn test_read_map() {
        let map = Map::from_file("map_file/arena/arena.map").unwrap();

        assert_eq!(map.height, 8);
        assert_eq!(map.width, 8);

        assert!(map.is_passable(0, 0));
        assert!(!map.is_passable(2, 2));
        assert!(map.is_passable(3, 3));
        assert!(!map.is_passable(9, 9));

        // The pocket cell only opens to the south.
        assert_eq!(map.get_neighbors(3, 3).to_vec(), vec![(4, 3)]);
        assert_eq!(map.get_neighbors(0, 0).len(), 2);
    }

    #[test]
    fn test_delay_search_leaves_the_pocket() {
        let map = Map::from_file("map_file/arena/arena.map").unwrap();
        let mut searcher = DelayAStar::new(&map);
        let solution = searcher.search_all((3, 3), (1, 3)).unwrap().unwrap();
        assert_eq!(solution.cost, 10.0);
        assert_eq!(solution.path.len(), 11);
        assert!(solution.verify(&map));
    }

    #[test]
    fn test_sfbds_search_leaves_the_pocket() {
        let map = Map::from_file("map_file/arena/arena.map").unwrap();
        let mut searcher = SfbdsAStar::new(&map, ExpandSideMode::SmallerBranching);
        let solution = searcher.search_all((3, 3), (1, 3)).unwrap().unwrap();
        assert_eq!(solution.cost, 10.0);
        assert!(solution.verify(&map));
    }
}
