mod comm;
mod delay;
mod env;
mod graph;
mod sfbds;

pub use delay::DelayAStar;
pub use env::SearchEnv;
pub use graph::Graph;
pub use sfbds::{ExpandSideMode, SfbdsAStar};

use thiserror::Error;

use crate::common::Solution;

/// Outcome of driving a search one expansion forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    InProgress,
    Succeeded,
    Exhausted,
}

/// Fatal faults. These indicate a broken collaborator (for instance an
/// inadmissible heuristic handed to a core that assumes consistency), not a
/// user error; the search aborts and cannot be resumed.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("f-cost decreased from {previous} to {current} although BPMX is active")]
    MonotonicityViolated { previous: f64, current: f64 },
    #[error("could not retrace the solution: no closed ancestor for the current pair")]
    TracebackFailed,
}

/// Common driving surface of both search cores. A search is seeded with
/// `init`, then either stepped one expansion at a time or run to completion
/// with `search_all`.
pub trait Searcher<E: SearchEnv> {
    /// Seeds the search. Returns false when the problem is trivial (equal or
    /// invalid endpoints); the terminal status is then already available
    /// from `step`.
    fn init(&mut self, start: E::State, goal: E::State) -> bool;

    fn step(&mut self) -> Result<StepResult, SearchError>;

    fn path(&self) -> &[E::State];

    fn cost(&self) -> f64;

    /// Runs the search to termination. `None` means the frontier emptied
    /// before the goal was found, which is not an error.
    fn search_all(
        &mut self,
        start: E::State,
        goal: E::State,
    ) -> Result<Option<Solution<E::State>>, SearchError> {
        self.init(start, goal);
        loop {
            match self.step()? {
                StepResult::InProgress => continue,
                StepResult::Succeeded => {
                    return Ok(Some(Solution {
                        path: self.path().to_vec(),
                        cost: self.cost(),
                    }))
                }
                StepResult::Exhausted => return Ok(None),
            }
        }
    }
}
