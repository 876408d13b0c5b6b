use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::error;

use crate::searcher::SearchEnv;

/// Tolerance for all floating point cost comparisons.
pub(crate) const EPSILON: f64 = 1e-10;

pub(crate) fn fless(a: f64, b: f64) -> bool {
    a < b - EPSILON
}

pub(crate) fn fgreater(a: f64, b: f64) -> bool {
    a > b + EPSILON
}

pub(crate) fn fequal(a: f64, b: f64) -> bool {
    !fless(a, b) && !fgreater(a, b)
}

// Epsilon-tolerant ordering so the priority queues break ties exactly the
// way the scalar comparisons do.
pub(crate) fn fcmp(a: f64, b: f64) -> Ordering {
    if fless(a, b) {
        Ordering::Less
    } else if fgreater(a, b) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub id: usize,
    pub start: (usize, usize),
    pub goal: (usize, usize),
}

impl Query {
    pub fn verify<E>(&self, env: &E) -> bool
    where
        E: SearchEnv<State = (usize, usize)>,
    {
        env.is_valid(self.start) && env.is_valid(self.goal)
    }
}

#[derive(Debug, Clone)]
pub struct Solution<S> {
    pub path: Vec<S>,
    pub cost: f64,
}

impl<S> Solution<S>
where
    S: Copy + Eq + Hash + Ord + Debug,
{
    /// Checks that consecutive states are connected in the environment and
    /// that the edge costs add up to the reported cost.
    pub fn verify<E: SearchEnv<State = S>>(&self, env: &E) -> bool {
        if self.path.is_empty() {
            return fequal(self.cost, 0.0);
        }

        let mut total = 0.0;
        for window in self.path.windows(2) {
            if let [from, to] = window {
                if !env.successors(*from).contains(to) {
                    error!("move step failed: {from:?} -> {to:?}");
                    return false;
                }
                total += env.edge_cost(*from, *to);
            }
        }

        if !fequal(total, self.cost) {
            error!(
                "cost mismatch: path sums to {total}, solution claims {}",
                self.cost
            );
            return false;
        }

        true
    }
}
