use std::fmt::Debug;
use std::hash::Hash;

/// Capability set the search cores consume from the host graph. All
/// operations are pure; the cores never mutate the environment.
pub trait SearchEnv {
    type State: Copy + Eq + Hash + Ord + Debug;

    /// Finite set of states reachable from `s` in one move.
    fn successors(&self, s: Self::State) -> Vec<Self::State>;

    /// Non-negative cost of the edge from `from` to `to`. Only defined when
    /// `to` is a successor of `from`.
    fn edge_cost(&self, from: Self::State, to: Self::State) -> f64;

    /// Admissible estimate of the cost between two arbitrary states.
    fn heuristic(&self, from: Self::State, to: Self::State) -> f64;

    fn is_goal(&self, s: Self::State, goal: Self::State) -> bool {
        s == goal
    }

    /// Whether `s` names a real state of the environment. Searches seeded
    /// with an invalid endpoint terminate immediately with no path.
    fn is_valid(&self, _s: Self::State) -> bool {
        true
    }
}
