use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use tracing::trace;

use super::comm::{update_coming_from, OpenPair, PairKey, PairNode};
use super::env::SearchEnv;
use super::{SearchError, Searcher, StepResult};
use crate::common::{fequal, fgreater, fless};
use crate::stat::SfbdsStats;

/// Which endpoint of the current pair to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandSideMode {
    /// Always expand the start side.
    AlwaysStart,
    /// Always expand the goal side.
    AlwaysGoal,
    /// Expand the side with the smaller out-degree; keep direction on ties.
    SmallerBranching,
    /// Random, weighted by the two out-degrees.
    RandomByBranching,
    /// Expand the side whose neighbors average the higher estimate to the
    /// opposite endpoint; keep direction on ties.
    HigherAverageH,
    /// Switch sides exactly when both out-degrees are 2.
    JumpOnDegreeTwo,
}

impl ExpandSideMode {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ExpandSideMode::AlwaysStart),
            1 => Some(ExpandSideMode::AlwaysGoal),
            2 => Some(ExpandSideMode::SmallerBranching),
            3 => Some(ExpandSideMode::RandomByBranching),
            4 => Some(ExpandSideMode::HigherAverageH),
            5 => Some(ExpandSideMode::JumpOnDegreeTwo),
            _ => None,
        }
    }
}

/// Single-frontier bidirectional A*. One priority queue holds pairs of a
/// start-side and a goal-side state; each expansion picks a side, and the
/// search ends when a popped pair has met in the middle. Heuristic values
/// are kept consistent across expansions with bidirectional pathmax.
pub struct SfbdsAStar<'a, E: SearchEnv> {
    env: &'a E,
    mode: ExpandSideMode,
    rng: StdRng,
    open: BinaryHeap<OpenPair<E::State>>,
    closed: HashMap<PairKey<E::State>, PairNode<E::State>>,
    // Per-side best g seen, consulted only when dominance pruning is on.
    distances_from_start: HashMap<E::State, f64>,
    distances_from_goal: HashMap<E::State, f64>,
    dominance_pruning: bool,
    sanity_f: f64,
    finished: Option<StepResult>,
    path: Vec<E::State>,
    cost: f64,
    stats: SfbdsStats,
}

impl<'a, E: SearchEnv> SfbdsAStar<'a, E> {
    pub fn new(env: &'a E, mode: ExpandSideMode) -> Self {
        SfbdsAStar {
            env,
            mode,
            rng: StdRng::seed_from_u64(0),
            open: BinaryHeap::new(),
            closed: HashMap::new(),
            distances_from_start: HashMap::new(),
            distances_from_goal: HashMap::new(),
            dominance_pruning: false,
            sanity_f: 0.0,
            finished: Some(StepResult::Exhausted),
            path: Vec::new(),
            cost: 0.0,
            stats: SfbdsStats::default(),
        }
    }

    /// Reseeds the source consumed by `RandomByBranching`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Prunes pairs whose projected per-side g is worse than one already
    /// seen for that state. Off by default; it can interact poorly with the
    /// pathmax propagation.
    pub fn with_dominance_pruning(mut self, enabled: bool) -> Self {
        self.dominance_pruning = enabled;
        self
    }

    pub fn stats(&self) -> &SfbdsStats {
        &self.stats
    }

    /// Pops until an eligible pair is found. Returns the pair together with
    /// the closed entry it supersedes, if any.
    fn pop_eligible(
        &mut self,
    ) -> Result<Option<(PairNode<E::State>, Option<PairNode<E::State>>)>, SearchError> {
        while let Some(OpenPair(q)) = self.open.pop() {
            self.stats.nodes_popped += 1;

            if fgreater(self.sanity_f, q.f) {
                self.finished = Some(StepResult::Exhausted);
                return Err(SearchError::MonotonicityViolated {
                    previous: self.sanity_f,
                    current: q.f,
                });
            }
            self.sanity_f = self.sanity_f.max(q.f);

            if q.is_terminal() {
                return Ok(Some((q, None)));
            }

            if self.dominance_pruning {
                match self.distances_from_start.get(&q.s1) {
                    Some(&d) if fless(d, q.g1) => {
                        self.stats.distance_prunes += 1;
                        continue;
                    }
                    _ => {
                        self.distances_from_start.insert(q.s1, q.g1);
                    }
                }
                match self.distances_from_goal.get(&q.s2) {
                    Some(&d) if fless(d, q.g2) => {
                        self.stats.distance_prunes += 1;
                        continue;
                    }
                    _ => {
                        self.distances_from_goal.insert(q.s2, q.g2);
                    }
                }
            }

            let key = PairKey::new(q.s1, q.s2);
            if let Some(prev) = self.closed.get(&key).copied() {
                if !fless(q.total_g(), prev.total_g()) {
                    self.stats.closed_prunes += 1;
                    continue;
                }
                return Ok(Some((q, Some(prev))));
            }
            return Ok(Some((q, None)));
        }
        Ok(None)
    }

    /// The side-selection heuristic. True means expand `s1`. Also counts a
    /// jump whenever the decision flips the side of the previous expansion.
    fn expand_side(&mut self, q: &PairNode<E::State>) -> bool {
        let result = match self.mode {
            ExpandSideMode::AlwaysStart => return true,
            ExpandSideMode::AlwaysGoal => return false,
            ExpandSideMode::SmallerBranching => {
                let num_start = self.env.successors(q.s1).len();
                let num_goal = self.env.successors(q.s2).len();
                if num_start == num_goal && q.has_parent() {
                    return !q.last_from_p2();
                }
                num_start <= num_goal
            }
            ExpandSideMode::RandomByBranching => {
                let num_start = self.env.successors(q.s1).len();
                let num_goal = self.env.successors(q.s2).len();
                let total = num_start + num_goal;
                if total == 0 {
                    true
                } else {
                    self.rng.gen_range(0..total) < num_start
                }
            }
            ExpandSideMode::HigherAverageH => {
                let h_start = self.average_h(q.s1, q.s2);
                let h_goal = self.average_h(q.s2, q.s1);
                if fequal(h_start, h_goal) && q.has_parent() {
                    return !q.last_from_p2();
                }
                !fless(h_start, h_goal)
            }
            ExpandSideMode::JumpOnDegreeTwo => {
                let num_start = self.env.successors(q.s1).len();
                let num_goal = self.env.successors(q.s2).len();
                if num_start == 2 && num_goal == 2 {
                    q.last_from_p2()
                } else if num_start == 2 {
                    false
                } else if num_goal == 2 {
                    true
                } else {
                    return !q.last_from_p2();
                }
            }
        };

        if q.has_parent() && q.last_from_p2() == result {
            self.stats.jumps += 1;
        }
        result
    }

    fn average_h(&self, side: E::State, opposite: E::State) -> f64 {
        let successors = self.env.successors(side);
        if successors.is_empty() {
            return 0.0;
        }
        let total: f64 = successors
            .iter()
            .map(|&s| self.env.heuristic(s, opposite))
            .sum();
        total / successors.len() as f64
    }

    /// Rebuilds the start-to-goal sequence from the terminal pair, appending
    /// goal-side steps to the tail and start-side steps to the head, and
    /// counts the side switches that survive into the solution.
    fn trace_back(&mut self, terminal: &PairNode<E::State>) -> Result<Vec<E::State>, SearchError> {
        debug_assert!(terminal.is_terminal());

        self.stats.jumps_in_solution = 0;
        let mut last_from_p2 = terminal.last_from_p2();
        let mut path = VecDeque::new();
        path.push_back(terminal.s1);

        let mut q = *terminal;
        while q.has_parent() {
            if q.last_from_p2() != last_from_p2 {
                last_from_p2 = q.last_from_p2();
                self.stats.jumps_in_solution += 1;
            }

            if q.last_from_p2() {
                path.push_back(q.p2);
                q.s2 = q.p2;
            } else {
                path.push_front(q.p1);
                q.s1 = q.p1;
            }

            let key = PairKey::new(q.s1, q.s2);
            q = *self
                .closed
                .get(&key)
                .ok_or(SearchError::TracebackFailed)?;
        }

        // A trailing goal-side segment counts as one more switch, since the
        // path is read out from the start side.
        if last_from_p2 {
            self.stats.jumps_in_solution += 1;
        }

        Ok(path.into())
    }
}

impl<'a, E: SearchEnv> Searcher<E> for SfbdsAStar<'a, E> {
    fn init(&mut self, start: E::State, goal: E::State) -> bool {
        self.open.clear();
        self.closed.clear();
        self.distances_from_start.clear();
        self.distances_from_goal.clear();
        self.stats = SfbdsStats::default();
        self.path.clear();
        self.cost = 0.0;

        if !self.env.is_valid(start) || !self.env.is_valid(goal) {
            self.finished = Some(StepResult::Exhausted);
            return false;
        }
        if start == goal {
            self.path.push(start);
            self.finished = Some(StepResult::Succeeded);
            return false;
        }

        self.finished = None;
        let root = PairNode::root(start, goal, self.env.heuristic(start, goal));
        self.sanity_f = root.f;
        self.open.push(OpenPair(root));
        true
    }

    fn step(&mut self) -> Result<StepResult, SearchError> {
        if let Some(status) = self.finished {
            return Ok(status);
        }

        let (mut current, reopened) = match self.pop_eligible()? {
            Some(found) => found,
            None => {
                self.finished = Some(StepResult::Exhausted);
                return Ok(StepResult::Exhausted);
            }
        };

        if current.is_terminal() {
            self.cost = current.total_g();
            self.path = self.trace_back(&current)?;
            self.finished = Some(StepResult::Succeeded);
            return Ok(StepResult::Succeeded);
        }

        if reopened.is_some() {
            self.stats.reopened_nodes += 1;
        }

        let expand_first = self.expand_side(&current);
        let coord = if expand_first { current.s1 } else { current.s2 };
        trace!(
            "expanding pair ({:?}, {:?}) on the {} side",
            current.s1,
            current.s2,
            if expand_first { "s1" } else { "s2" }
        );
        self.stats.nodes_expanded += 1;

        // The pair's own heuristic; a reopened pair keeps the better of its
        // old and new values before propagation.
        let mut max_root_h = match &reopened {
            Some(prev) => current.h_cost().max(prev.h_cost()),
            None => current.h_cost(),
        };

        let mut successors = Vec::new();
        for next in self.env.successors(coord) {
            self.stats.successors_touched += 1;

            let mut child = current;
            let transit;
            if expand_first {
                child.p1 = current.s1;
                child.p2 = current.p2;
                child.coming_from = update_coming_from(current.coming_from, true);
                child.s1 = next;
                transit = self.env.edge_cost(current.s1, next);
                child.g1 = current.g1 + transit;

                if self.dominance_pruning {
                    match self.distances_from_start.get(&child.s1) {
                        Some(&d) if fless(d, child.g1) => {
                            self.stats.distance_successor_prunes += 1;
                            continue;
                        }
                        _ => {
                            self.distances_from_start.insert(child.s1, child.g1);
                        }
                    }
                }
            } else {
                child.p2 = current.s2;
                child.p1 = current.p1;
                child.coming_from = update_coming_from(current.coming_from, false);
                child.s2 = next;
                transit = self.env.edge_cost(current.s2, next);
                child.g2 = current.g2 + transit;

                if self.dominance_pruning {
                    match self.distances_from_goal.get(&child.s2) {
                        Some(&d) if fless(d, child.g2) => {
                            self.stats.distance_successor_prunes += 1;
                            continue;
                        }
                        _ => {
                            self.distances_from_goal.insert(child.s2, child.g2);
                        }
                    }
                }
            }

            let key = PairKey::new(child.s1, child.s2);
            if let Some(prev) = self.closed.get(&key) {
                if !fless(child.total_g(), prev.total_g()) {
                    continue;
                }
            }

            let h = self.env.heuristic(child.s1, child.s2);
            child.f = child.total_g() + h;
            successors.push(child);

            // A child's estimate minus the connecting edge lower-bounds the
            // pair's own estimate under consistency.
            max_root_h = max_root_h.max(h - transit);
        }

        if fless(current.f, current.total_g() + max_root_h) {
            current.f = current.total_g() + max_root_h;
            self.stats.bpmx_updates += 1;
        }
        self.closed
            .insert(PairKey::new(current.s1, current.s2), current);

        // Second pass: lift weak successors up to what the pair now knows.
        for mut child in successors {
            let transit = child.total_g() - current.total_g();
            if fless(child.h_cost(), max_root_h - transit) {
                child.f = child.total_g() + (max_root_h - transit);
                self.stats.bpmx_updates += 1;
            }
            self.open.push(OpenPair(child));
        }

        Ok(StepResult::InProgress)
    }

    fn path(&self) -> &[E::State] {
        &self.path
    }

    fn cost(&self) -> f64 {
        self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::Graph;

    fn chain() -> Graph {
        let mut graph = Graph::with_nodes(3);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(1, 2, 1.0);
        graph
    }

    // Two parallel joints on the goal side: 0-1-2-3, then 3-4-6 and 3-5-6.
    // Dead-end stubs 7 and 8 hang off node 2 so the branching heuristic
    // parks the start side there while the goal side crosses the diamond,
    // which generates the pair (2,3) twice.
    fn diamond_tail() -> Graph {
        let mut graph = Graph::with_nodes(9);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(1, 2, 1.0);
        graph.add_undirected_edge(2, 3, 1.0);
        graph.add_undirected_edge(2, 7, 1.0);
        graph.add_undirected_edge(2, 8, 1.0);
        graph.add_undirected_edge(3, 4, 1.0);
        graph.add_undirected_edge(4, 6, 1.0);
        graph.add_undirected_edge(3, 5, 1.0);
        graph.add_undirected_edge(5, 6, 1.0);
        graph
    }

    #[test]
    fn test_trivial_query() {
        let graph = chain();
        let mut searcher = SfbdsAStar::new(&graph, ExpandSideMode::AlwaysStart);
        assert!(!searcher.init(1, 1));
        assert_eq!(searcher.step().unwrap(), StepResult::Succeeded);
        assert_eq!(searcher.path(), &[1]);
        assert_eq!(searcher.cost(), 0.0);
        assert_eq!(searcher.stats().nodes_expanded, 0);
    }

    #[test]
    fn test_forward_only_chain() {
        let graph = chain();
        let mut searcher = SfbdsAStar::new(&graph, ExpandSideMode::AlwaysStart);
        let solution = searcher.search_all(0, 2).unwrap().unwrap();
        assert_eq!(solution.path, vec![0, 1, 2]);
        assert_eq!(solution.cost, 2.0);
        assert_eq!(searcher.stats().jumps, 0);
        assert_eq!(searcher.stats().jumps_in_solution, 0);
    }

    #[test]
    fn test_backward_only_chain() {
        let graph = chain();
        let mut searcher = SfbdsAStar::new(&graph, ExpandSideMode::AlwaysGoal);
        let solution = searcher.search_all(0, 2).unwrap().unwrap();
        assert_eq!(solution.path, vec![0, 1, 2]);
        assert_eq!(solution.cost, 2.0);
        // The whole solution was built from the goal side, which reads as a
        // single switch from the start's perspective.
        assert_eq!(searcher.stats().jumps_in_solution, 1);
    }

    #[test]
    fn test_symmetric_pair_pruning() {
        let graph = diamond_tail();
        let mut searcher = SfbdsAStar::new(&graph, ExpandSideMode::SmallerBranching);
        let solution = searcher.search_all(0, 6).unwrap().unwrap();
        // Either joint of the diamond is an optimal answer.
        assert!(
            solution.path == vec![0, 1, 2, 3, 4, 6] || solution.path == vec![0, 1, 2, 3, 5, 6],
            "unexpected path {:?}",
            solution.path
        );
        assert_eq!(solution.cost, 5.0);
        assert!(solution.verify(&graph));
        assert!(searcher.stats().closed_prunes >= 1);
        assert!(searcher.stats().jumps >= 1);
        assert_eq!(searcher.stats().jumps_in_solution, 1);
    }

    #[test]
    fn test_bpmx_raises_root_and_siblings() {
        // The branch toward node 1 reveals a large estimate that the pair
        // itself and its sibling branch are missing.
        let mut graph = Graph::with_nodes(4);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(0, 2, 1.0);
        graph.add_undirected_edge(2, 3, 1.0);
        graph.set_heuristic(1, 3, 10.0);

        let mut searcher = SfbdsAStar::new(&graph, ExpandSideMode::AlwaysStart);
        assert!(searcher.init(0, 3));

        let mut last_f = searcher.sanity_f;
        loop {
            let status = searcher.step().unwrap();
            assert!(!fless(searcher.sanity_f, last_f));
            last_f = searcher.sanity_f;
            if status != StepResult::InProgress {
                break;
            }
        }

        assert_eq!(searcher.path(), &[0, 2, 3]);
        assert_eq!(searcher.cost(), 2.0);
        assert!(searcher.stats().bpmx_updates >= 1);
    }

    #[test]
    fn test_random_mode_is_seeded() {
        let graph = diamond_tail();
        let mut first =
            SfbdsAStar::new(&graph, ExpandSideMode::RandomByBranching).with_seed(42);
        let mut second =
            SfbdsAStar::new(&graph, ExpandSideMode::RandomByBranching).with_seed(42);

        let a = first.search_all(0, 6).unwrap().unwrap();
        let b = second.search_all(0, 6).unwrap().unwrap();
        assert_eq!(a.path, b.path);
        assert_eq!(a.cost, 5.0);
        assert_eq!(
            first.stats().nodes_expanded,
            second.stats().nodes_expanded
        );
    }

    #[test]
    fn test_remaining_modes_stay_optimal() {
        let graph = diamond_tail();
        for mode in [ExpandSideMode::HigherAverageH, ExpandSideMode::JumpOnDegreeTwo] {
            let mut searcher = SfbdsAStar::new(&graph, mode);
            let solution = searcher.search_all(0, 6).unwrap().unwrap();
            assert_eq!(solution.cost, 5.0, "mode {mode:?}");
            assert!(solution.verify(&graph));
        }
    }

    #[test]
    fn test_dominance_pruning_keeps_optimal_cost() {
        let graph = diamond_tail();
        let mut searcher =
            SfbdsAStar::new(&graph, ExpandSideMode::SmallerBranching).with_dominance_pruning(true);
        let solution = searcher.search_all(0, 6).unwrap().unwrap();
        assert_eq!(solution.cost, 5.0);
        assert!(solution.verify(&graph));
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let graph = diamond_tail();
        let mut first = SfbdsAStar::new(&graph, ExpandSideMode::SmallerBranching);
        let mut second = SfbdsAStar::new(&graph, ExpandSideMode::SmallerBranching);

        second.init(0, 6);
        let a = first.search_all(0, 6).unwrap().unwrap();
        let b = second.search_all(0, 6).unwrap().unwrap();

        assert_eq!(a.path, b.path);
        assert_eq!(a.cost, b.cost);
        assert_eq!(first.stats().nodes_popped, second.stats().nodes_popped);
        assert_eq!(first.stats().closed_prunes, second.stats().closed_prunes);
        assert_eq!(first.stats().jumps, second.stats().jumps);
    }

    #[test]
    fn test_exhausted_on_disconnected_goal() {
        let mut graph = Graph::with_nodes(4);
        graph.add_undirected_edge(0, 1, 1.0);
        // Node 3 is valid but unreachable.
        let mut searcher = SfbdsAStar::new(&graph, ExpandSideMode::SmallerBranching);
        let solution = searcher.search_all(0, 3).unwrap();
        assert!(solution.is_none());
        assert!(searcher.path().is_empty());
    }
}
