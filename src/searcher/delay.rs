use std::collections::HashMap;
use tracing::{debug, trace};

use super::comm::{FOrder, FrontierOrder, GOrder, IndexedHeap, SearchNode};
use super::env::SearchEnv;
use super::{SearchError, Searcher, StepResult};
use crate::common::{fgreater, fless};
use crate::stat::DelayStats;

/// A* with delayed re-expansion. Improved closed nodes migrate to a delay
/// queue instead of reentering the main open list, and the scheduler
/// alternates between freshly opened and reopened nodes so neither side can
/// starve the other.
pub struct DelayAStar<'a, E: SearchEnv> {
    env: &'a E,
    goal: Option<E::State>,
    /// Keyed by f-cost; drawing from it advances the threshold.
    open: IndexedHeap<E::State, FOrder>,
    /// Nodes whose f dropped below the threshold, keyed by g-cost.
    f_queue: IndexedHeap<E::State, GOrder>,
    /// Closed nodes whose g improved, keyed by g-cost.
    delay_queue: IndexedHeap<E::State, GOrder>,
    closed: HashMap<E::State, SearchNode<E::State>>,
    f_threshold: f64,
    can_reopen: bool,
    finished: Option<StepResult>,
    path: Vec<E::State>,
    cost: f64,
    stats: DelayStats,
}

impl<'a, E: SearchEnv> DelayAStar<'a, E> {
    pub fn new(env: &'a E) -> Self {
        DelayAStar {
            env,
            goal: None,
            open: IndexedHeap::new(),
            f_queue: IndexedHeap::new(),
            delay_queue: IndexedHeap::new(),
            closed: HashMap::new(),
            f_threshold: 0.0,
            can_reopen: false,
            finished: Some(StepResult::Exhausted),
            path: Vec::new(),
            cost: 0.0,
            stats: DelayStats::default(),
        }
    }

    pub fn stats(&self) -> &DelayStats {
        &self.stats
    }

    /// Selects the next node to expand. Reopened nodes are only eligible
    /// when `can_reopen` is set, and taking one clears the flag.
    fn select(&mut self) -> Option<SearchNode<E::State>> {
        if self.can_reopen && !self.delay_queue.is_empty() && !self.f_queue.is_empty() {
            let delay_g = self.delay_queue.peek().unwrap().g_cost;
            let low_g = self.f_queue.peek().unwrap().g_cost;
            if fless(delay_g, low_g) {
                self.can_reopen = false;
                self.stats.nodes_reopened += 1;
                self.delay_queue.pop()
            } else {
                self.can_reopen = true;
                self.f_queue.pop()
            }
        } else if self.can_reopen && !self.delay_queue.is_empty() {
            self.can_reopen = false;
            self.stats.nodes_reopened += 1;
            self.delay_queue.pop()
        } else if !self.f_queue.is_empty() {
            self.can_reopen = true;
            self.f_queue.pop()
        } else if !self.open.is_empty() {
            self.can_reopen = true;
            let popped = self.open.pop().unwrap();
            // Threshold advances to the popped f; assigning before the pop
            // would read a node that does not exist yet.
            self.f_threshold = popped.f_cost;
            Some(popped)
        } else {
            None
        }
    }

    fn handle_neighbor(
        &mut self,
        neighbor: E::State,
        top: &SearchNode<E::State>,
        goal: E::State,
    ) -> f64 {
        if self.open.contains(&neighbor) {
            improve_in_queue(self.env, &mut self.open, neighbor, top)
        } else if self.closed.contains_key(&neighbor) {
            self.improve_closed(neighbor, top)
        } else if self.delay_queue.contains(&neighbor) {
            improve_in_queue(self.env, &mut self.delay_queue, neighbor, top)
        } else if self.f_queue.contains(&neighbor) {
            improve_in_queue(self.env, &mut self.f_queue, neighbor, top)
        } else {
            self.add_new(neighbor, top, goal)
        }
    }

    fn add_new(&mut self, neighbor: E::State, top: &SearchNode<E::State>, goal: E::State) -> f64 {
        let edge = self.env.edge_cost(top.state, neighbor);
        let g = top.g_cost + edge;
        let h = self.env.heuristic(neighbor, goal);
        let node = SearchNode::new(g + h, g, neighbor, top.state);
        if fless(node.f_cost, self.f_threshold) {
            self.f_queue.push(node);
        } else {
            self.open.push(node);
        }
        edge + h
    }

    /// A cheaper route into a closed node moves it to the delay queue. If
    /// the parent's stored heuristic dominates, pathmax rewrites the child's
    /// heuristic on the way out; a dominating parent alone rewrites it in
    /// place.
    fn improve_closed(&mut self, neighbor: E::State, top: &SearchNode<E::State>) -> f64 {
        let mut n = self.closed[&neighbor];
        let edge = self.env.edge_cost(top.state, neighbor);
        if fless(top.g_cost + edge, n.g_cost) {
            if fgreater(top.h_cost(), n.h_cost()) {
                n.g_cost = top.g_cost + edge;
                n.f_cost = n.g_cost + (top.h_cost() - edge);
            } else {
                let h = n.h_cost();
                n.g_cost = top.g_cost + edge;
                n.f_cost = n.g_cost + h;
            }
            n.parent = top.state;
            self.closed.remove(&neighbor);
            self.delay_queue.push(n);
        } else if fgreater(top.h_cost(), n.h_cost()) {
            n.f_cost = n.g_cost + (top.h_cost() - edge);
            self.closed.insert(neighbor, n);
        }
        edge + n.h_cost()
    }

    /// Walks backpointers from the goal node through the closed map; the
    /// root is the node that points at itself.
    fn reconstruct(&mut self, goal_node: &SearchNode<E::State>) -> Result<(), SearchError> {
        let mut path = Vec::new();
        let mut n = *goal_node;
        loop {
            path.push(n.state);
            if n.is_root() {
                break;
            }
            n = *self
                .closed
                .get(&n.parent)
                .ok_or(SearchError::TracebackFailed)?;
        }
        path.reverse();
        self.cost = goal_node.g_cost;
        self.path = path;
        Ok(())
    }
}

fn improve_in_queue<E: SearchEnv, O: FrontierOrder>(
    env: &E,
    queue: &mut IndexedHeap<E::State, O>,
    neighbor: E::State,
    top: &SearchNode<E::State>,
) -> f64 {
    let mut n = *queue.get(&neighbor).unwrap();
    let edge = env.edge_cost(top.state, neighbor);
    if fless(top.g_cost + edge, n.g_cost) {
        n.f_cost -= n.g_cost;
        n.g_cost = top.g_cost + edge;
        n.f_cost += n.g_cost;
        n.parent = top.state;
        queue.decrease_key(n);
    }
    edge + n.h_cost()
}

impl<'a, E: SearchEnv> Searcher<E> for DelayAStar<'a, E> {
    fn init(&mut self, start: E::State, goal: E::State) -> bool {
        self.open.clear();
        self.f_queue.clear();
        self.delay_queue.clear();
        self.closed.clear();
        self.stats = DelayStats::default();
        self.f_threshold = 0.0;
        self.can_reopen = false;
        self.path.clear();
        self.cost = 0.0;
        self.goal = Some(goal);

        if !self.env.is_valid(start) || !self.env.is_valid(goal) {
            self.finished = Some(StepResult::Exhausted);
            return false;
        }
        if self.env.is_goal(start, goal) {
            self.path.push(start);
            self.finished = Some(StepResult::Succeeded);
            return false;
        }

        self.finished = None;
        let h = self.env.heuristic(start, goal);
        self.open.push(SearchNode::new(h, 0.0, start, start));
        true
    }

    fn step(&mut self) -> Result<StepResult, SearchError> {
        if let Some(status) = self.finished {
            return Ok(status);
        }
        let goal = match self.goal {
            Some(goal) => goal,
            None => return Ok(StepResult::Exhausted),
        };

        let mut top = match self.select() {
            Some(top) => top,
            None => {
                self.finished = Some(StepResult::Exhausted);
                return Ok(StepResult::Exhausted);
            }
        };

        trace!("expand node: {top:?}");

        if self.env.is_goal(top.state, goal) {
            self.reconstruct(&top)?;
            self.finished = Some(StepResult::Succeeded);
            return Ok(StepResult::Succeeded);
        }

        self.stats.nodes_expanded += 1;

        // The smallest edge-plus-child-heuristic over all neighbors bounds
        // this node's own heuristic from below.
        let mut min_cost = f64::INFINITY;
        for neighbor in self.env.successors(top.state) {
            self.stats.nodes_touched += 1;
            let cost = self.handle_neighbor(neighbor, &top, goal);
            if fless(cost, min_cost) {
                min_cost = cost;
            }
        }

        if fless(top.h_cost(), min_cost) {
            debug!(
                "pathmax raises h of {:?} from {} to {}",
                top.state,
                top.h_cost(),
                min_cost
            );
            top.f_cost = top.g_cost + min_cost;
        }
        self.closed.insert(top.state, top);

        trace!(
            "frontiers: open {} low-f {} delay {} closed {}",
            self.open.len(),
            self.f_queue.len(),
            self.delay_queue.len(),
            self.closed.len()
        );

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

    // 0 -1- 1 -1- 2 chain with a zero heuristic.
    fn chain() -> Graph {
        let mut graph = Graph::with_nodes(3);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(1, 2, 1.0);
        graph
    }

    // Optimal route 0->1->2->3->4 costs 13; the direct 0->2 edge is a
    // cheaper-looking detour that closes node 2 suboptimally first. The
    // heuristic is admissible but inconsistent at node 2.
    fn reopen_graph() -> Graph {
        let mut graph = Graph::with_nodes(5);
        graph.add_edge(0, 1, 1.0);
        graph.add_edge(1, 2, 1.0);
        graph.add_edge(0, 2, 3.0);
        graph.add_edge(2, 3, 1.0);
        graph.add_edge(3, 4, 10.0);
        graph.set_heuristic(0, 4, 13.0);
        graph.set_heuristic(1, 4, 12.0);
        graph.set_heuristic(2, 4, 0.0);
        graph.set_heuristic(3, 4, 10.0);
        graph
    }

    #[test]
    fn test_trivial_query() {
        let graph = chain();
        let mut searcher = DelayAStar::new(&graph);
        assert!(!searcher.init(1, 1));
        assert_eq!(searcher.step().unwrap(), StepResult::Succeeded);
        assert_eq!(searcher.path(), &[1]);
        assert_eq!(searcher.cost(), 0.0);
        assert_eq!(searcher.stats().nodes_expanded, 0);
    }

    #[test]
    fn test_invalid_query() {
        let graph = chain();
        let mut searcher = DelayAStar::new(&graph);
        let solution = searcher.search_all(0, 7).unwrap();
        assert!(solution.is_none());
        assert!(searcher.path().is_empty());
    }

    #[test]
    fn test_straight_line() {
        let graph = chain();
        let mut searcher = DelayAStar::new(&graph);
        let solution = searcher.search_all(0, 2).unwrap().unwrap();
        assert_eq!(solution.path, vec![0, 1, 2]);
        assert_eq!(solution.cost, 2.0);
        assert!(solution.verify(&graph));
        assert_eq!(searcher.stats().nodes_expanded, 2);
        assert_eq!(searcher.stats().nodes_reopened, 0);
    }

    #[test]
    fn test_pathmax_diamond_keeps_optimal_path() {
        // 0 -1- 1 -1- 3 against 0 -1- 2 -5- 3, with an overestimating
        // heuristic at node 2.
        let mut graph = Graph::with_nodes(4);
        graph.add_undirected_edge(0, 1, 1.0);
        graph.add_undirected_edge(1, 3, 1.0);
        graph.add_undirected_edge(0, 2, 1.0);
        graph.add_undirected_edge(2, 3, 5.0);
        graph.set_heuristic(0, 3, 1.0);
        graph.set_heuristic(1, 3, 0.0);
        graph.set_heuristic(2, 3, 10.0);

        let mut searcher = DelayAStar::new(&graph);
        let solution = searcher.search_all(0, 3).unwrap().unwrap();
        assert_eq!(solution.path, vec![0, 1, 3]);
        assert_eq!(solution.cost, 2.0);
        assert_eq!(searcher.stats().nodes_reopened, 0);
        // Expansion of 1 raises its stored heuristic to edge + h(3).
        assert_eq!(searcher.closed[&1].h_cost(), 1.0);
    }

    #[test]
    fn test_reopen_through_delay_queue() {
        let graph = reopen_graph();
        let mut searcher = DelayAStar::new(&graph);
        let solution = searcher.search_all(0, 4).unwrap().unwrap();
        assert_eq!(solution.path, vec![0, 1, 2, 3, 4]);
        assert_eq!(solution.cost, 13.0);
        assert!(solution.verify(&graph));
        assert_eq!(searcher.stats().nodes_reopened, 1);
    }

    #[test]
    fn test_threshold_never_decreases() {
        let graph = reopen_graph();
        let mut searcher = DelayAStar::new(&graph);
        assert!(searcher.init(0, 4));

        let mut last_threshold = searcher.f_threshold;
        loop {
            let status = searcher.step().unwrap();
            assert!(!fless(searcher.f_threshold, last_threshold));
            last_threshold = searcher.f_threshold;
            if status != StepResult::InProgress {
                break;
            }
        }
    }

    #[test]
    fn test_closed_pathmax_in_place() {
        // Node 2 closes with a weak heuristic; expanding node 1 later
        // dominates it and rewrites the stored value without reopening.
        let mut graph = Graph::with_nodes(4);
        graph.add_edge(0, 1, 1.0);
        graph.add_edge(0, 2, 1.0);
        graph.add_edge(1, 2, 1.0);
        graph.add_edge(2, 0, 1.0);
        graph.set_heuristic(1, 3, 5.0);

        let mut searcher = DelayAStar::new(&graph);
        assert!(searcher.init(0, 3));
        while searcher.step().unwrap() == StepResult::InProgress {}

        assert_eq!(searcher.finished, Some(StepResult::Exhausted));
        assert!(searcher.path().is_empty());
        assert_eq!(searcher.closed[&2].h_cost(), 4.0);
        assert_eq!(searcher.stats().nodes_reopened, 0);
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let graph = reopen_graph();
        let mut first = DelayAStar::new(&graph);
        let mut second = DelayAStar::new(&graph);

        // Double init must leave the core in the same observable state.
        second.init(0, 4);
        let a = first.search_all(0, 4).unwrap().unwrap();
        let b = second.search_all(0, 4).unwrap().unwrap();

        assert_eq!(a.path, b.path);
        assert_eq!(a.cost, b.cost);
        assert_eq!(first.stats().nodes_expanded, second.stats().nodes_expanded);
        assert_eq!(first.stats().nodes_touched, second.stats().nodes_touched);
        assert_eq!(first.stats().nodes_reopened, second.stats().nodes_reopened);
    }
}
