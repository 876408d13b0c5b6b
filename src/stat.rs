use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct DelayStats {
    pub nodes_expanded: usize,
    pub nodes_touched: usize,
    pub nodes_reopened: usize,
}

impl DelayStats {
    pub fn print(&self) {
        info!(
            "Nodes expanded {:?} Nodes touched {:?} Nodes reopened {:?}",
            self.nodes_expanded, self.nodes_touched, self.nodes_reopened
        );
    }
}

#[derive(Debug, Clone, Default)]
pub struct SfbdsStats {
    pub nodes_expanded: usize,
    pub nodes_popped: usize,
    pub successors_touched: usize,
    pub closed_prunes: usize,
    pub reopened_nodes: usize,
    pub bpmx_updates: usize,
    pub jumps: usize,
    pub jumps_in_solution: usize,
    pub distance_prunes: usize,
    pub distance_successor_prunes: usize,
}

impl SfbdsStats {
    pub fn print(&self) {
        info!(
            "Nodes expanded {:?} Nodes popped {:?} Successors touched {:?} Closed prunes {:?} Reopened {:?} BPMX updates {:?} Jumps {:?} Jumps in solution {:?}",
            self.nodes_expanded,
            self.nodes_popped,
            self.successors_touched,
            self.closed_prunes,
            self.reopened_nodes,
            self.bpmx_updates,
            self.jumps,
            self.jumps_in_solution
        );
        if self.distance_prunes > 0 || self.distance_successor_prunes > 0 {
            info!(
                "Distance prunes {:?} Distance successor prunes {:?}",
                self.distance_prunes, self.distance_successor_prunes
            );
        }
    }
}
