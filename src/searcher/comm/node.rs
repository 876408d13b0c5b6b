/// One visited state. The backpointer tree is rooted at the start, which is
/// encoded as a self-reference (`parent == state`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SearchNode<S> {
    pub(crate) state: S,
    pub(crate) g_cost: f64,
    pub(crate) f_cost: f64,
    pub(crate) parent: S,
}

impl<S: Copy> SearchNode<S> {
    pub(crate) fn new(f_cost: f64, g_cost: f64, state: S, parent: S) -> Self {
        SearchNode {
            state,
            g_cost,
            f_cost,
            parent,
        }
    }

    /// The stored heuristic. May have been rewritten by pathmax since the
    /// node was created.
    pub(crate) fn h_cost(&self) -> f64 {
        self.f_cost - self.g_cost
    }

    pub(crate) fn is_root(&self) -> bool
    where
        S: Eq,
    {
        self.state == self.parent
    }
}
