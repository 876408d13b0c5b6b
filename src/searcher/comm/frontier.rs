use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use super::SearchNode;
use crate::common::{fcmp, fgreater};

/// Priority relation for a frontier. `Ordering::Less` means "expand first".
pub(crate) trait FrontierOrder {
    fn cmp<S: Ord>(a: &SearchNode<S>, b: &SearchNode<S>) -> Ordering;
}

/// f-cost ordering with larger g first on ties, as the main open list wants.
pub(crate) struct FOrder;

impl FrontierOrder for FOrder {
    fn cmp<S: Ord>(a: &SearchNode<S>, b: &SearchNode<S>) -> Ordering {
        fcmp(a.f_cost, b.f_cost)
            .then_with(|| {
                if fgreater(a.g_cost, b.g_cost) {
                    Ordering::Less
                } else if fgreater(b.g_cost, a.g_cost) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a.state.cmp(&b.state))
    }
}

/// g-cost ordering for the delay and low-f queues.
pub(crate) struct GOrder;

impl FrontierOrder for GOrder {
    fn cmp<S: Ord>(a: &SearchNode<S>, b: &SearchNode<S>) -> Ordering {
        fcmp(a.g_cost, b.g_cost)
            .then_with(|| fcmp(a.f_cost, b.f_cost))
            .then_with(|| a.state.cmp(&b.state))
    }
}

/// Binary min-heap over search nodes with a state-to-slot map, so membership
/// tests and decrease-key by state are O(1)/O(log n). One concrete variant
/// per ordering key, selected by the `O` parameter.
pub(crate) struct IndexedHeap<S, O> {
    heap: Vec<SearchNode<S>>,
    slots: HashMap<S, usize>,
    _order: PhantomData<O>,
}

impl<S, O> IndexedHeap<S, O>
where
    S: Copy + Eq + Hash + Ord + Debug,
    O: FrontierOrder,
{
    pub(crate) fn new() -> Self {
        IndexedHeap {
            heap: Vec::new(),
            slots: HashMap::new(),
            _order: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.slots.clear();
    }

    pub(crate) fn contains(&self, state: &S) -> bool {
        self.slots.contains_key(state)
    }

    pub(crate) fn get(&self, state: &S) -> Option<&SearchNode<S>> {
        self.slots.get(state).map(|&slot| &self.heap[slot])
    }

    pub(crate) fn peek(&self) -> Option<&SearchNode<S>> {
        self.heap.first()
    }

    pub(crate) fn push(&mut self, node: SearchNode<S>) {
        debug_assert!(
            !self.slots.contains_key(&node.state),
            "state {:?} pushed twice",
            node.state
        );
        let slot = self.heap.len();
        self.slots.insert(node.state, slot);
        self.heap.push(node);
        self.sift_up(slot);
    }

    pub(crate) fn pop(&mut self) -> Option<SearchNode<S>> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let top = self.heap.pop().unwrap();
        self.slots.remove(&top.state);
        if !self.heap.is_empty() {
            self.slots.insert(self.heap[0].state, 0);
            self.sift_down(0);
        }
        Some(top)
    }

    /// Replaces the stored node for `node.state` and restores heap order.
    /// Sifts in both directions so it also tolerates key increases.
    pub(crate) fn decrease_key(&mut self, node: SearchNode<S>) {
        let slot = match self.slots.get(&node.state) {
            Some(&slot) => slot,
            None => return,
        };
        self.heap[slot] = node;
        let slot = self.sift_up(slot);
        self.sift_down(slot);
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if O::cmp(&self.heap[slot], &self.heap[parent]) == Ordering::Less {
                self.swap_slots(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) {
        loop {
            let left = 2 * slot + 1;
            let right = 2 * slot + 2;
            let mut smallest = slot;
            if left < self.heap.len()
                && O::cmp(&self.heap[left], &self.heap[smallest]) == Ordering::Less
            {
                smallest = left;
            }
            if right < self.heap.len()
                && O::cmp(&self.heap[right], &self.heap[smallest]) == Ordering::Less
            {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap_slots(slot, smallest);
            slot = smallest;
        }
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots.insert(self.heap[a].state, a);
        self.slots.insert(self.heap[b].state, b);
    }
}
