mod frontier;
mod node;
mod pair;

pub(crate) use frontier::{FOrder, FrontierOrder, GOrder, IndexedHeap};
pub(crate) use node::SearchNode;
pub(crate) use pair::{update_coming_from, OpenPair, PairKey, PairNode};
