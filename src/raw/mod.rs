mod arena;
mod node;
mod raw_ordered_tree;

pub(crate) use raw_ordered_tree::{RawIter, RawOrderedTree};
