use core::borrow::Borrow;

use smallvec::SmallVec;
use tracing::trace;

use super::arena::{Arena, Handle};
use super::node::{Children, Entry, Node, SearchResult};
use crate::Order;

/// The B-tree engine backing `OrderedTree`.
pub(crate) struct RawOrderedTree<K, V> {
    /// Arena owning every node; parent links and child lists are handles into it.
    nodes: Arena<Node<K, V>>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
    /// Total number of entries in the tree.
    len: usize,
    order: Order,
}

impl<K, V> RawOrderedTree<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new(order: Order) -> Self {
        Self {
            nodes: Arena::new(),
            root: None,
            len: 0,
            order,
        }
    }

    pub(crate) const fn order(&self) -> Order {
        self.order
    }

    /// Returns the number of entries in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every node and resets the tree to empty.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Number of levels: 0 for an empty tree, 1 for a lone leaf root.
    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.root;
        while let Some(handle) = current {
            height += 1;
            current = self.nodes.get(handle).first_child();
        }
        height
    }

    fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    /// Leftmost leaf below `handle`.
    fn leftmost_leaf(&self, mut handle: Handle) -> Handle {
        while let Some(child) = self.node(handle).first_child() {
            handle = child;
        }
        handle
    }

    /// Rightmost leaf below `handle`.
    fn rightmost_leaf(&self, mut handle: Handle) -> Handle {
        while let Some(child) = self.node(handle).last_child() {
            handle = child;
        }
        handle
    }

    /// Returns the entry with the smallest key.
    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.leftmost_leaf(self.root?);
        let entry = self.node(leaf).first_entry()?;
        Some((&entry.key, &entry.value))
    }

    /// Returns the entry with the largest key.
    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.rightmost_leaf(self.root?);
        let entry = self.node(leaf).last_entry()?;
        Some((&entry.key, &entry.value))
    }

    /// Points every child of `parent` back at it.
    fn adopt_children(&mut self, parent: Handle) {
        let children: Children = self.node(parent).children().iter().copied().collect();
        for child in children {
            self.nodes.get_mut(child).set_parent(Some(parent));
        }
    }

    /// Resolves underflow at `handle` after an entry was removed from it, walking towards
    /// the root while merges leave parents underflowing.
    fn rebalance(&mut self, mut handle: Handle) {
        let min_entries = self.order.min_entries();

        loop {
            let node = self.node(handle);
            // The root is exempt from the minimum.
            let Some(parent) = node.parent() else {
                return;
            };
            if node.entry_count() >= min_entries {
                return;
            }

            let parent_node = self.node(parent);
            let position = parent_node
                .position_of(handle)
                .expect("`RawOrderedTree::rebalance()` - node is not a child of its parent!");
            let left = position.checked_sub(1).map(|index| parent_node.child(index));
            let right = (position + 1 < parent_node.child_count()).then(|| parent_node.child(position + 1));

            if let Some(left) = left
                && self.node(left).entry_count() > min_entries
            {
                self.rotate_right(left, handle, parent, position - 1);
                return;
            }

            if let Some(right) = right
                && self.node(right).entry_count() > min_entries
            {
                self.rotate_left(handle, right, parent, position);
                return;
            }

            let survivor = match (left, right) {
                (_, Some(right)) => {
                    self.merge(handle, right, parent, position);
                    handle
                }
                (Some(left), None) => {
                    self.merge(left, handle, parent, position - 1);
                    left
                }
                (None, None) => unreachable!("`RawOrderedTree::rebalance()` - non-root node has no siblings!"),
            };

            if self.root == Some(parent) && self.node(parent).entry_count() == 0 {
                self.nodes.free(parent);
                self.nodes.get_mut(survivor).set_parent(None);
                self.root = Some(survivor);
                trace!(height = self.height(), "root collapsed, tree shrank one level");
                return;
            }

            handle = parent;
        }
    }

    /// Borrows through the parent from the left sibling: the separator moves down to the
    /// front of `node` and the sibling's last entry replaces it.
    fn rotate_right(&mut self, left: Handle, node: Handle, parent: Handle, separator: usize) {
        let lender = self.nodes.get_mut(left);
        let entry = lender.pop_entry().expect("`RawOrderedTree::rotate_right()` - lender is empty!");
        let child = lender.pop_child();

        let separator_entry = self.nodes.get_mut(parent).replace_entry(separator, entry);

        let borrower = self.nodes.get_mut(node);
        borrower.push_entry_front(separator_entry);
        if let Some(child) = child {
            borrower.push_child_front(child);
            self.nodes.get_mut(child).set_parent(Some(node));
        }
        trace!("borrowed from left sibling");
    }

    /// Mirror of `rotate_right`: borrows the right sibling's first entry.
    fn rotate_left(&mut self, node: Handle, right: Handle, parent: Handle, separator: usize) {
        let lender = self.nodes.get_mut(right);
        let entry = lender.pop_entry_front().expect("`RawOrderedTree::rotate_left()` - lender is empty!");
        let child = lender.pop_child_front();

        let separator_entry = self.nodes.get_mut(parent).replace_entry(separator, entry);

        let borrower = self.nodes.get_mut(node);
        borrower.push_entry(separator_entry);
        if let Some(child) = child {
            borrower.push_child(child);
            self.nodes.get_mut(child).set_parent(Some(node));
        }
        trace!("borrowed from right sibling");
    }

    /// Folds `right` and the separator between them into `left`; `right` is freed.
    fn merge(&mut self, left: Handle, right: Handle, parent: Handle, separator: usize) {
        let parent_node = self.nodes.get_mut(parent);
        let separator_entry = parent_node.remove_entry(separator);
        let removed = parent_node.remove_child(separator + 1);
        debug_assert_eq!(removed, right);

        let right_node = self.nodes.take(right);
        self.nodes.get_mut(left).absorb(separator_entry, right_node);
        self.adopt_children(left);

        debug_assert!(self.node(left).entry_count() <= self.order.max_entries());
        trace!(entries = self.node(left).entry_count(), "merged siblings");
    }

    /// Returns an in-order cursor over all entries.
    pub(crate) fn iter(&self) -> RawIter<'_, K, V> {
        let mut iter = RawIter {
            tree: self,
            stack: SmallVec::new(),
            remaining: self.len,
        };
        if let Some(root) = self.root {
            iter.descend(root);
        }
        iter
    }
}

impl<K: Ord, V> RawOrderedTree<K, V> {
    /// Finds the node and entry index holding `key`.
    fn search<Q>(&self, key: &Q) -> Option<(Handle, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root?;

        loop {
            let node = self.node(current);
            match node.search(key) {
                SearchResult::Found(index) => return Some((current, index)),
                SearchResult::GoDown(_) if node.is_leaf() => return None,
                SearchResult::GoDown(index) => current = node.child(index),
            }
        }
    }

    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (handle, index) = self.search(key)?;
        let entry = self.node(handle).entry(index);
        Some((&entry.key, &entry.value))
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (handle, index) = self.search(key)?;
        Some(&mut self.nodes.get_mut(handle).entry_mut(index).value)
    }

    /// Inserts an entry, or overwrites the value of an existing key in place.
    /// Returns the overwritten value.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(mut current) = self.root else {
            self.root = Some(self.nodes.alloc(Node::leaf(Entry::new(key, value))));
            self.len = 1;
            return None;
        };

        loop {
            let node = self.nodes.get_mut(current);
            match node.search(&key) {
                SearchResult::Found(index) => {
                    return Some(core::mem::replace(&mut node.entry_mut(index).value, value));
                }
                SearchResult::GoDown(index) if node.is_leaf() => {
                    node.insert_entry(index, Entry::new(key, value));
                    break;
                }
                SearchResult::GoDown(index) => current = node.child(index),
            }
        }

        self.len += 1;
        self.split(current);
        None
    }

    /// Resolves overflow at `handle`, walking towards the root while parents overflow.
    fn split(&mut self, mut handle: Handle) {
        let max_entries = self.order.max_entries();

        while self.node(handle).entry_count() > max_entries {
            let (median, right) = self.nodes.get_mut(handle).split(self.order.middle());
            let parent = right.parent();
            let right = self.nodes.alloc(right);
            self.adopt_children(right);

            debug_assert!(self.node(handle).entry_count() <= max_entries);
            debug_assert!(self.node(right).entry_count() <= max_entries);

            let Some(parent) = parent else {
                let root = self.nodes.alloc(Node::root(median, handle, right));
                self.nodes.get_mut(handle).set_parent(Some(root));
                self.nodes.get_mut(right).set_parent(Some(root));
                self.root = Some(root);
                trace!(height = self.height(), "root split, tree grew one level");
                return;
            };

            let parent_node = self.nodes.get_mut(parent);
            let index = match parent_node.search(&median.key) {
                SearchResult::Found(index) | SearchResult::GoDown(index) => index,
            };
            debug_assert_eq!(parent_node.child(index), handle);
            parent_node.insert_entry(index, median);
            parent_node.insert_child(index + 1, right);

            handle = parent;
        }
    }

    /// Removes `key` and returns its entry. Absent keys leave the tree untouched.
    pub(crate) fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let (handle, index) = self.search(key)?;

        let (leaf, removed) = if self.node(handle).is_leaf() {
            (handle, self.nodes.get_mut(handle).remove_entry(index))
        } else {
            // Fill the gap with the in-order predecessor.
            let leaf = self.rightmost_leaf(self.node(handle).child(index));
            let predecessor = self
                .nodes
                .get_mut(leaf)
                .pop_entry()
                .expect("`RawOrderedTree::remove_entry()` - predecessor leaf is empty!");
            (leaf, self.nodes.get_mut(handle).replace_entry(index, predecessor))
        };

        self.len -= 1;
        self.rebalance(leaf);

        if self.len == 0 {
            self.nodes.clear();
            self.root = None;
        }

        Some((removed.key, removed.value))
    }
}

/// In-order cursor. The stack holds `(node, next entry index)` from the root down to
/// the node currently being read.
pub(crate) struct RawIter<'a, K, V> {
    tree: &'a RawOrderedTree<K, V>,
    stack: SmallVec<[(Handle, usize); 16]>,
    remaining: usize,
}

impl<K, V> RawIter<'_, K, V> {
    fn descend(&mut self, mut handle: Handle) {
        loop {
            self.stack.push((handle, 0));
            match self.tree.node(handle).first_child() {
                Some(child) => handle = child,
                None => return,
            }
        }
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<'a, K, V> Iterator for RawIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (handle, index) = *self.stack.last()?;
            let tree = self.tree;
            let node = tree.node(handle);

            if index == node.entry_count() {
                self.stack.pop();
                continue;
            }

            if let Some(top) = self.stack.last_mut() {
                top.1 += 1;
            }
            if !node.is_leaf() {
                self.descend(node.child(index + 1));
            }

            self.remaining -= 1;
            let entry = node.entry(index);
            return Some((&entry.key, &entry.value));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> Clone for RawIter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::uninlined_format_args)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    impl<K: Ord + core::fmt::Debug, V> RawOrderedTree<K, V> {
        /// Validates all B-tree invariants. Panics with a descriptive message if any are violated.
        pub(crate) fn validate_invariants(&self) {
            let Some(root) = self.root else {
                assert_eq!(self.len, 0, "Empty tree should have len 0");
                assert!(self.nodes.is_empty(), "Empty tree should own no nodes");
                return;
            };

            let mut errors: Vec<String> = Vec::new();
            let mut leaf_depth: Option<usize> = None;
            let mut node_count = 0usize;

            if self.node(root).parent().is_some() {
                errors.push("Root has a parent".into());
            }
            if self.node(root).entry_count() == 0 {
                errors.push("Non-empty tree has an entry-less root".into());
            }

            let entry_count =
                self.validate_node(root, 0, None, None, &mut leaf_depth, &mut node_count, &mut errors);

            if entry_count != self.len {
                errors.push(alloc::format!("len mismatch: self.len={}, actual count={}", self.len, entry_count));
            }
            if node_count != self.nodes.len() {
                errors.push(alloc::format!(
                    "Leaked nodes: reachable={}, allocated={}",
                    node_count,
                    self.nodes.len()
                ));
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        #[allow(clippy::too_many_arguments)]
        fn validate_node(
            &self,
            handle: Handle,
            depth: usize,
            lower: Option<&K>,
            upper: Option<&K>,
            leaf_depth: &mut Option<usize>,
            node_count: &mut usize,
            errors: &mut Vec<String>,
        ) -> usize {
            let node = self.node(handle);
            *node_count += 1;

            if node.entry_count() > self.order.max_entries() {
                errors.push(alloc::format!("Overflow at {:?}: {} entries", handle, node.entry_count()));
            }
            if Some(handle) != self.root && node.entry_count() < self.order.min_entries() {
                errors.push(alloc::format!("Underflow at {:?}: {} entries", handle, node.entry_count()));
            }

            for i in 1..node.entry_count() {
                if node.entry(i - 1).key >= node.entry(i).key {
                    errors.push(alloc::format!("Keys not sorted at {:?}, indices {} and {}", handle, i - 1, i));
                }
            }
            if let (Some(lower), Some(first)) = (lower, node.first_entry())
                && first.key <= *lower
            {
                errors.push(alloc::format!("Key {:?} at {:?} not above {:?}", first.key, handle, lower));
            }
            if let (Some(upper), Some(last)) = (upper, node.last_entry())
                && last.key >= *upper
            {
                errors.push(alloc::format!("Key {:?} at {:?} not below {:?}", last.key, handle, upper));
            }

            if node.is_leaf() {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => errors.push(alloc::format!(
                        "Leaf depth mismatch: expected {}, got {} at {:?}",
                        expected,
                        depth,
                        handle
                    )),
                    Some(_) => {}
                }
                return node.entry_count();
            }

            if node.child_count() != node.entry_count() + 1 {
                errors.push(alloc::format!(
                    "Child count mismatch at {:?}: {} children, {} entries",
                    handle,
                    node.child_count(),
                    node.entry_count()
                ));
                return node.entry_count();
            }

            let mut total = node.entry_count();
            for (i, &child) in node.children().iter().enumerate() {
                if self.node(child).parent() != Some(handle) {
                    errors.push(alloc::format!("Child {:?} of {:?} has parent {:?}", child, handle, self.node(child).parent()));
                }
                let child_lower = if i == 0 { lower } else { Some(&node.entry(i - 1).key) };
                let child_upper = if i == node.entry_count() { upper } else { Some(&node.entry(i).key) };
                total += self.validate_node(child, depth + 1, child_lower, child_upper, leaf_depth, node_count, errors);
            }
            total
        }

        /// Keys of every node, grouped by level from the root down.
        fn levels(&self) -> Vec<Vec<Vec<K>>>
        where
            K: Clone,
        {
            let mut levels = Vec::new();
            let mut level: Vec<Handle> = self.root.into_iter().collect();
            while !level.is_empty() {
                levels.push(
                    level
                        .iter()
                        .map(|&h| self.node(h).entries().iter().map(|e| e.key.clone()).collect())
                        .collect(),
                );
                level = level.iter().flat_map(|&h| self.node(h).children().iter().copied()).collect();
            }
            levels
        }
    }

    fn tree_of(order: usize, keys: impl IntoIterator<Item = i32>) -> RawOrderedTree<i32, i32> {
        let mut tree = RawOrderedTree::new(Order::new(order).unwrap());
        for key in keys {
            tree.insert(key, key * 10);
            tree.validate_invariants();
        }
        tree
    }

    #[test]
    fn third_insert_splits_root() {
        let mut tree = tree_of(3, [1, 2]);
        assert_eq!(tree.levels(), vec![vec![vec![1, 2]]]);
        assert_eq!(tree.height(), 1);

        tree.insert(3, 30);
        tree.validate_invariants();
        assert_eq!(tree.levels(), vec![vec![vec![2]], vec![vec![1], vec![3]]]);
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn ascending_inserts_order_three() {
        let tree = tree_of(3, 1..=7);
        assert_eq!(
            tree.levels(),
            vec![
                vec![vec![4]],
                vec![vec![2], vec![6]],
                vec![vec![1], vec![3], vec![5], vec![7]],
            ]
        );
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn underflow_borrows_from_right_sibling() {
        let mut tree = tree_of(3, 1..=4);
        assert_eq!(tree.levels(), vec![vec![vec![2]], vec![vec![1], vec![3, 4]]]);

        assert_eq!(tree.remove_entry(&1), Some((1, 10)));
        tree.validate_invariants();
        assert_eq!(tree.levels(), vec![vec![vec![3]], vec![vec![2], vec![4]]]);
    }

    #[test]
    fn underflow_prefers_left_sibling() {
        // Root {3, 5} over {1, 2}, {4}, {6, 7}: both siblings of {4} can lend.
        let mut tree = tree_of(3, [3, 5, 1, 4, 6, 2, 7]);
        tree.remove_entry(&4);
        tree.validate_invariants();
        assert_eq!(tree.levels()[0], vec![vec![2, 5]]);
        assert_eq!(tree.levels()[1], vec![vec![1], vec![3], vec![6, 7]]);
    }

    #[test]
    fn merge_prefers_right_sibling() {
        let mut tree = tree_of(3, 1..=7);
        // {5} has no lenders: left sibling absent, right {7} at minimum.
        tree.remove_entry(&5);
        tree.validate_invariants();
        assert_eq!(tree.levels(), vec![vec![vec![2, 4]], vec![vec![1], vec![3], vec![6, 7]]]);
    }

    #[test]
    fn internal_removal_uses_predecessor() {
        let mut tree = tree_of(3, 1..=7);
        assert_eq!(tree.remove_entry(&4), Some((4, 40)));
        tree.validate_invariants();
        assert_eq!(tree.levels(), vec![vec![vec![3, 6]], vec![vec![1, 2], vec![5], vec![7]]]);
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn removing_everything_frees_all_nodes() {
        let mut tree = tree_of(4, 0..100);
        for key in (0..100).rev() {
            assert_eq!(tree.remove_entry(&key), Some((key, key * 10)));
            tree.validate_invariants();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.remove_entry(&0), None);
    }

    #[test]
    fn empty_tree() {
        let mut tree: RawOrderedTree<i32, i32> = RawOrderedTree::new(Order::new(3).unwrap());
        assert_eq!(tree.get_key_value(&1), None);
        assert_eq!(tree.remove_entry(&1), None);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.first_key_value(), None);
        assert_eq!(tree.last_key_value(), None);
        assert_eq!(tree.iter().next(), None);
        tree.validate_invariants();
    }

    #[test]
    fn overwrite_in_internal_node() {
        let mut tree = tree_of(3, 1..=7);
        assert_eq!(tree.insert(4, 400), Some(40));
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.get_key_value(&4), Some((&4, &400)));
        tree.validate_invariants();
    }

    #[test]
    fn iter_is_sorted() {
        let tree = tree_of(5, [9, 3, 7, 1, 8, 2, 6, 4, 5, 0]);
        let keys: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());
        assert_eq!(tree.iter().remaining(), 10);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..500).prop_map(Op::Insert),
            2 => (0i32..500).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn tree_invariants_maintained_after_operations(
            order in 3usize..9,
            ops in prop::collection::vec(op_strategy(), 0..400),
        ) {
            let mut tree: RawOrderedTree<i32, i32> = RawOrderedTree::new(Order::new(order).unwrap());
            let mut model: BTreeMap<i32, i32> = BTreeMap::new();

            for (step, op) in ops.into_iter().enumerate() {
                let value = i32::try_from(step).unwrap();
                match op {
                    Op::Insert(key) => {
                        prop_assert_eq!(tree.insert(key, value), model.insert(key, value));
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(tree.remove_entry(&key), model.remove_entry(&key));
                    }
                }
                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }

            prop_assert!(tree.iter().eq(model.iter()));
            prop_assert_eq!(tree.first_key_value(), model.first_key_value());
            prop_assert_eq!(tree.last_key_value(), model.last_key_value());
        }

        #[test]
        fn remove_is_idempotent(keys in prop::collection::vec(0i32..200, 1..100), victim in 0i32..200) {
            let mut tree = tree_of(3, keys);
            tree.remove_entry(&victim);
            let before = tree.levels();
            prop_assert_eq!(tree.remove_entry(&victim), None);
            tree.validate_invariants();
            prop_assert_eq!(tree.levels(), before);
        }
    }
}
