use alloc::vec::Vec;
use core::borrow::Borrow;

use smallvec::SmallVec;

use super::arena::Handle;

/// Child handles kept inline before spilling to the heap.
pub(crate) const INLINE_CHILDREN: usize = 8;

pub(crate) type Children = SmallVec<[Handle; INLINE_CHILDREN]>;

/// A key/value pair stored in a node.
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Entry<K, V> {
    pub(crate) const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

// Leaves have no children; internal nodes have exactly one more child than entries.
// `children[i]` holds the keys between `entries[i - 1]` and `entries[i]`.
pub(crate) struct Node<K, V> {
    // Non-owning; `None` only for the root.
    parent: Option<Handle>,
    entries: Vec<Entry<K, V>>,
    children: Children,
}

/// Result of searching for a key in a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SearchResult {
    /// Key was found at the given entry index.
    Found(usize),
    /// Key was not found; index is the insertion point and the child to descend into.
    GoDown(usize),
}

impl<K, V> Node<K, V> {
    /// Creates a leaf holding a single entry.
    pub(crate) fn leaf(entry: Entry<K, V>) -> Self {
        let mut entries = Vec::with_capacity(1);
        entries.push(entry);
        Self {
            parent: None,
            entries,
            children: SmallVec::new(),
        }
    }

    /// Creates a root with one separator and two children.
    pub(crate) fn root(separator: Entry<K, V>, left: Handle, right: Handle) -> Self {
        let mut entries = Vec::with_capacity(1);
        entries.push(separator);
        Self {
            parent: None,
            entries,
            children: smallvec::smallvec![left, right],
        }
    }

    /// Returns true if this node has no children.
    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) const fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub(crate) const fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> &Entry<K, V> {
        &self.entries[index]
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut Entry<K, V> {
        &mut self.entries[index]
    }

    pub(crate) fn first_entry(&self) -> Option<&Entry<K, V>> {
        self.entries.first()
    }

    pub(crate) fn last_entry(&self) -> Option<&Entry<K, V>> {
        self.entries.last()
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    pub(crate) fn first_child(&self) -> Option<Handle> {
        self.children.first().copied()
    }

    pub(crate) fn last_child(&self) -> Option<Handle> {
        self.children.last().copied()
    }

    /// Position of `child` among this node's children.
    pub(crate) fn position_of(&self, child: Handle) -> Option<usize> {
        self.children.iter().position(|&h| h == child)
    }

    /// Binary search over the entries by key.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.entries.binary_search_by(|e| e.key.borrow().cmp(key)) {
            Ok(index) => SearchResult::Found(index),
            Err(index) => SearchResult::GoDown(index),
        }
    }

    pub(crate) fn insert_entry(&mut self, index: usize, entry: Entry<K, V>) {
        self.entries.insert(index, entry);
    }

    pub(crate) fn remove_entry(&mut self, index: usize) -> Entry<K, V> {
        self.entries.remove(index)
    }

    /// Swaps in `entry` at `index`, returning the previous occupant.
    pub(crate) fn replace_entry(&mut self, index: usize, entry: Entry<K, V>) -> Entry<K, V> {
        core::mem::replace(&mut self.entries[index], entry)
    }

    pub(crate) fn push_entry(&mut self, entry: Entry<K, V>) {
        self.entries.push(entry);
    }

    pub(crate) fn push_entry_front(&mut self, entry: Entry<K, V>) {
        self.entries.insert(0, entry);
    }

    pub(crate) fn pop_entry(&mut self) -> Option<Entry<K, V>> {
        self.entries.pop()
    }

    pub(crate) fn pop_entry_front(&mut self) -> Option<Entry<K, V>> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub(crate) fn insert_child(&mut self, index: usize, child: Handle) {
        self.children.insert(index, child);
    }

    pub(crate) fn remove_child(&mut self, index: usize) -> Handle {
        self.children.remove(index)
    }

    pub(crate) fn push_child(&mut self, child: Handle) {
        self.children.push(child);
    }

    pub(crate) fn push_child_front(&mut self, child: Handle) {
        self.children.insert(0, child);
    }

    pub(crate) fn pop_child(&mut self) -> Option<Handle> {
        self.children.pop()
    }

    pub(crate) fn pop_child_front(&mut self) -> Option<Handle> {
        if self.children.is_empty() {
            None
        } else {
            Some(self.children.remove(0))
        }
    }

    /// Splits around `entries[middle]`. This node keeps `entries[..middle]` and
    /// `children[..=middle]`; the returned sibling takes the rest and shares this
    /// node's parent. The caller must reparent the sibling's children.
    pub(crate) fn split(&mut self, middle: usize) -> (Entry<K, V>, Node<K, V>) {
        let right_entries = self.entries.split_off(middle + 1);
        let right_children: Children = if self.is_leaf() {
            SmallVec::new()
        } else {
            self.children.drain(middle + 1..).collect()
        };
        let median = self.entries.pop().expect("`Node::split()` - `middle` is out of range!");

        let right = Node {
            parent: self.parent,
            entries: right_entries,
            children: right_children,
        };
        (median, right)
    }

    /// Appends `separator` followed by a right sibling's entries and children.
    /// The caller must reparent the moved children.
    pub(crate) fn absorb(&mut self, separator: Entry<K, V>, right: Node<K, V>) {
        let Node {
            entries: mut right_entries,
            children: right_children,
            ..
        } = right;
        self.entries.push(separator);
        self.entries.append(&mut right_entries);
        self.children.extend(right_children);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;
    use crate::raw::arena::Arena;

    fn keys(node: &Node<i32, ()>) -> Vec<i32> {
        node.entries().iter().map(|e| e.key).collect()
    }

    fn leaf_of(keys: &[i32]) -> Node<i32, ()> {
        let mut node = Node::leaf(Entry::new(keys[0], ()));
        for &key in &keys[1..] {
            node.push_entry(Entry::new(key, ()));
        }
        node
    }

    #[test]
    fn search_reports_insertion_point() {
        let node = leaf_of(&[10, 20, 30]);
        assert_eq!(node.search(&5), SearchResult::GoDown(0));
        assert_eq!(node.search(&10), SearchResult::Found(0));
        assert_eq!(node.search(&25), SearchResult::GoDown(2));
        assert_eq!(node.search(&30), SearchResult::Found(2));
        assert_eq!(node.search(&99), SearchResult::GoDown(3));
    }

    #[test]
    fn split_leaf() {
        let mut node = leaf_of(&[1, 2, 3]);
        let (median, right) = node.split(1);
        assert_eq!(median.key, 2);
        assert_eq!(keys(&node), vec![1]);
        assert_eq!(keys(&right), vec![3]);
        assert!(right.is_leaf());
    }

    #[test]
    fn split_internal_moves_children() {
        let mut arena: Arena<()> = Arena::new();
        let handles: Vec<Handle> = (0..5).map(|_| arena.alloc(())).collect();

        let mut node = leaf_of(&[1, 2, 3, 4]);
        for &h in &handles {
            node.push_child(h);
        }

        let (median, right) = node.split(1);
        assert_eq!(median.key, 2);
        assert_eq!(keys(&node), vec![1]);
        assert_eq!(node.children(), &handles[..2]);
        assert_eq!(keys(&right), vec![3, 4]);
        assert_eq!(right.children(), &handles[2..]);
    }

    #[test]
    fn absorb_keeps_order() {
        let mut left = leaf_of(&[1, 2]);
        let right = leaf_of(&[4, 5]);
        left.absorb(Entry::new(3, ()), right);
        assert_eq!(keys(&left), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn pop_front_on_empty() {
        let mut node = leaf_of(&[1]);
        assert!(node.pop_entry_front().is_some());
        assert!(node.pop_entry_front().is_none());
        assert!(node.pop_child_front().is_none());
    }
}
