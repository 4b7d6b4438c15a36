//! An in-memory ordered map backed by a classical multiway B-tree.
//!
//! [`OrderedTree`] stores key/value entries in nodes holding up to `m - 1` entries and
//! `m` children, where the order `m` is chosen at construction time. All leaves sit at
//! the same depth. Insertion splits overflowing nodes bottom-up and deletion repairs
//! underflowing nodes by borrowing from a sibling or merging with one.
//!
//! # Example
//!
//! ```
//! use mway_tree::OrderedTree;
//!
//! let mut tree = OrderedTree::new(3);
//! for key in 1..=7 {
//!     tree.insert(key, key * 10);
//! }
//!
//! assert_eq!(tree.get(&5), Some(&50));
//! assert_eq!(tree.len(), 7);
//! assert_eq!(tree.height(), 3);
//!
//! tree.remove(&4);
//! assert_eq!(tree.get(&4), None);
//! assert_eq!(tree.first_key_value(), Some((&1, &10)));
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`
//! - **Configurable fan-out** - Any order `m >= 3`, validated through [`Order`]
//! - **Arena-backed nodes** - Parent links are plain indices, so there are no ownership cycles
//!
//! # Implementation
//!
//! Entries live in every node (not only the leaves). Removing an entry from an internal
//! node replaces it with its in-order predecessor, then rebalances the leaf the predecessor
//! came from. Rebalancing prefers borrowing from the left sibling, then the right sibling,
//! and only then merges (right sibling first).

#![no_std]
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod order;
mod raw;

pub mod ordered_tree;

pub use error::Error;
pub use order::Order;
pub use ordered_tree::OrderedTree;
