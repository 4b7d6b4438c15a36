use thiserror::Error;

/// Errors reported when configuring an [`OrderedTree`](crate::OrderedTree).
///
/// Lookups and removals of absent keys are not errors; they return `None`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The requested fan-out is too small to form a B-tree.
    #[error("invalid order: {order} (must be >= {min})")]
    InvalidOrder {
        /// The order that was requested.
        order: usize,
        /// The smallest order accepted.
        min: usize,
    },
}
