use crate::Error;

/// The fan-out `m` of an [`OrderedTree`](crate::OrderedTree).
///
/// Every node holds at most `m - 1` entries and `m` children. Every node except the
/// root holds at least `ceil(m / 2) - 1` entries.
///
/// # Examples
///
/// ```
/// use mway_tree::{Error, Order};
///
/// let order = Order::new(5).unwrap();
/// assert_eq!(order.max_entries(), 4);
/// assert_eq!(order.min_entries(), 2);
///
/// assert_eq!(Order::new(2), Err(Error::InvalidOrder { order: 2, min: 3 }));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Order(usize);

impl Order {
    /// The smallest supported order.
    pub const MIN: usize = 3;

    /// The order used by [`OrderedTree::default`](crate::OrderedTree::default).
    pub const DEFAULT: Self = Self(16);

    /// Validates `m` as a tree order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if `m < Order::MIN`.
    pub const fn new(m: usize) -> Result<Self, Error> {
        if m < Self::MIN {
            return Err(Error::InvalidOrder {
                order: m,
                min: Self::MIN,
            });
        }
        Ok(Self(m))
    }

    /// Returns `m`.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn max_children(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn min_children(self) -> usize {
        self.0.div_ceil(2)
    }

    #[must_use]
    pub const fn max_entries(self) -> usize {
        self.max_children() - 1
    }

    #[must_use]
    pub const fn min_entries(self) -> usize {
        self.min_children() - 1
    }

    /// Index of the entry promoted to the parent when a node holding `m` entries splits.
    #[must_use]
    pub(crate) const fn middle(self) -> usize {
        (self.0 - 1) / 2
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for Order {
    type Error = Error;

    fn try_from(m: usize) -> Result<Self, Self::Error> {
        Self::new(m)
    }
}
