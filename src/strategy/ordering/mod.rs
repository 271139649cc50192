//! Example ordering for kispec.
//!
//! Ordering happens per sibling scope: the top level groups form one scope and
//! the items of every group form another. An ordering only ever permutes the
//! items of one scope, so examples of a group always stay together with the
//! group's context hooks around them.
//!
//! Implement [`ExampleOrdering`] to define an ordering strategy.

use crate::tree::{ExampleGroup, TreeItem};

mod defined;
pub use defined::*;

mod reverse;
pub use reverse::*;

mod random;
pub use random::*;

/// The sibling scope being ordered.
#[derive(Debug, Clone, Copy)]
pub enum OrderScope<'t> {
    /// The top level groups of the world.
    Roots,

    /// The items of a single group.
    Group(&'t ExampleGroup),
}

/// A strategy for the order examples and groups run in.
pub trait ExampleOrdering {
    /// Permute `items` in place.
    ///
    /// `items` are the entries of `scope` in declaration order.
    fn order(&self, scope: &OrderScope<'_>, items: &mut [TreeItem]);

    /// The seed of a randomized ordering, reported in the run summary.
    fn seed(&self) -> Option<u64> {
        None
    }
}

impl<O: ExampleOrdering + ?Sized> ExampleOrdering for Box<O> {
    fn order(&self, scope: &OrderScope<'_>, items: &mut [TreeItem]) {
        (**self).order(scope, items)
    }

    fn seed(&self) -> Option<u64> {
        (**self).seed()
    }
}
