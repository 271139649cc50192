//! Example filtering for kispec.
//!
//! A filter decides which examples of the tree are scheduled. Examples that are
//! filtered out are not part of the run at all: they are never started, never
//! reported and their groups' context hooks do not run for them.
//!
//! This is different to skipping: a skipped example is still scheduled and
//! reported as skipped, see [`mark`](crate::mark).
//!
//! Implement [`ExampleFilter`] to define a filter strategy for kispec.

use crate::tree::{ExampleId, Tree};

mod no;
pub use no::*;

mod default;
pub use default::*;

/// The result of applying an [`ExampleFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredExamples {
    scheduled: Vec<bool>,

    /// The number of examples that were filtered out.
    pub filtered_out: usize,
}

impl FilteredExamples {
    /// Schedule every example of `tree`.
    pub fn all(tree: &Tree) -> Self {
        Self {
            scheduled: vec![true; tree.len()],
            filtered_out: 0,
        }
    }

    /// Schedule the examples for which `keep` returns `true`.
    pub fn retain(tree: &Tree, mut keep: impl FnMut(ExampleId) -> bool) -> Self {
        let scheduled: Vec<bool> = tree.examples().iter().map(|example| keep(example.id)).collect();
        let filtered_out = scheduled.iter().filter(|scheduled| !**scheduled).count();
        Self {
            scheduled,
            filtered_out,
        }
    }

    pub fn is_scheduled(&self, id: ExampleId) -> bool {
        self.scheduled.get(id.0).copied().unwrap_or(false)
    }

    /// The number of scheduled examples.
    pub fn active(&self) -> usize {
        self.scheduled.len() - self.filtered_out
    }

    pub fn total(&self) -> usize {
        self.scheduled.len()
    }
}

/// A strategy for selecting which examples are part of a run.
pub trait ExampleFilter {
    fn filter(&self, tree: &Tree) -> FilteredExamples;
}

impl<F> ExampleFilter for F
where
    F: Fn(&Tree) -> FilteredExamples,
{
    fn filter(&self, tree: &Tree) -> FilteredExamples {
        self(tree)
    }
}
