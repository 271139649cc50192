use crate::{
    filter::{ExampleFilter, FilteredExamples},
    tree::Tree,
};

/// An [`ExampleFilter`] that schedules every example.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct NoFilter;

impl NoFilter {
    pub fn new() -> Self {
        Self
    }
}

impl ExampleFilter for NoFilter {
    fn filter(&self, tree: &Tree) -> FilteredExamples {
        FilteredExamples::all(tree)
    }
}
