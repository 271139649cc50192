use crate::{
    ordering::{ExampleOrdering, OrderScope},
    tree::TreeItem,
};

/// Runs every scope back to front.
///
/// Handy to find examples that accidentally depend on running after others.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReverseOrder;

impl ExampleOrdering for ReverseOrder {
    fn order(&self, _: &OrderScope<'_>, items: &mut [TreeItem]) {
        items.reverse();
    }
}
