use crate::{
    ordering::{ExampleOrdering, OrderScope},
    tree::TreeItem,
};

/// Keeps declaration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefinedOrder;

impl ExampleOrdering for DefinedOrder {
    fn order(&self, _: &OrderScope<'_>, _: &mut [TreeItem]) {}
}
