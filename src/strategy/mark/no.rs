use crate::{
    mark::{ExampleMark, Mark},
    tree::Example,
};

/// Runs every example, ignoring `skip` and `pending` metadata.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoMark;

impl ExampleMark for NoMark {
    fn mark(&self, _: &Example) -> Mark {
        Mark::Run
    }
}
