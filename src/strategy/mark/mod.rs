//! Skipping and pending for kispec.
//!
//! A mark is decided per scheduled example before it runs. Skipped examples do
//! not run at all, pending examples run and are expected to fail.
//!
//! Marks come from the `skip` and `pending` metadata keys, set directly or
//! through [`xit`](crate::GroupBuilder::xit) and
//! [`xdescribe`](crate::GroupBuilder::xdescribe). Either key takes `true` or a
//! reason string.

use std::borrow::Cow;

use crate::{
    metadata::{MetaValue, Metadata},
    outcome::Reason,
    tree::Example,
};

mod no;
pub use no::*;

mod default;
pub use default::*;

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub enum Mark {
    #[default]
    Run,
    Pending(Reason),
    Skip(Reason),
}

impl Mark {
    /// Read the mark of resolved metadata.
    ///
    /// `skip` wins over `pending`.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        if let Some(reason) = metadata.get("skip").and_then(reason) {
            return Mark::Skip(reason);
        }
        if let Some(reason) = metadata.get("pending").and_then(reason) {
            return Mark::Pending(reason);
        }
        Mark::Run
    }
}

fn reason(value: &MetaValue) -> Option<Reason> {
    match value {
        MetaValue::Bool(false) => None,
        MetaValue::Str(reason) => Some(Some(reason.clone())),
        _ => Some(None),
    }
}

impl From<bool> for Mark {
    fn from(value: bool) -> Self {
        match value {
            true => Self::Skip(None),
            false => Self::Run,
        }
    }
}

impl From<&'static str> for Mark {
    fn from(value: &'static str) -> Self {
        Self::Skip(Some(Cow::Borrowed(value)))
    }
}

impl From<String> for Mark {
    fn from(value: String) -> Self {
        Self::Skip(Some(value.into()))
    }
}

pub trait ExampleMark {
    fn mark(&self, example: &Example) -> Mark;
}

impl<F> ExampleMark for F
where
    F: Fn(&Example) -> Mark,
{
    fn mark(&self, example: &Example) -> Mark {
        self(example)
    }
}
