//! Shared example groups.
//!
//! A shared group is a declaration block registered on the world and applied
//! to other groups. A block registered under a name is included explicitly,
//! a block registered with a metadata filter is included implicitly into every
//! group whose resolved metadata matches. A block may have both.

use std::{borrow::Cow, fmt, sync::Arc};

use crate::{declare::GroupBuilder, metadata::MetaFilter};

pub type SharedBlock = Arc<dyn Fn(&mut GroupBuilder) + Send + Sync>;

/// Identifies a registered shared block, used to apply each block at most once
/// per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedId(pub(crate) usize);

#[derive(Clone)]
pub(crate) struct SharedGroup {
    pub(crate) id: SharedId,
    pub(crate) name: Option<Cow<'static, str>>,
    pub(crate) filter: Option<MetaFilter>,
    pub(crate) block: SharedBlock,
}

impl fmt::Debug for SharedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGroup")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Registry of shared groups, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SharedGroups {
    groups: Vec<SharedGroup>,
}

impl SharedGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &mut self,
        name: Option<Cow<'static, str>>,
        filter: Option<MetaFilter>,
        block: SharedBlock,
    ) -> SharedId {
        let id = SharedId(self.groups.len());
        self.groups.push(SharedGroup {
            id,
            name,
            filter,
            block,
        });
        id
    }

    /// Look up a named block.
    ///
    /// Registering a name twice shadows the earlier registration.
    pub(crate) fn named(&self, name: &str) -> Option<&SharedGroup> {
        self.groups
            .iter()
            .rev()
            .find(|group| group.name.as_deref() == Some(name))
    }

    /// Filter keyed blocks, in registration order.
    pub(crate) fn implicit(&self) -> impl Iterator<Item = (&SharedGroup, &MetaFilter)> {
        self.groups
            .iter()
            .filter_map(|group| group.filter.as_ref().map(|filter| (group, filter)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().filter_map(|group| group.name.as_deref())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
