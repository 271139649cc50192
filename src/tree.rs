//! The finalized example group tree.
//!
//! Finalization turns the recorded declarations into an arena of groups and
//! examples. Shared group inclusions are expanded, metadata is resolved,
//! and hooks and helpers are attached to their groups. After that the tree is
//! plain data and never changes again.

use std::{
    borrow::Cow,
    collections::HashSet,
    sync::Arc,
};

use tracing::debug;

use crate::{
    declare::{Decl, GroupBuilder, GroupDecl},
    error::{DeclarationError, DeclarationErrorKind, Error, Result},
    example::{ExampleFn, SourceLocation},
    helper::{HelperFn, HelperTable},
    hook::{self, Hook, HookKind, HookScope, HookSet},
    metadata::Metadata,
    ordering::{ExampleOrdering, OrderScope},
    shared::{SharedBlock, SharedGroups, SharedId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExampleId(pub(crate) usize);

/// An entry of a group, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeItem {
    Example(ExampleId),
    Group(GroupId),
}

#[derive(Debug)]
pub struct ExampleGroup {
    pub id: GroupId,
    pub description: Cow<'static, str>,
    pub full_description: String,

    /// Resolved metadata, including the inherited pairs and the reserved keys.
    pub metadata: Arc<Metadata>,
    pub location: SourceLocation,
    pub parent: Option<GroupId>,
    pub items: Vec<TreeItem>,
    pub hooks: HookSet,
    pub(crate) helpers: Arc<HelperTable>,
}

impl ExampleGroup {
    pub fn helpers(&self) -> &HelperTable {
        &self.helpers
    }
}

pub struct Example {
    pub id: ExampleId,
    pub description: Cow<'static, str>,
    pub full_description: String,
    pub metadata: Arc<Metadata>,
    pub location: SourceLocation,
    pub group: GroupId,
    pub(crate) body: ExampleFn,
}

impl std::fmt::Debug for Example {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Example")
            .field("id", &self.id)
            .field("full_description", &self.full_description)
            .field("metadata", &self.metadata)
            .field("location", &self.location)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Tree {
    groups: Vec<ExampleGroup>,
    examples: Vec<Example>,
    roots: Vec<GroupId>,
    global: HookSet,
}

impl Tree {
    pub fn group(&self, id: GroupId) -> &ExampleGroup {
        &self.groups[id.0]
    }

    pub fn example(&self, id: ExampleId) -> &Example {
        &self.examples[id.0]
    }

    pub fn roots(&self) -> &[GroupId] {
        &self.roots
    }

    pub fn groups(&self) -> &[ExampleGroup] {
        &self.groups
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Hooks registered on the world, the outermost level of every example.
    pub fn global_hooks(&self) -> &HookSet {
        &self.global
    }

    /// The ancestors of `group` and the group itself, outermost first.
    pub fn lineage(&self, group: GroupId) -> Vec<&ExampleGroup> {
        let mut lineage = Vec::new();
        let mut current = Some(group);
        while let Some(id) = current {
            let group = self.group(id);
            lineage.push(group);
            current = group.parent;
        }
        lineage.reverse();
        lineage
    }

    /// Every hook level visible to the examples of `group`, outermost first.
    pub fn hook_levels(&self, group: GroupId) -> Vec<&HookSet> {
        std::iter::once(&self.global)
            .chain(self.lineage(group).into_iter().map(|group| &group.hooks))
            .collect()
    }

    /// The `kind` hooks of every-example scope applying to `example`, in the
    /// order they run.
    pub fn hooks_for(&self, example: ExampleId, kind: HookKind) -> Vec<&Hook> {
        let example = self.example(example);
        hook::resolve(
            &self.hook_levels(example.group),
            kind,
            HookScope::Each,
            &example.metadata,
        )
    }

    /// The items of a scope, permuted by `ordering`.
    ///
    /// A group with `order: "defined"` metadata always keeps declaration order.
    pub fn ordered_items<O: ExampleOrdering + ?Sized>(
        &self,
        scope: OrderScope<'_>,
        ordering: &O,
    ) -> Vec<TreeItem> {
        let mut items: Vec<TreeItem> = match scope {
            OrderScope::Roots => self.roots.iter().copied().map(TreeItem::Group).collect(),
            OrderScope::Group(group) => group.items.clone(),
        };
        let forced = match scope {
            OrderScope::Roots => false,
            OrderScope::Group(group) => group
                .metadata
                .get("order")
                .and_then(|order| order.as_str())
                .is_some_and(|order| order == "defined"),
        };
        if !forced {
            ordering.order(&scope, &mut items);
        }
        items
    }

    /// Every example in execution order.
    pub fn ordered_examples<O: ExampleOrdering + ?Sized>(&self, ordering: &O) -> Vec<ExampleId> {
        let mut examples = Vec::with_capacity(self.examples.len());
        let mut stack: Vec<TreeItem> = self.ordered_items(OrderScope::Roots, ordering);
        stack.reverse();
        while let Some(item) = stack.pop() {
            match item {
                TreeItem::Example(id) => examples.push(id),
                TreeItem::Group(id) => {
                    let items = self.ordered_items(OrderScope::Group(self.group(id)), ordering);
                    stack.extend(items.into_iter().rev());
                }
            }
        }
        examples
    }

    /// Every example below `group`, in declaration order.
    pub fn subtree_examples(&self, group: GroupId) -> Vec<ExampleId> {
        let mut examples = Vec::new();
        let mut stack = vec![TreeItem::Group(group)];
        while let Some(item) = stack.pop() {
            match item {
                TreeItem::Example(id) => examples.push(id),
                TreeItem::Group(id) => stack.extend(self.group(id).items.iter().rev().copied()),
            }
        }
        examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Resolved metadata of a node: inherited pairs, own pairs, reserved keys.
fn resolve_metadata(
    parent: &Metadata,
    own: &Metadata,
    description: &str,
    full_description: &str,
    location: &SourceLocation,
) -> Metadata {
    let mut metadata = parent.merged(own);
    metadata.insert("description", description.to_string());
    metadata.insert("full_description", full_description.to_string());
    metadata.insert("location", location.to_string());
    metadata
}

fn join_description(parent: Option<&str>, own: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent} {own}"),
        _ => own.to_string(),
    }
}

/// A declaration together with the shared blocks it was expanded from.
struct Expanded {
    decl: Decl,
    origin: Arc<[SharedId]>,
}

struct Parent<'p> {
    id: Option<GroupId>,
    full_description: Option<&'p str>,
    metadata: &'p Metadata,
    helpers: &'p Arc<HelperTable>,
    applied: &'p HashSet<SharedId>,
}

pub(crate) struct TreeBuilder<'s> {
    shared: &'s SharedGroups,
    tree: Tree,
    errors: Vec<DeclarationError>,
}

impl<'s> TreeBuilder<'s> {
    pub(crate) fn new(shared: &'s SharedGroups, global: HookSet) -> Self {
        Self {
            shared,
            tree: Tree {
                global,
                ..Tree::default()
            },
            errors: Vec::new(),
        }
    }

    pub(crate) fn build(mut self, roots: Vec<GroupDecl>) -> Result<Tree> {
        let empty_metadata = Metadata::new();
        let empty_helpers = Arc::new(HelperTable::default());
        let applied = HashSet::new();
        for decl in roots {
            let parent = Parent {
                id: None,
                full_description: None,
                metadata: &empty_metadata,
                helpers: &empty_helpers,
                applied: &applied,
            };
            let id = self.group(decl, Arc::from([]), parent)?;
            self.tree.roots.push(id);
        }

        if !self.errors.is_empty() {
            return Err(Error::Declaration(self.errors));
        }

        debug!(
            groups = self.tree.groups.len(),
            examples = self.tree.examples.len(),
            "tree finalized"
        );
        Ok(self.tree)
    }

    fn group(
        &mut self,
        decl: GroupDecl,
        origin: Arc<[SharedId]>,
        parent: Parent<'_>,
    ) -> Result<GroupId> {
        let GroupDecl {
            description,
            metadata: own_metadata,
            location,
            items,
            errors,
        } = decl;

        let full_description = join_description(parent.full_description, &description);
        let metadata = resolve_metadata(
            parent.metadata,
            &own_metadata,
            &description,
            &full_description,
            &location,
        );
        self.collect(&full_description, errors);

        // explicit inclusions at their point of declaration
        let mut applied = HashSet::new();
        let mut expanded = Vec::with_capacity(items.len());
        self.expand(items, &origin, &full_description, &mut applied, &mut expanded)?;

        // implicit inclusions after the group's own declarations
        let implicit: Vec<_> = self
            .shared
            .implicit()
            .filter(|(shared, filter)| {
                !applied.contains(&shared.id)
                    && !parent.applied.contains(&shared.id)
                    && filter.matches(&metadata)
            })
            .map(|(shared, _)| shared.clone())
            .collect();
        for shared in implicit {
            debug!(group = %full_description, shared = shared.id.0, "implicit inclusion");
            applied.insert(shared.id);
            let decls = self.run_block(&shared.block, &full_description);
            let origin = extend_origin(&origin, shared.id);
            self.expand(decls, &origin, &full_description, &mut applied, &mut expanded)?;
        }

        // hooks and helpers first, nested groups layer on top of them
        let mut hooks = HookSet::new();
        let mut own_helpers: Vec<(Cow<'static, str>, HelperFn)> = Vec::new();
        let mut children = Vec::new();
        for Expanded { decl, origin } in expanded {
            match decl {
                Decl::Hook(hook) => hooks.push(hook),
                Decl::Helper(helper) => own_helpers.push((helper.name, helper.definition)),
                Decl::Example(_) | Decl::Group(_) => children.push(Expanded { decl, origin }),
                Decl::Include(_) => unreachable!("inclusions are expanded"),
            }
        }
        let helpers = Arc::new(HelperTable::layered(parent.helpers, own_helpers));

        let id = GroupId(self.tree.groups.len());
        self.tree.groups.push(ExampleGroup {
            id,
            description,
            full_description,
            metadata: Arc::new(metadata),
            location,
            parent: parent.id,
            items: Vec::new(),
            hooks,
            helpers: Arc::clone(&helpers),
        });

        let mut inherited = parent.applied.clone();
        inherited.extend(applied);

        let mut items = Vec::with_capacity(children.len());
        for Expanded { decl, origin } in children {
            match decl {
                Decl::Example(example) => {
                    let group = &self.tree.groups[id.0];
                    let full_description =
                        join_description(Some(&group.full_description), &example.description);
                    let metadata = resolve_metadata(
                        &group.metadata,
                        &example.metadata,
                        &example.description,
                        &full_description,
                        &example.location,
                    );
                    let example_id = ExampleId(self.tree.examples.len());
                    self.tree.examples.push(Example {
                        id: example_id,
                        description: example.description,
                        full_description,
                        metadata: Arc::new(metadata),
                        location: example.location,
                        group: id,
                        body: example.body,
                    });
                    items.push(TreeItem::Example(example_id));
                }
                Decl::Group(nested) => {
                    let group_metadata = Arc::clone(&self.tree.groups[id.0].metadata);
                    let group_description = self.tree.groups[id.0].full_description.clone();
                    let parent = Parent {
                        id: Some(id),
                        full_description: Some(&group_description),
                        metadata: &group_metadata,
                        helpers: &helpers,
                        applied: &inherited,
                    };
                    let child = self.group(nested, origin, parent)?;
                    items.push(TreeItem::Group(child));
                }
                Decl::Hook(_) | Decl::Helper(_) | Decl::Include(_) => {}
            }
        }
        self.tree.groups[id.0].items = items;

        Ok(id)
    }

    /// Expand the explicit inclusions of `items` into `out`, recursively.
    fn expand(
        &mut self,
        items: Vec<Decl>,
        origin: &Arc<[SharedId]>,
        group: &str,
        applied: &mut HashSet<SharedId>,
        out: &mut Vec<Expanded>,
    ) -> Result<()> {
        for decl in items {
            let Decl::Include(inclusion) = decl else {
                out.push(Expanded {
                    decl,
                    origin: Arc::clone(origin),
                });
                continue;
            };

            let registry = self.shared;
            let shared = registry
                .named(&inclusion.name)
                .ok_or_else(|| Error::UnknownSharedGroup {
                    name: inclusion.name.to_string(),
                    group: group.to_string(),
                    location: inclusion.location.clone(),
                })?;
            if origin.contains(&shared.id) {
                return Err(Error::RecursiveInclusion {
                    name: inclusion.name.to_string(),
                    group: group.to_string(),
                    location: inclusion.location,
                });
            }
            if !applied.insert(shared.id) {
                debug!(group, shared = %inclusion.name, "shared group already included");
                continue;
            }

            let block = Arc::clone(&shared.block);
            let id = shared.id;
            debug!(group, shared = %inclusion.name, "explicit inclusion");
            let decls = self.run_block(&block, group);
            self.expand(decls, &extend_origin(origin, id), group, applied, out)?;
        }
        Ok(())
    }

    fn run_block(&mut self, block: &SharedBlock, group: &str) -> Vec<Decl> {
        let mut builder = GroupBuilder::scratch();
        block(&mut builder);
        let decl = builder.finish();
        self.collect(group, decl.errors);
        decl.items
    }

    fn collect(&mut self, group: &str, errors: Vec<DeclarationErrorKind>) {
        self.errors
            .extend(errors.into_iter().map(|kind| DeclarationError {
                group: group.to_string(),
                kind,
            }));
    }
}

fn extend_origin(origin: &[SharedId], id: SharedId) -> Arc<[SharedId]> {
    origin.iter().copied().chain(std::iter::once(id)).collect()
}

#[cfg(test)]
pub(crate) fn by_description(tree: &Tree) -> std::collections::HashMap<&str, ExampleId> {
    tree.examples
        .iter()
        .map(|example| (example.full_description.as_str(), example.id))
        .collect()
}
