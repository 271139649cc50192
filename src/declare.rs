//! The declaration API.
//!
//! Groups are declared through a [`GroupBuilder`] handed to the block of
//! [`World::describe`](crate::World::describe). Blocks run right away and only
//! record plain declarations. Hooks, helpers and shared group inclusions are
//! resolved later, when the world is finalized.

use std::borrow::Cow;

use crate::{
    context::{Around, ExampleCtx, GroupCtx},
    error::DeclarationErrorKind,
    example::{ExampleFn, ExampleResult, SourceLocation, example_fn},
    helper::{HelperFn, Super, helper_fn, override_fn},
    hook::{Hook, HookBody, HookKind, HookScope},
    metadata::{MetaFilter, Metadata},
};

#[derive(Debug, Clone)]
pub(crate) struct GroupDecl {
    pub(crate) description: Cow<'static, str>,
    pub(crate) metadata: Metadata,
    pub(crate) location: SourceLocation,
    pub(crate) items: Vec<Decl>,
    pub(crate) errors: Vec<DeclarationErrorKind>,
}

impl GroupDecl {
    pub(crate) fn new(
        description: Cow<'static, str>,
        metadata: Metadata,
        location: SourceLocation,
    ) -> Self {
        let errors = metadata.check_user_keys();
        Self {
            description,
            metadata,
            location,
            items: Vec::new(),
            errors,
        }
    }
}

#[derive(Clone)]
pub(crate) struct ExampleDecl {
    pub(crate) description: Cow<'static, str>,
    pub(crate) metadata: Metadata,
    pub(crate) location: SourceLocation,
    pub(crate) body: ExampleFn,
}

#[derive(Clone)]
pub(crate) struct HelperDecl {
    pub(crate) name: Cow<'static, str>,
    pub(crate) definition: HelperFn,
}

#[derive(Debug, Clone)]
pub(crate) struct Inclusion {
    pub(crate) name: Cow<'static, str>,
    pub(crate) location: SourceLocation,
}

/// A single recorded declaration, in the order it was written.
#[derive(Clone)]
pub(crate) enum Decl {
    Example(ExampleDecl),
    Group(GroupDecl),
    Hook(Hook),
    Helper(HelperDecl),
    Include(Inclusion),
}

impl std::fmt::Debug for Decl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decl::Example(example) => f.debug_tuple("Example").field(&example.description).finish(),
            Decl::Group(group) => f.debug_tuple("Group").field(&group.description).finish(),
            Decl::Hook(hook) => f
                .debug_tuple("Hook")
                .field(&hook.kind())
                .field(&hook.scope())
                .finish(),
            Decl::Helper(helper) => f.debug_tuple("Helper").field(&helper.name).finish(),
            Decl::Include(inclusion) => f.debug_tuple("Include").field(&inclusion.name).finish(),
        }
    }
}

/// Records the declarations of one group.
///
/// Every method returns the builder again so declarations can be chained.
#[derive(Debug)]
pub struct GroupBuilder {
    decl: GroupDecl,
}

impl GroupBuilder {
    pub(crate) fn new(decl: GroupDecl) -> Self {
        Self { decl }
    }

    /// A builder that only collects declarations, used to expand shared groups.
    pub(crate) fn scratch() -> Self {
        Self::new(GroupDecl::new(
            Cow::Borrowed(""),
            Metadata::new(),
            SourceLocation::caller(),
        ))
    }

    pub(crate) fn finish(self) -> GroupDecl {
        self.decl
    }

    pub fn description(&self) -> &str {
        &self.decl.description
    }

    // --- groups ---

    /// Declare a nested group.
    #[track_caller]
    pub fn describe<F>(&mut self, description: impl Into<Cow<'static, str>>, block: F) -> &mut Self
    where
        F: FnOnce(&mut GroupBuilder),
    {
        self.describe_with(description, Metadata::new(), block)
    }

    /// Declare a nested group with metadata.
    #[track_caller]
    pub fn describe_with<F>(
        &mut self,
        description: impl Into<Cow<'static, str>>,
        metadata: Metadata,
        block: F,
    ) -> &mut Self
    where
        F: FnOnce(&mut GroupBuilder),
    {
        let location = SourceLocation::caller();
        let mut builder = GroupBuilder::new(GroupDecl::new(description.into(), metadata, location));
        block(&mut builder);
        self.decl.items.push(Decl::Group(builder.finish()));
        self
    }

    /// Same as [`describe`](Self::describe), reads better for "when ..." groups.
    #[track_caller]
    pub fn context<F>(&mut self, description: impl Into<Cow<'static, str>>, block: F) -> &mut Self
    where
        F: FnOnce(&mut GroupBuilder),
    {
        self.describe_with(description, Metadata::new(), block)
    }

    /// A nested group whose examples are all skipped.
    #[track_caller]
    pub fn xdescribe<F>(&mut self, description: impl Into<Cow<'static, str>>, block: F) -> &mut Self
    where
        F: FnOnce(&mut GroupBuilder),
    {
        self.describe_with(description, crate::meta! { skip: "temporarily skipped with xdescribe" }, block)
    }

    /// A nested group whose examples are focused.
    #[track_caller]
    pub fn fdescribe<F>(&mut self, description: impl Into<Cow<'static, str>>, block: F) -> &mut Self
    where
        F: FnOnce(&mut GroupBuilder),
    {
        self.describe_with(description, crate::meta! { focus }, block)
    }

    // --- examples ---

    #[track_caller]
    pub fn it<F, R>(&mut self, description: impl Into<Cow<'static, str>>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.it_with(description, Metadata::new(), body)
    }

    #[track_caller]
    pub fn it_with<F, R>(
        &mut self,
        description: impl Into<Cow<'static, str>>,
        metadata: Metadata,
        body: F,
    ) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.decl.errors.extend(metadata.check_user_keys());
        self.decl.items.push(Decl::Example(ExampleDecl {
            description: description.into(),
            metadata,
            location: SourceLocation::caller(),
            body: example_fn(body),
        }));
        self
    }

    #[track_caller]
    pub fn example<F, R>(&mut self, description: impl Into<Cow<'static, str>>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.it_with(description, Metadata::new(), body)
    }

    #[track_caller]
    pub fn specify<F, R>(&mut self, description: impl Into<Cow<'static, str>>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.it_with(description, Metadata::new(), body)
    }

    /// A skipped example.
    #[track_caller]
    pub fn xit<F, R>(&mut self, description: impl Into<Cow<'static, str>>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.it_with(description, crate::meta! { skip: "temporarily skipped with xit" }, body)
    }

    /// A focused example.
    #[track_caller]
    pub fn fit<F, R>(&mut self, description: impl Into<Cow<'static, str>>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.it_with(description, crate::meta! { focus }, body)
    }

    // --- hooks ---

    /// Register a hook of any kind and scope.
    ///
    /// Combinations that make no sense (an around hook for a whole group, a
    /// body not fitting the scope, a suite hook inside a group) are recorded
    /// as declaration errors and abort finalization.
    #[track_caller]
    pub fn hook(
        &mut self,
        kind: HookKind,
        scope: HookScope,
        filter: impl Into<MetaFilter>,
        body: HookBody,
    ) -> &mut Self {
        if scope == HookScope::Suite {
            self.decl.errors.push(DeclarationErrorKind::SuiteHookInGroup);
            return self;
        }
        match Hook::new(kind, scope, filter.into(), body, SourceLocation::caller()) {
            Ok(hook) => self.decl.items.push(Decl::Hook(hook)),
            Err(err) => self.decl.errors.push(err),
        }
        self
    }

    #[track_caller]
    pub fn before<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::Before, HookScope::Each, MetaFilter::new(), HookBody::example(body))
    }

    #[track_caller]
    pub fn before_with<F, R>(&mut self, filter: impl Into<MetaFilter>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::Before, HookScope::Each, filter, HookBody::example(body))
    }

    #[track_caller]
    pub fn after<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::After, HookScope::Each, MetaFilter::new(), HookBody::example(body))
    }

    #[track_caller]
    pub fn after_with<F, R>(&mut self, filter: impl Into<MetaFilter>, body: F) -> &mut Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::After, HookScope::Each, filter, HookBody::example(body))
    }

    #[track_caller]
    pub fn around<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut Around<'_, '_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::Around, HookScope::Each, MetaFilter::new(), HookBody::around(body))
    }

    #[track_caller]
    pub fn around_with<F, R>(&mut self, filter: impl Into<MetaFilter>, body: F) -> &mut Self
    where
        F: Fn(&mut Around<'_, '_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::Around, HookScope::Each, filter, HookBody::around(body))
    }

    /// Runs once before the first example of this group.
    #[track_caller]
    pub fn before_all<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut GroupCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::Before, HookScope::Context, MetaFilter::new(), HookBody::group(body))
    }

    /// Runs once after the last example of this group.
    #[track_caller]
    pub fn after_all<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut GroupCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::After, HookScope::Context, MetaFilter::new(), HookBody::group(body))
    }

    // --- helpers ---

    fn helper(&mut self, name: Cow<'static, str>, definition: HelperFn) {
        if name.is_empty() {
            self.decl.errors.push(DeclarationErrorKind::EmptyHelperName);
            return;
        }
        self.decl.items.push(Decl::Helper(HelperDecl { name, definition }));
    }

    /// Define a memoized helper.
    pub fn let_<F, T>(&mut self, name: impl Into<Cow<'static, str>>, definition: F) -> &mut Self
    where
        F: Fn(&ExampleCtx<'_>) -> T + Send + Sync + 'static,
        T: 'static,
    {
        self.helper(name.into(), helper_fn(definition));
        self
    }

    /// Define a memoized helper that is evaluated by a before hook at this point.
    #[track_caller]
    pub fn let_eager<F, T>(&mut self, name: impl Into<Cow<'static, str>>, definition: F) -> &mut Self
    where
        F: Fn(&ExampleCtx<'_>) -> T + Send + Sync + 'static,
        T: 'static,
    {
        let name = name.into();
        self.helper(name.clone(), helper_fn(definition));
        self.before(move |ctx| ctx.force(&name))
    }

    /// Redefine a helper, with access to the definition it shadows.
    pub fn let_override<F, T>(&mut self, name: impl Into<Cow<'static, str>>, definition: F) -> &mut Self
    where
        F: Fn(&ExampleCtx<'_>, Super<'_>) -> T + Send + Sync + 'static,
        T: 'static,
    {
        self.helper(name.into(), override_fn(definition));
        self
    }

    /// Define the `subject` helper.
    pub fn subject<F, T>(&mut self, definition: F) -> &mut Self
    where
        F: Fn(&ExampleCtx<'_>) -> T + Send + Sync + 'static,
        T: 'static,
    {
        self.let_("subject", definition)
    }

    /// Define a helper holding a fresh [`Rc`] of a clonable value.
    pub fn let_value<T>(&mut self, name: impl Into<Cow<'static, str>>, value: T) -> &mut Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.let_(name, move |_| value.clone())
    }

    // --- shared groups ---

    /// Include a shared group inline, as if its declarations were written here.
    #[track_caller]
    pub fn include_examples(&mut self, name: impl Into<Cow<'static, str>>) -> &mut Self {
        self.decl.items.push(Decl::Include(Inclusion {
            name: name.into(),
            location: SourceLocation::caller(),
        }));
        self
    }

    /// Same as [`include_examples`](Self::include_examples).
    #[track_caller]
    pub fn include_context(&mut self, name: impl Into<Cow<'static, str>>) -> &mut Self {
        self.include_examples(name)
    }

    /// Include a shared group into a new nested group "behaves like <name>".
    #[track_caller]
    pub fn it_behaves_like(&mut self, name: impl Into<Cow<'static, str>>) -> &mut Self {
        let name = name.into();
        let location = SourceLocation::caller();
        let mut nested = GroupDecl::new(
            format!("behaves like {name}").into(),
            Metadata::new(),
            location.clone(),
        );
        nested.items.push(Decl::Include(Inclusion { name, location }));
        self.decl.items.push(Decl::Group(nested));
        self
    }
}
