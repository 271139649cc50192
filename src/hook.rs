//! Hooks and their resolution.
//!
//! Hooks are declared on groups (or globally on the world) and are never owned
//! by examples. For a given example the applicable hooks are collected at run
//! time by walking from the outermost level down to the example's own group,
//! keeping only the hooks whose filter matches the example's metadata.
//!
//! Before and around hooks run outer to inner, after hooks inner to outer.
//! Within a single level the declaration order is always kept.

use std::{fmt, sync::Arc};

use crate::{
    context::{Around, ExampleCtx, GroupCtx},
    error::DeclarationErrorKind,
    example::{ExampleFn, ExampleResult, SourceLocation, example_fn},
    metadata::{MetaFilter, Metadata},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
    Around,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::Around => "around",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookScope {
    /// Once for every example.
    Each,

    /// Once for a group, around all of its examples.
    Context,

    /// Once for the whole run.
    Suite,
}

impl fmt::Display for HookScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookScope::Each => "each",
            HookScope::Context => "context",
            HookScope::Suite => "suite",
        })
    }
}

pub type AroundFn = Arc<dyn Fn(&mut Around<'_, '_>) -> ExampleResult + Send + Sync>;
pub type GroupHookFn = Arc<dyn Fn(&mut GroupCtx<'_>) -> ExampleResult + Send + Sync>;
pub type SuiteHookFn = Arc<dyn Fn() -> ExampleResult + Send + Sync>;

/// The callable part of a hook.
///
/// Every scope hands a different context to its hooks, so the body shape has
/// to fit the kind and scope it is registered with.
#[derive(Clone)]
#[non_exhaustive]
pub enum HookBody {
    Example(ExampleFn),
    Around(AroundFn),
    Group(GroupHookFn),
    Suite(SuiteHookFn),
}

impl HookBody {
    pub fn example<F, R>(f: F) -> Self
    where
        F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        Self::Example(example_fn(f))
    }

    pub fn around<F, R>(f: F) -> Self
    where
        F: Fn(&mut Around<'_, '_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        Self::Around(Arc::new(move |around: &mut Around<'_, '_>| -> ExampleResult {
            f(around).into()
        }))
    }

    pub fn group<F, R>(f: F) -> Self
    where
        F: Fn(&mut GroupCtx<'_>) -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        Self::Group(Arc::new(move |ctx: &mut GroupCtx<'_>| -> ExampleResult {
            f(ctx).into()
        }))
    }

    pub fn suite<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        Self::Suite(Arc::new(move || -> ExampleResult { f().into() }))
    }

    fn fits(&self, kind: HookKind, scope: HookScope) -> bool {
        let timed = matches!(kind, HookKind::Before | HookKind::After);
        match self {
            HookBody::Example(_) => timed && scope == HookScope::Each,
            HookBody::Around(_) => kind == HookKind::Around && scope == HookScope::Each,
            HookBody::Group(_) => timed && scope == HookScope::Context,
            HookBody::Suite(_) => timed && scope == HookScope::Suite,
        }
    }
}

impl fmt::Debug for HookBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookBody::Example(_) => "Example(...)",
            HookBody::Around(_) => "Around(...)",
            HookBody::Group(_) => "Group(...)",
            HookBody::Suite(_) => "Suite(...)",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Hook {
    kind: HookKind,
    scope: HookScope,
    filter: MetaFilter,
    body: HookBody,
    location: SourceLocation,
}

impl Hook {
    /// Validate and build a hook.
    pub fn new(
        kind: HookKind,
        scope: HookScope,
        filter: MetaFilter,
        body: HookBody,
        location: SourceLocation,
    ) -> Result<Self, DeclarationErrorKind> {
        if kind == HookKind::Around && scope != HookScope::Each {
            return Err(DeclarationErrorKind::UnsupportedHook { kind, scope });
        }
        if !body.fits(kind, scope) {
            return Err(DeclarationErrorKind::HookBodyMismatch { kind, scope });
        }
        filter
            .validate()
            .map_err(DeclarationErrorKind::MalformedFilter)?;

        Ok(Self {
            kind,
            scope,
            filter,
            body,
            location,
        })
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    pub fn scope(&self) -> HookScope {
        self.scope
    }

    pub fn filter(&self) -> &MetaFilter {
        &self.filter
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn body(&self) -> &HookBody {
        &self.body
    }

    pub fn applies_to(&self, metadata: &Metadata) -> bool {
        self.filter.matches(metadata)
    }
}

/// The hooks declared on one level, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct HookSet(Vec<Hook>);

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, hook: Hook) {
        self.0.push(hook);
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Hook> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matching<'s>(
        &'s self,
        kind: HookKind,
        scope: HookScope,
        metadata: &'s Metadata,
    ) -> impl Iterator<Item = &'s Hook> {
        self.0.iter().filter(move |hook| {
            hook.kind == kind && hook.scope == scope && hook.applies_to(metadata)
        })
    }
}

/// Collect the hooks of `kind` across `levels`, outermost level first.
///
/// After hooks come out with the level order reversed, the order within a
/// level stays as declared.
pub fn resolve<'h>(
    levels: &[&'h HookSet],
    kind: HookKind,
    scope: HookScope,
    metadata: &Metadata,
) -> Vec<&'h Hook> {
    let mut hooks = Vec::new();
    let mut visit = |level: &'h HookSet| {
        hooks.extend(level.0.iter().filter(|hook| {
            hook.kind == kind && hook.scope == scope && hook.applies_to(metadata)
        }));
    };
    match kind {
        HookKind::After => levels.iter().rev().for_each(|level| visit(*level)),
        HookKind::Before | HookKind::Around => levels.iter().for_each(|level| visit(*level)),
    }
    hooks
}

pub(crate) fn example_hooks<'h>(
    levels: &[&'h HookSet],
    kind: HookKind,
    metadata: &Metadata,
) -> Vec<&'h ExampleFn> {
    resolve(levels, kind, HookScope::Each, metadata)
        .into_iter()
        .filter_map(|hook| match &hook.body {
            HookBody::Example(f) => Some(f),
            _ => None,
        })
        .collect()
}

pub(crate) fn around_hooks<'h>(levels: &[&'h HookSet], metadata: &Metadata) -> Vec<&'h AroundFn> {
    resolve(levels, HookKind::Around, HookScope::Each, metadata)
        .into_iter()
        .filter_map(|hook| match &hook.body {
            HookBody::Around(f) => Some(f),
            _ => None,
        })
        .collect()
}

pub(crate) fn group_hooks<'h>(
    levels: &[&'h HookSet],
    kind: HookKind,
    metadata: &Metadata,
) -> Vec<&'h GroupHookFn> {
    resolve(levels, kind, HookScope::Context, metadata)
        .into_iter()
        .filter_map(|hook| match &hook.body {
            HookBody::Group(f) => Some(f),
            _ => None,
        })
        .collect()
}

pub(crate) fn suite_hooks<'h>(set: &'h HookSet, kind: HookKind) -> Vec<&'h SuiteHookFn> {
    resolve(&[set], kind, HookScope::Suite, &Metadata::new())
        .into_iter()
        .filter_map(|hook| match &hook.body {
            HookBody::Suite(f) => Some(f),
            _ => None,
        })
        .collect()
}
