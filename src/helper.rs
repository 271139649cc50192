//! Memoized helpers, the `let` of kispec.
//!
//! A helper is a named, lazily computed value. The first access within an
//! example evaluates the definition and caches the result, later accesses of
//! the same example get the cached value. Every example starts with an empty
//! cache.
//!
//! Definitions live on groups. A definition in a nested group shadows the
//! same-named definitions of its ancestors, but can still reach the shadowed
//! one through [`Super`].

use std::{
    any::{Any, type_name},
    borrow::Cow,
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
    sync::Arc,
};

use indexmap::IndexMap;
use thiserror::Error;

use crate::context::ExampleCtx;

pub(crate) type HelperFn =
    Arc<dyn Fn(&ExampleCtx<'_>, Super<'_>) -> Rc<dyn Any> + Send + Sync>;

pub(crate) fn helper_fn<F, T>(f: F) -> HelperFn
where
    F: Fn(&ExampleCtx<'_>) -> T + Send + Sync + 'static,
    T: 'static,
{
    Arc::new(move |ctx: &ExampleCtx<'_>, _: Super<'_>| -> Rc<dyn Any> { Rc::new(f(ctx)) })
}

pub(crate) fn override_fn<F, T>(f: F) -> HelperFn
where
    F: Fn(&ExampleCtx<'_>, Super<'_>) -> T + Send + Sync + 'static,
    T: 'static,
{
    Arc::new(move |ctx: &ExampleCtx<'_>, sup: Super<'_>| -> Rc<dyn Any> { Rc::new(f(ctx, sup)) })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HelperError {
    #[error("no helper named {0:?} is defined for this example")]
    Unknown(String),

    #[error("helper {name:?} does not hold a value of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("helper {0:?} depends on itself")]
    Cycle(String),

    #[error("helper {0:?} has no definition in an outer group")]
    NoSuper(String),
}

pub(crate) fn downcast<T: 'static>(name: &str, value: Rc<dyn Any>) -> Result<Rc<T>, HelperError> {
    value.downcast::<T>().map_err(|_| HelperError::TypeMismatch {
        name: name.to_string(),
        expected: type_name::<T>(),
    })
}

/// Access to the definition a helper override shadows.
#[derive(Clone, Copy)]
pub struct Super<'h> {
    name: &'h str,
    outer: &'h [HelperFn],
}

impl<'h> Super<'h> {
    pub(crate) fn new(name: &'h str, outer: &'h [HelperFn]) -> Self {
        Self { name, outer }
    }

    /// Evaluate the next outer definition.
    ///
    /// The value is not cached, and the outer definition sees its own outer
    /// definitions through its own `Super`.
    pub fn try_value<T: 'static>(&self, ctx: &ExampleCtx<'_>) -> Result<Rc<T>, HelperError> {
        let (definition, rest) = self
            .outer
            .split_first()
            .ok_or_else(|| HelperError::NoSuper(self.name.to_string()))?;
        let value = definition(ctx, Super::new(self.name, rest));
        downcast(self.name, value)
    }

    /// Like [`try_value`](Self::try_value), but panics on error, failing the example.
    #[track_caller]
    pub fn value<T: 'static>(&self, ctx: &ExampleCtx<'_>) -> Rc<T> {
        match self.try_value(ctx) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl fmt::Debug for Super<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Super")
            .field("name", &self.name)
            .field("depth", &self.outer.len())
            .finish()
    }
}

/// All helper definitions visible to the examples of one group.
///
/// Each name maps to its definition chain, innermost definition first.
#[derive(Clone, Default)]
pub struct HelperTable(HashMap<Cow<'static, str>, Arc<[HelperFn]>>);

impl HelperTable {
    /// Layer the definitions of a group on top of its parent's table.
    ///
    /// Within one group the last definition of a name wins.
    pub(crate) fn layered(parent: &HelperTable, own: Vec<(Cow<'static, str>, HelperFn)>) -> Self {
        let latest: IndexMap<_, _> = own.into_iter().collect();
        let mut table = parent.clone();
        for (name, definition) in latest {
            let mut chain = vec![definition];
            if let Some(outer) = parent.0.get(&name) {
                chain.extend(outer.iter().cloned());
            }
            table.0.insert(name, chain.into());
        }
        table
    }

    pub(crate) fn chain(&self, name: &str) -> Option<(&Cow<'static, str>, &[HelperFn])> {
        self.0.get_key_value(name).map(|(k, v)| (k, v.as_ref()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// How many definitions of `name` are stacked.
    pub fn depth(&self, name: &str) -> usize {
        self.0.get(name).map_or(0, |chain| chain.len())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_ref())
    }
}

impl fmt::Debug for HelperTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

/// The per example cache of helper values.
#[derive(Default)]
pub(crate) struct Memo {
    values: RefCell<HashMap<Cow<'static, str>, Rc<dyn Any>>>,
    evaluating: RefCell<Vec<Cow<'static, str>>>,
}

impl Memo {
    pub(crate) fn cached(&self, name: &str) -> Option<Rc<dyn Any>> {
        self.values.borrow().get(name).cloned()
    }

    pub(crate) fn store(&self, name: Cow<'static, str>, value: Rc<dyn Any>) {
        self.values.borrow_mut().insert(name, value);
    }

    pub(crate) fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Mark `name` as being evaluated until the guard drops.
    pub(crate) fn enter(&self, name: &Cow<'static, str>) -> Result<EvaluationGuard<'_>, HelperError> {
        let mut evaluating = self.evaluating.borrow_mut();
        if evaluating.iter().any(|n| n == name) {
            return Err(HelperError::Cycle(name.to_string()));
        }
        evaluating.push(name.clone());
        Ok(EvaluationGuard { memo: self })
    }
}

/// Pops the evaluation stack on drop, also while unwinding.
pub(crate) struct EvaluationGuard<'m> {
    memo: &'m Memo,
}

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        self.memo.evaluating.borrow_mut().pop();
    }
}
