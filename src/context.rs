//! Execution contexts handed to example bodies and hooks.
//!
//! An [`ExampleCtx`] is created fresh for every example and dropped when the
//! example is done. It owns the memoized helper values and any state hooks
//! want to hand over to the body, so nothing leaks from one example into the
//! next.

use std::{
    any::{Any, TypeId},
    borrow::Cow,
    collections::HashMap,
    fmt, mem,
    ops::{Deref, DerefMut},
    rc::Rc,
};

use crate::{
    example::{ExampleResult, SourceLocation},
    helper::{self, HelperError, HelperTable, Memo, Super},
    metadata::Metadata,
    outcome::{ExampleFailure, FailureOrigin, FailureRecord, Reason},
    panic::{self, Interruption},
    tree::{Example, ExampleGroup},
};

/// A type keyed map for passing values between hooks and bodies.
#[derive(Default)]
pub struct State(HashMap<TypeId, Box<dyn Any>>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: 'static>(&mut self, v: T) {
        self.0.insert(TypeId::of::<T>(), Box::new(v));
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.0.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn take<T: 'static>(&mut self) -> Option<T> {
        self.0
            .remove(&TypeId::of::<T>())?
            .downcast()
            .ok()
            .map(|b| *b)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("len", &self.0.len()).finish()
    }
}

/// The isolated context of a single example execution.
pub struct ExampleCtx<'e> {
    example: &'e Example,
    helpers: &'e HelperTable,
    memo: Memo,
    state: State,
    group_states: &'e [&'e State],
    pending: Option<Reason>,
    skipped: Option<Reason>,
    failures: FailureRecord,
}

impl<'e> ExampleCtx<'e> {
    pub(crate) fn new(
        example: &'e Example,
        helpers: &'e HelperTable,
        group_states: &'e [&'e State],
        pending: Option<Reason>,
    ) -> Self {
        Self {
            example,
            helpers,
            memo: Memo::default(),
            state: State::default(),
            group_states,
            pending,
            skipped: None,
            failures: FailureRecord::default(),
        }
    }

    pub fn description(&self) -> &str {
        &self.example.description
    }

    pub fn full_description(&self) -> &str {
        &self.example.full_description
    }

    pub fn metadata(&self) -> &Metadata {
        &self.example.metadata
    }

    pub fn location(&self) -> &SourceLocation {
        &self.example.location
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// A value a `before_all` hook of an enclosing group stored in its
    /// [`GroupCtx`] state.
    ///
    /// The innermost group holding a `T` wins.
    pub fn group_state<T: 'static>(&self) -> Option<&T> {
        self.group_states.iter().rev().find_map(|state| state.get::<T>())
    }

    /// Get the value of helper `name`, evaluating it on first access.
    ///
    /// A definition that panics is not cached, the next access evaluates it
    /// again.
    pub fn try_get<T: 'static>(&self, name: &str) -> Result<Rc<T>, HelperError> {
        let value = self.evaluate(name)?;
        helper::downcast(name, value)
    }

    /// Like [`try_get`](Self::try_get), but panics on error, failing the example.
    #[track_caller]
    pub fn get<T: 'static>(&self, name: &str) -> Rc<T> {
        match self.try_get(name) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// The value of the `subject` helper.
    #[track_caller]
    pub fn subject<T: 'static>(&self) -> Rc<T> {
        self.get("subject")
    }

    /// Evaluate helper `name` without looking at its type.
    pub fn force(&self, name: &str) -> Result<(), HelperError> {
        self.evaluate(name).map(|_| ())
    }

    /// Number of helper values cached so far.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    fn evaluate(&self, name: &str) -> Result<Rc<dyn Any>, HelperError> {
        if let Some(value) = self.memo.cached(name) {
            return Ok(value);
        }

        let (key, chain) = self
            .helpers
            .chain(name)
            .ok_or_else(|| HelperError::Unknown(name.to_string()))?;
        let Some((definition, outer)) = chain.split_first() else {
            return Err(HelperError::Unknown(name.to_string()));
        };

        let guard = self.memo.enter(key)?;
        let value = definition(self, Super::new(key, outer));
        drop(guard);

        self.memo.store(key.clone(), Rc::clone(&value));
        Ok(value)
    }

    /// Mark the example as pending from here on.
    ///
    /// A pending example is expected to fail. If it passes anyway, it is
    /// reported as failed.
    pub fn pending(&mut self, reason: impl Into<Cow<'static, str>>) {
        self.pending = Some(Some(reason.into()));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Abort the example and report it as skipped.
    ///
    /// After hooks still run.
    pub fn skip(&self, reason: impl Into<Cow<'static, str>>) -> ! {
        panic::raise_skip(Some(reason.into()))
    }

    /// The first failure recorded so far, useful in after and around hooks.
    pub fn failure(&self) -> Option<&ExampleFailure> {
        self.failures.primary.as_ref()
    }

    pub(crate) fn record(&mut self, interruption: Interruption) {
        match interruption {
            Interruption::Failed(failure) => self.failures.push(failure),
            Interruption::Skipped(reason) => {
                self.skipped.get_or_insert(reason);
            }
        }
    }

    pub(crate) fn record_failure(&mut self, failure: ExampleFailure) {
        self.failures.push(failure);
    }

    pub(crate) fn has_interruption(&self) -> bool {
        !self.failures.is_empty() || self.skipped.is_some()
    }

    /// Drop the helper values and the state of the example.
    ///
    /// A value panicking in its destructor fails the example.
    pub(crate) fn teardown(&mut self) {
        let memo = mem::take(&mut self.memo);
        let state = mem::take(&mut self.state);
        let dropped = panic::catch(FailureOrigin::Teardown, move || {
            drop(memo);
            drop(state);
            ExampleResult::from(())
        });
        if let Err(interruption) = dropped {
            self.record(interruption);
        }
    }

    pub(crate) fn into_parts(self) -> (FailureRecord, Option<Reason>, Option<Reason>) {
        (self.failures, self.pending, self.skipped)
    }
}

impl fmt::Debug for ExampleCtx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleCtx")
            .field("example", &self.example.full_description)
            .field("memoized", &self.memo.len())
            .field("state", &self.state)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// Handle given to around hooks.
///
/// Dereferences to the [`ExampleCtx`] of the wrapped example. The hook has to
/// call [`run`](Self::run) exactly once, otherwise the example fails.
pub struct Around<'a, 'e> {
    ctx: &'a mut ExampleCtx<'e>,
    inner: &'a mut dyn FnMut(&mut ExampleCtx<'e>),
    ran: bool,
}

impl<'a, 'e> Around<'a, 'e> {
    pub(crate) fn new(
        ctx: &'a mut ExampleCtx<'e>,
        inner: &'a mut dyn FnMut(&mut ExampleCtx<'e>),
    ) -> Self {
        Self {
            ctx,
            inner,
            ran: false,
        }
    }

    /// Run the wrapped example, including inner around, before and after hooks.
    ///
    /// Failures of the wrapped part are recorded on the example and do not
    /// unwind into the around hook. Calling this more than once does nothing.
    pub fn run(&mut self) {
        if self.ran {
            return;
        }
        self.ran = true;
        (self.inner)(&mut *self.ctx);
    }

    pub fn has_run(&self) -> bool {
        self.ran
    }
}

impl<'e> Deref for Around<'_, 'e> {
    type Target = ExampleCtx<'e>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for Around<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

/// The context of once-per-group hooks.
///
/// The same context is used for all `before_all` and `after_all` hooks of a
/// group, so they can share [`State`].
pub struct GroupCtx<'g> {
    group: &'g ExampleGroup,
    state: State,
}

impl<'g> GroupCtx<'g> {
    pub(crate) fn new(group: &'g ExampleGroup) -> Self {
        Self {
            group,
            state: State::default(),
        }
    }

    pub fn description(&self) -> &str {
        &self.group.description
    }

    pub fn full_description(&self) -> &str {
        &self.group.full_description
    }

    pub fn metadata(&self) -> &Metadata {
        &self.group.metadata
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub(crate) fn into_state(self) -> State {
        self.state
    }
}

impl fmt::Debug for GroupCtx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCtx")
            .field("group", &self.group.full_description)
            .field("state", &self.state)
            .finish()
    }
}
