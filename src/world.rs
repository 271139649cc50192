//! The world, the root of every declaration.
//!
//! A [`World`] owns the top level groups, the shared group registry, the global
//! hooks and the run configuration. It goes through three phases:
//!
//! 1. declaring: groups, shared groups and global hooks are recorded,
//! 2. finalized: the declarations were turned into a [`Tree`],
//! 3. ran: the tree was executed once.
//!
//! [`World::reset`] brings it back to an empty declaring world.

use std::{
    borrow::Cow,
    cell::Cell,
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::debug;

use crate::{
    config::{OrderMode, RunConfig},
    context::{Around, ExampleCtx},
    declare::{GroupBuilder, GroupDecl},
    error::{DeclarationError, DeclarationErrorKind, Error, Result},
    example::{ExampleResult, SourceLocation},
    filter::MetadataFilter,
    hook::{Hook, HookBody, HookKind, HookScope, HookSet},
    mark::DefaultMark,
    metadata::{MetaFilter, Metadata},
    report::{ListedExample, RunReport},
    reporter::{NoReporter, Reporter},
    runner::Runner,
    shared::SharedGroups,
    tree::{Tree, TreeBuilder},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Declaring,
    Finalized,
    Ran,
}

/// Requests a running world to stop.
///
/// Examples already running complete, every example after them is reported as
/// not run.
#[derive(Debug, Clone)]
pub struct QuitHandle(Arc<AtomicBool>);

impl QuitHandle {
    pub fn request_quit(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_quit_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct World {
    phase: Cell<Phase>,
    roots: Vec<GroupDecl>,
    shared: SharedGroups,
    hooks: HookSet,
    hook_errors: Vec<DeclarationErrorKind>,
    tree: Option<Tree>,
    config: RunConfig,
    quit: Arc<AtomicBool>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            phase: Cell::new(Phase::Declaring),
            roots: Vec::new(),
            shared: SharedGroups::new(),
            hooks: HookSet::new(),
            hook_errors: Vec::new(),
            tree: None,
            config: RunConfig::default(),
            quit: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(self, config: RunConfig) -> Self {
        Self { config, ..self }
    }

    pub fn set_config(&mut self, config: RunConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn declaring(&self) -> Result<()> {
        match self.phase.get() {
            Phase::Declaring => Ok(()),
            Phase::Finalized | Phase::Ran => Err(Error::AlreadyFinalized),
        }
    }

    /// Declare a top level group.
    #[track_caller]
    pub fn describe<F>(&mut self, description: impl Into<Cow<'static, str>>, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut GroupBuilder),
    {
        self.describe_with(description, Metadata::new(), block)
    }

    /// Declare a top level group with metadata.
    #[track_caller]
    pub fn describe_with<F>(
        &mut self,
        description: impl Into<Cow<'static, str>>,
        metadata: Metadata,
        block: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut GroupBuilder),
    {
        self.declaring()?;
        let location = SourceLocation::caller();
        let mut builder = GroupBuilder::new(GroupDecl::new(description.into(), metadata, location));
        block(&mut builder);
        self.roots.push(builder.finish());
        Ok(self)
    }

    /// Register a shared group under `name`.
    pub fn shared_examples<F>(&mut self, name: impl Into<Cow<'static, str>>, block: F) -> Result<&mut Self>
    where
        F: Fn(&mut GroupBuilder) + Send + Sync + 'static,
    {
        self.declaring()?;
        self.shared.register(Some(name.into()), None, Arc::new(block));
        Ok(self)
    }

    /// Same as [`shared_examples`](Self::shared_examples).
    pub fn shared_context<F>(&mut self, name: impl Into<Cow<'static, str>>, block: F) -> Result<&mut Self>
    where
        F: Fn(&mut GroupBuilder) + Send + Sync + 'static,
    {
        self.shared_examples(name, block)
    }

    /// Register a shared group included into every group matching `filter`.
    pub fn shared_context_for<F>(&mut self, filter: impl Into<MetaFilter>, block: F) -> Result<&mut Self>
    where
        F: Fn(&mut GroupBuilder) + Send + Sync + 'static,
    {
        self.declaring()?;
        let filter = self.checked(filter.into());
        self.shared.register(None, Some(filter), Arc::new(block));
        Ok(self)
    }

    fn checked(&mut self, filter: MetaFilter) -> MetaFilter {
        if let Err(err) = filter.validate() {
            self.hook_errors.push(DeclarationErrorKind::MalformedFilter(err));
        }
        filter
    }

    /// Register a shared group that can be included by name and is also
    /// included implicitly into groups matching `filter`.
    ///
    /// A group both matching and including it explicitly gets it once.
    pub fn shared_examples_for<F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        filter: impl Into<MetaFilter>,
        block: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut GroupBuilder) + Send + Sync + 'static,
    {
        self.declaring()?;
        let filter = self.checked(filter.into());
        self.shared.register(Some(name.into()), Some(filter), Arc::new(block));
        Ok(self)
    }

    /// Register global hooks.
    pub fn configure<F>(&mut self, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut GlobalHooks<'_>),
    {
        self.declaring()?;
        block(&mut GlobalHooks {
            hooks: &mut self.hooks,
            errors: &mut self.hook_errors,
        });
        Ok(self)
    }

    /// Finalize the declarations into a tree.
    ///
    /// Called implicitly by [`runner`](Self::runner) and [`list`](Self::list).
    /// Finalizing twice returns the same tree.
    pub fn finalize(&mut self) -> Result<&Tree> {
        if self.tree.is_none() {
            let global_errors = self.hook_errors.iter().cloned().map(|kind| DeclarationError {
                group: String::new(),
                kind,
            });
            let global_errors: Vec<_> = global_errors.collect();

            let built = TreeBuilder::new(&self.shared, self.hooks.clone()).build(self.roots.clone());
            let tree = match (built, global_errors.is_empty()) {
                (Ok(tree), true) => tree,
                (Ok(_), false) => return Err(Error::Declaration(global_errors)),
                (Err(Error::Declaration(errors)), _) => {
                    return Err(Error::Declaration(
                        global_errors.into_iter().chain(errors).collect(),
                    ));
                }
                (Err(err), _) => return Err(err),
            };

            debug!(roots = tree.roots().len(), examples = tree.len(), "world finalized");
            self.tree = Some(tree);
            self.phase.set(Phase::Finalized);
        }

        match &self.tree {
            Some(tree) => Ok(tree),
            None => unreachable!("tree was just built"),
        }
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.phase.get() != Phase::Declaring
    }

    pub fn has_run(&self) -> bool {
        self.phase.get() == Phase::Ran
    }

    /// A runner configured from the world's [`RunConfig`].
    pub fn runner(&mut self) -> Result<Runner<'_, MetadataFilter, DefaultMark, OrderMode, NoReporter>> {
        self.finalize()?;
        let Some(tree) = &self.tree else {
            unreachable!("finalize builds the tree");
        };
        Ok(Runner::new(tree, &self.phase, Arc::clone(&self.quit))
            .with_filter(self.config.filter.clone())
            .with_ordering(self.config.ordering)
            .with_fail_fast(self.config.fail_fast.map_or(0, |n| n.get())))
    }

    /// Run every example without a reporter.
    pub fn run(&mut self) -> Result<RunReport<Infallible>> {
        self.runner()?.run()
    }

    /// Run every example, reporting to `reporter`.
    pub fn run_with<R>(&mut self, reporter: R) -> Result<RunReport<R::Error>>
    where
        R: Reporter + Send,
    {
        self.runner()?.with_reporter(reporter).run()
    }

    /// Every example in the order it would run, without running anything.
    pub fn list(&mut self) -> Result<Vec<ListedExample>> {
        Ok(self.runner()?.list())
    }

    pub fn quit_handle(&self) -> QuitHandle {
        QuitHandle(Arc::clone(&self.quit))
    }

    /// Drop every declaration and the tree, keeping the configuration.
    ///
    /// Existing [`QuitHandle`]s stay connected to the world.
    pub fn reset(&mut self) {
        debug!("world reset");
        self.phase.set(Phase::Declaring);
        self.roots.clear();
        self.shared = SharedGroups::new();
        self.hooks = HookSet::new();
        self.hook_errors.clear();
        self.tree = None;
        self.quit.store(false, Ordering::SeqCst);
    }
}

/// Global hooks, the outermost hook level of every example.
#[derive(Debug)]
pub struct GlobalHooks<'w> {
    hooks: &'w mut HookSet,
    errors: &'w mut Vec<DeclarationErrorKind>,
}

impl GlobalHooks<'_> {
    /// Register a hook of any kind and scope.
    ///
    /// Context scoped hooks run around every top level group.
    #[track_caller]
    pub fn hook(
        &mut self,
        kind: HookKind,
        scope: HookScope,
        filter: impl Into<MetaFilter>,
        body: HookBody,
    ) -> &mut Self {
        match Hook::new(kind, scope, filter.into(), body, SourceLocation::caller()) {
            Ok(hook) => self.hooks.push(hook),
            Err(err) => self.errors.push(err),
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

    /// Runs once before the first example of the run.
    #[track_caller]
    pub fn before_suite<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::Before, HookScope::Suite, MetaFilter::new(), HookBody::suite(body))
    }

    /// Runs once after the last example of the run.
    #[track_caller]
    pub fn after_suite<F, R>(&mut self, body: F) -> &mut Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<ExampleResult>,
    {
        self.hook(HookKind::After, HookScope::Suite, MetaFilter::new(), HookBody::suite(body))
    }
}
