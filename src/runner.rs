//! Executing a finalized tree.
//!
//! Examples run one after another on the calling thread, in the order given by
//! the ordering strategy. Every example gets a fresh [`ExampleCtx`], so helper
//! values and state never leak between examples. Events are sent to a reporter
//! thread over a bounded channel while execution continues.

use std::{
    cell::Cell,
    panic::resume_unwind,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

use crossbeam_channel::Sender;
use tracing::{info, trace, warn};

use crate::{
    capture::CapturePanicGuard,
    context::{Around, ExampleCtx, GroupCtx, State},
    error::{Error, Result},
    example::{ExampleFn, ExampleResult},
    filter::{ExampleFilter, FilteredExamples, NoFilter},
    hook::{self, AroundFn, HookKind, HookSet},
    mark::{DefaultMark, ExampleMark, Mark},
    ordering::{DefinedOrder, ExampleOrdering, OrderScope},
    outcome::{
        ExampleFailure, ExampleOutcome, ExampleStatus, FailureKind, FailureOrigin, FailureRecord,
        Reason,
    },
    panic::{self, Interruption},
    report::{ExampleRecord, GroupFailure, ListedExample, RunReport, RunSummary},
    reporter::{NoReporter, ReportErrors, ReportEvent, Reporter, RunStart, named_report},
    tree::{Example, ExampleId, GroupId, Tree, TreeItem},
    world::Phase,
};

/// Runs the examples of a finalized world.
///
/// Created by [`World::runner`](crate::World::runner) with the strategies of
/// the world's [`RunConfig`](crate::RunConfig). Each strategy can be replaced
/// through a `with_*` method.
pub struct Runner<'w, Filter, Marker, Order, Rep> {
    tree: &'w Tree,
    phase: &'w Cell<Phase>,
    quit: Arc<AtomicBool>,
    fail_fast: usize,
    filter: Filter,
    mark: Marker,
    ordering: Order,
    reporter: Rep,
}

impl<'w> Runner<'w, NoFilter, DefaultMark, DefinedOrder, NoReporter> {
    pub(crate) fn new(tree: &'w Tree, phase: &'w Cell<Phase>, quit: Arc<AtomicBool>) -> Self {
        Self {
            tree,
            phase,
            quit,
            fail_fast: 0,
            filter: NoFilter,
            mark: DefaultMark::default(),
            ordering: DefinedOrder,
            reporter: NoReporter,
        }
    }
}

impl<'w, Filter, Marker, Order, Rep> Runner<'w, Filter, Marker, Order, Rep> {
    pub fn with_filter<WithFilter: ExampleFilter>(
        self,
        filter: WithFilter,
    ) -> Runner<'w, WithFilter, Marker, Order, Rep> {
        Runner {
            tree: self.tree,
            phase: self.phase,
            quit: self.quit,
            fail_fast: self.fail_fast,
            filter,
            mark: self.mark,
            ordering: self.ordering,
            reporter: self.reporter,
        }
    }

    pub fn with_mark<WithMarker: ExampleMark>(
        self,
        mark: WithMarker,
    ) -> Runner<'w, Filter, WithMarker, Order, Rep> {
        Runner {
            tree: self.tree,
            phase: self.phase,
            quit: self.quit,
            fail_fast: self.fail_fast,
            filter: self.filter,
            mark,
            ordering: self.ordering,
            reporter: self.reporter,
        }
    }

    pub fn with_ordering<WithOrder: ExampleOrdering>(
        self,
        ordering: WithOrder,
    ) -> Runner<'w, Filter, Marker, WithOrder, Rep> {
        Runner {
            tree: self.tree,
            phase: self.phase,
            quit: self.quit,
            fail_fast: self.fail_fast,
            filter: self.filter,
            mark: self.mark,
            ordering,
            reporter: self.reporter,
        }
    }

    pub fn with_reporter<WithReporter: Reporter + Send>(
        self,
        reporter: WithReporter,
    ) -> Runner<'w, Filter, Marker, Order, WithReporter> {
        Runner {
            tree: self.tree,
            phase: self.phase,
            quit: self.quit,
            fail_fast: self.fail_fast,
            filter: self.filter,
            mark: self.mark,
            ordering: self.ordering,
            reporter,
        }
    }

    /// Stop after `threshold` failed examples, `0` disables.
    pub fn with_fail_fast(self, threshold: usize) -> Self {
        Self {
            fail_fast: threshold,
            ..self
        }
    }
}

impl<'w, Filter, M, Order, Rep> Runner<'w, Filter, M, Order, Rep>
where
    Filter: ExampleFilter,
    M: ExampleMark,
    Order: ExampleOrdering,
    Rep: Reporter + Send,
{
    /// Execute every scheduled example.
    ///
    /// Failing examples never make this fail, they end up in the report. A
    /// world can only run once until it is reset.
    pub fn run(self) -> Result<RunReport<Rep::Error>> {
        if self.phase.get() == Phase::Ran {
            return Err(Error::AlreadyRan);
        }
        self.phase.set(Phase::Ran);

        let now = Instant::now();
        let tree = self.tree;
        let filtered = self.filter.filter(tree);
        let seed = self.ordering.seed();

        let start = RunStart {
            total: tree.len(),
            scheduled: filtered.active(),
            filtered_out: filtered.filtered_out,
            seed,
        };
        info!(
            total = start.total,
            scheduled = start.scheduled,
            filtered_out = start.filtered_out,
            ?seed,
            "run started"
        );

        let mut reporter = self.reporter;
        let mut report_errors = Vec::new();
        report_errors.push_on_error(named_report!(reporter.run_started(&start)));

        let mark = &self.mark;
        let ordering = &self.ordering;
        let quit: &AtomicBool = &self.quit;
        let fail_fast = self.fail_fast;
        let filtered = &filtered;

        let (progress, mut reporter, mut report_errors) = thread::scope(move |scope| {
            let (tx, rx) = crossbeam_channel::bounded::<ReportEvent<'w>>(16);
            let report_thread = scope.spawn(move || {
                while let Ok(event) = rx.recv() {
                    report_errors.push_on_error(match event {
                        ReportEvent::Started(example) => named_report!(reporter.example_started(example)),
                        ReportEvent::Finished(record) => named_report!(reporter.example_finished(&record)),
                        ReportEvent::GroupFailed(failure) => named_report!(reporter.group_failed(&failure)),
                    });
                }
                (reporter, report_errors)
            });

            let mut session = Session {
                tree,
                filtered,
                mark,
                ordering,
                quit,
                fail_fast,
                tx,
                progress: Progress::default(),
            };
            {
                let _capture = CapturePanicGuard::install();
                session.run_suite();
            }
            let Session { progress, tx, .. } = session;
            drop(tx);

            let (reporter, report_errors) = report_thread
                .join()
                .unwrap_or_else(|payload| resume_unwind(payload));
            (progress, reporter, report_errors)
        });

        let Progress {
            records,
            group_failures,
            failed: _,
            stop,
        } = progress;
        let mut summary = RunSummary {
            total: tree.len(),
            filtered_out: filtered.filtered_out,
            group_failures,
            seed,
            duration: now.elapsed(),
            interrupted: stop == Some(Stop::Interrupted),
            aborted_by_fail_fast: stop == Some(Stop::FailFast),
            ..RunSummary::default()
        };
        records.iter().for_each(|record| summary.count(record.status()));
        info!(
            passed = summary.passed,
            failed = summary.failed,
            pending = summary.pending,
            skipped = summary.skipped,
            not_run = summary.not_run,
            duration = ?summary.duration,
            "run finished"
        );

        report_errors.push_on_error(named_report!(reporter.run_finished(&summary)));

        Ok(RunReport {
            records,
            summary,
            report_errors,
        })
    }
}

impl<'w, Filter, M, Order, Rep> Runner<'w, Filter, M, Order, Rep>
where
    Filter: ExampleFilter,
    Order: ExampleOrdering,
{
    /// Every example in the order it would run, flagged whether it passes the
    /// filter. Nothing is executed.
    pub fn list(&self) -> Vec<ListedExample> {
        let filtered = self.filter.filter(self.tree);
        self.tree
            .ordered_examples(&self.ordering)
            .into_iter()
            .map(|id| {
                let example = self.tree.example(id);
                ListedExample {
                    id,
                    full_description: example.full_description.clone(),
                    location: example.location.clone(),
                    scheduled: filtered.is_scheduled(id),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    FailFast,
    Interrupted,
}

#[derive(Debug, Default)]
struct Progress {
    records: Vec<ExampleRecord>,
    group_failures: usize,
    failed: usize,
    stop: Option<Stop>,
}

struct Session<'t, 'r, M, Order> {
    tree: &'t Tree,
    filtered: &'r FilteredExamples,
    mark: &'r M,
    ordering: &'r Order,
    quit: &'r AtomicBool,
    fail_fast: usize,
    tx: Sender<ReportEvent<'t>>,
    progress: Progress,
}

impl<'t, M, Order> Session<'t, '_, M, Order>
where
    M: ExampleMark,
    Order: ExampleOrdering,
{
    fn run_suite(&mut self) {
        if self.filtered.active() == 0 {
            return;
        }

        let global = self.tree.global_hooks();
        let mut suite_failure = None;
        for before in hook::suite_hooks(global, HookKind::Before) {
            if let Err(interruption) = panic::catch(FailureOrigin::BeforeSuiteHook, || before()) {
                warn!("before(suite) hook failed, failing every example");
                suite_failure = Some(failure_of(interruption, FailureOrigin::BeforeSuiteHook));
                break;
            }
        }

        for item in self.tree.ordered_items(OrderScope::Roots, self.ordering) {
            if let TreeItem::Group(id) = item {
                self.run_group(id, suite_failure.as_ref(), &[]);
            }
        }

        for after in hook::suite_hooks(global, HookKind::After) {
            if let Err(interruption) = panic::catch(FailureOrigin::AfterSuiteHook, || after()) {
                let failure = failure_of(interruption, FailureOrigin::AfterSuiteHook);
                self.group_failed(None, String::new(), failure);
            }
        }
    }

    fn stopped(&mut self) -> bool {
        if self.progress.stop.is_none() && self.quit.load(Ordering::SeqCst) {
            warn!("quit requested, remaining examples are not run");
            self.progress.stop = Some(Stop::Interrupted);
        }
        self.progress.stop.is_some()
    }

    fn has_scheduled(&self, group: GroupId) -> bool {
        self.tree
            .subtree_examples(group)
            .into_iter()
            .any(|id| self.filtered.is_scheduled(id))
    }

    fn run_group(&mut self, id: GroupId, inherited: Option<&ExampleFailure>, outer: &[&State]) {
        if !self.has_scheduled(id) {
            return;
        }

        let tree = self.tree;
        let group = tree.group(id);
        let items = tree.ordered_items(OrderScope::Group(group), self.ordering);

        if self.stopped() {
            self.run_items(&items, inherited, outer);
            return;
        }

        // global context hooks wrap the top level groups
        let levels: Vec<&HookSet> = match group.parent {
            None => vec![tree.global_hooks(), &group.hooks],
            Some(_) => vec![&group.hooks],
        };
        let mut ctx = GroupCtx::new(group);

        let mut group_failure = None;
        if inherited.is_none() {
            for before in hook::group_hooks(&levels, HookKind::Before, &group.metadata) {
                if let Err(interruption) =
                    panic::catch(FailureOrigin::BeforeContextHook, || before(&mut ctx))
                {
                    warn!(group = %group.full_description, "before(context) hook failed");
                    group_failure = Some(failure_of(interruption, FailureOrigin::BeforeContextHook));
                    break;
                }
            }
        }

        let mut states = outer.to_vec();
        states.push(ctx.state());
        self.run_items(&items, inherited.or(group_failure.as_ref()), &states);

        if inherited.is_none() {
            for after in hook::group_hooks(&levels, HookKind::After, &group.metadata) {
                if let Err(interruption) =
                    panic::catch(FailureOrigin::AfterContextHook, || after(&mut ctx))
                {
                    let failure = failure_of(interruption, FailureOrigin::AfterContextHook);
                    self.group_failed(Some(id), group.full_description.clone(), failure);
                }
            }
        }

        let state = ctx.into_state();
        let dropped = panic::catch(FailureOrigin::Teardown, move || {
            drop(state);
            ExampleResult::from(())
        });
        if let Err(interruption) = dropped {
            let failure = failure_of(interruption, FailureOrigin::Teardown);
            self.group_failed(Some(id), group.full_description.clone(), failure);
        }
    }

    fn run_items(&mut self, items: &[TreeItem], failure: Option<&ExampleFailure>, states: &[&State]) {
        for item in items {
            match *item {
                TreeItem::Example(id) if self.filtered.is_scheduled(id) => {
                    self.run_example(id, failure, states)
                }
                TreeItem::Example(_) => {}
                TreeItem::Group(id) => self.run_group(id, failure, states),
            }
        }
    }

    fn group_failed(&mut self, group: Option<GroupId>, full_description: String, failure: ExampleFailure) {
        warn!(group = %full_description, %failure, "group hook failed");
        self.progress.group_failures += 1;
        let _ = self.tx.send(ReportEvent::GroupFailed(GroupFailure {
            group,
            full_description,
            failure,
        }));
    }

    fn run_example(&mut self, id: ExampleId, inherited: Option<&ExampleFailure>, states: &[&State]) {
        let example = self.tree.example(id);

        if self.stopped() {
            self.finish(example, ExampleOutcome::unstarted());
            return;
        }

        let pending = match self.mark.mark(example) {
            Mark::Skip(reason) => {
                let outcome = outcome(ExampleStatus::Skipped { reason }, Vec::new(), Instant::now());
                self.finish(example, outcome);
                return;
            }
            Mark::Pending(reason) => Some(reason),
            Mark::Run => None,
        };

        if let Some(failure) = inherited {
            let outcome = outcome(ExampleStatus::Failed(failure.clone()), Vec::new(), Instant::now());
            self.finish(example, outcome);
            return;
        }

        trace!(example = %example.full_description, "example started");
        let _ = self.tx.send(ReportEvent::Started(example));
        let outcome = execute(self.tree, example, states, pending);
        self.finish(example, outcome);
    }

    fn finish(&mut self, example: &Example, outcome: ExampleOutcome) {
        trace!(example = %example.full_description, status = ?outcome.status, "example finished");
        if outcome.failed() {
            self.progress.failed += 1;
            if self.fail_fast > 0 && self.progress.failed >= self.fail_fast && self.progress.stop.is_none() {
                warn!(threshold = self.fail_fast, "fail fast threshold reached");
                self.progress.stop = Some(Stop::FailFast);
            }
        }

        let record = ExampleRecord::new(example, outcome);
        let _ = self.tx.send(ReportEvent::Finished(record.clone()));
        self.progress.records.push(record);
    }
}

fn failure_of(interruption: Interruption, origin: FailureOrigin) -> ExampleFailure {
    match interruption {
        Interruption::Failed(failure) => failure,
        Interruption::Skipped(reason) => ExampleFailure::new(
            FailureKind::Error,
            origin,
            format!(
                "cannot skip from here ({})",
                reason.as_deref().unwrap_or("no reason given")
            ),
        ),
    }
}

fn outcome(status: ExampleStatus, secondary_failures: Vec<ExampleFailure>, start: Instant) -> ExampleOutcome {
    let mut outcome = ExampleOutcome::unstarted();
    outcome.status = status;
    outcome.secondary_failures = secondary_failures;
    outcome.duration = start.elapsed();
    outcome
}

/// Run a single example with all of its every-example hooks.
fn execute(tree: &Tree, example: &Example, states: &[&State], pending: Option<Reason>) -> ExampleOutcome {
    let start = Instant::now();
    let levels = tree.hook_levels(example.group);
    let metadata = &example.metadata;
    let arounds = hook::around_hooks(&levels, metadata);
    let befores = hook::example_hooks(&levels, HookKind::Before, metadata);
    let afters = hook::example_hooks(&levels, HookKind::After, metadata);

    let mut ctx = ExampleCtx::new(example, tree.group(example.group).helpers(), states, pending);
    let mut core = |ctx: &mut ExampleCtx<'_>| run_core(ctx, &befores, &example.body, &afters);
    run_arounds(&arounds, &mut ctx, &mut core);
    ctx.teardown();

    let (FailureRecord { primary, secondary }, pending, skipped) = ctx.into_parts();
    let status = match (primary, pending, skipped) {
        (Some(failure), Some(reason), _) => ExampleStatus::Pending { reason, failure },
        (Some(failure), None, _) => ExampleStatus::Failed(failure),
        (None, _, Some(reason)) => ExampleStatus::Skipped { reason },
        (None, Some(reason), None) => {
            let message = match reason {
                Some(reason) => format!("expected pending '{reason}' to fail, but it passed"),
                None => String::from("expected pending example to fail, but it passed"),
            };
            ExampleStatus::Failed(ExampleFailure::new(
                FailureKind::PendingFixed,
                FailureOrigin::Body,
                message,
            ))
        }
        (None, None, None) => ExampleStatus::Passed,
    };
    outcome(status, secondary, start)
}

/// Before hooks outer to inner, the body, then after hooks inner to outer.
///
/// The first failing before hook skips the remaining before hooks and the
/// body. After hooks always run.
fn run_core(ctx: &mut ExampleCtx<'_>, befores: &[&ExampleFn], body: &ExampleFn, afters: &[&ExampleFn]) {
    for before in befores {
        if let Err(interruption) = panic::catch(FailureOrigin::BeforeHook, || before(ctx)) {
            ctx.record(interruption);
            break;
        }
    }

    if !ctx.has_interruption() {
        if let Err(interruption) = panic::catch(FailureOrigin::Body, || body(ctx)) {
            ctx.record(interruption);
        }
    }

    for after in afters {
        if let Err(interruption) = panic::catch(FailureOrigin::AfterHook, || after(ctx)) {
            ctx.record(interruption);
        }
    }
}

/// Nest the around hooks, the first one outermost, around `core`.
fn run_arounds<'e>(
    arounds: &[&AroundFn],
    ctx: &mut ExampleCtx<'e>,
    core: &mut dyn FnMut(&mut ExampleCtx<'e>),
) {
    let Some((outer, rest)) = arounds.split_first() else {
        core(ctx);
        return;
    };

    let mut inner = |ctx: &mut ExampleCtx<'e>| run_arounds(rest, ctx, &mut *core);
    let mut around = Around::new(ctx, &mut inner);
    let result = panic::catch(FailureOrigin::AroundHook, || outer(&mut around));
    let ran = around.has_run();
    drop(around);

    match result {
        Err(interruption) => ctx.record(interruption),
        Ok(()) if !ran => ctx.record_failure(ExampleFailure::new(
            FailureKind::AroundDidNotRun,
            FailureOrigin::AroundHook,
            "around hook returned without running the example",
        )),
        Ok(()) => {}
    }
}
