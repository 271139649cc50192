use std::{
    fmt::Debug,
    process::{ExitCode, Termination},
    sync::Arc,
    time::Duration,
};

use crate::{
    example::SourceLocation,
    metadata::Metadata,
    outcome::{ExampleFailure, ExampleOutcome, ExampleStatus},
    tree::{Example, ExampleId, GroupId},
};

/// The result of a single example, as delivered to reporters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExampleRecord {
    pub id: ExampleId,
    pub description: String,
    pub full_description: String,
    pub metadata: Arc<Metadata>,
    pub location: SourceLocation,
    pub outcome: ExampleOutcome,
}

impl ExampleRecord {
    pub(crate) fn new(example: &Example, outcome: ExampleOutcome) -> Self {
        Self {
            id: example.id,
            description: example.description.to_string(),
            full_description: example.full_description.clone(),
            metadata: Arc::clone(&example.metadata),
            location: example.location.clone(),
            outcome,
        }
    }

    pub fn status(&self) -> &ExampleStatus {
        &self.outcome.status
    }
}

/// A failure of a once-per-group or once-per-run hook that could not be
/// attributed to an example anymore.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct GroupFailure {
    /// `None` for suite hooks.
    pub group: Option<GroupId>,
    pub full_description: String,
    pub failure: ExampleFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
    pub not_run: usize,
    pub filtered_out: usize,
    pub group_failures: usize,
    pub seed: Option<u64>,
    pub duration: Duration,

    /// The run was stopped through a [`QuitHandle`](crate::QuitHandle).
    pub interrupted: bool,

    /// The run was stopped by the fail fast threshold.
    pub aborted_by_fail_fast: bool,
}

impl RunSummary {
    pub(crate) fn count(&mut self, status: &ExampleStatus) {
        match status {
            ExampleStatus::Passed => self.passed += 1,
            ExampleStatus::Failed(_) => self.failed += 1,
            ExampleStatus::Pending { .. } => self.pending += 1,
            ExampleStatus::Skipped { .. } => self.skipped += 1,
            ExampleStatus::NotRun => self.not_run += 1,
        }
    }

    /// Whether the run counts as successful.
    pub fn is_good(&self) -> bool {
        self.failed == 0 && self.group_failures == 0 && !self.interrupted
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub struct RunReport<E> {
    /// Every scheduled example, in execution order.
    pub records: Vec<ExampleRecord>,
    pub summary: RunSummary,
    pub report_errors: Vec<(&'static str, E)>,
}

impl<E> RunReport<E> {
    pub fn exit_code(&self) -> ExitCode {
        match self.summary.is_good() {
            true => ExitCode::SUCCESS,
            false => ExitCode::FAILURE,
        }
    }

    /// Find a record by full description.
    pub fn record(&self, full_description: &str) -> Option<&ExampleRecord> {
        self.records
            .iter()
            .find(|record| record.full_description == full_description)
    }
}

impl<E: Debug> Termination for RunReport<E> {
    fn report(self) -> ExitCode {
        self.exit_code()
    }
}

/// An entry of [`Runner::list`](crate::Runner::list).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ListedExample {
    pub id: ExampleId,
    pub full_description: String,
    pub location: SourceLocation,

    /// Whether the example passes the filter.
    pub scheduled: bool,
}
