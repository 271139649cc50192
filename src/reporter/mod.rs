//! Result sinks for kispec.
//!
//! A [`Reporter`] receives the events of a run in execution order. Example
//! events are delivered on a dedicated reporter thread while examples keep
//! running, so a slow reporter never holds up execution. Run start and run end
//! are delivered on the thread calling [`Runner::run`](crate::Runner::run).
//!
//! Reporter errors never abort a run. They are collected into
//! [`RunReport::report_errors`](crate::RunReport::report_errors), tagged with
//! the name of the event that failed.

use crate::{
    report::{ExampleRecord, GroupFailure, RunSummary},
    tree::Example,
};

mod no;
pub use no::*;

mod recorder;
pub use recorder::*;

/// Event data of [`Reporter::run_started`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct RunStart {
    /// Every example of the tree.
    pub total: usize,

    /// Examples that are part of this run.
    pub scheduled: usize,
    pub filtered_out: usize,
    pub seed: Option<u64>,
}

pub trait Reporter {
    type Error: Send;

    fn run_started(&mut self, start: &RunStart) -> Result<(), Self::Error> {
        let _ = start;
        Ok(())
    }

    /// An example is about to run. Not called for skipped examples.
    fn example_started(&mut self, example: &Example) -> Result<(), Self::Error> {
        let _ = example;
        Ok(())
    }

    fn example_finished(&mut self, record: &ExampleRecord) -> Result<(), Self::Error> {
        let _ = record;
        Ok(())
    }

    /// A once-per-group hook failed after the group's examples ran.
    fn group_failed(&mut self, failure: &GroupFailure) -> Result<(), Self::Error> {
        let _ = failure;
        Ok(())
    }

    fn run_finished(&mut self, summary: &RunSummary) -> Result<(), Self::Error> {
        let _ = summary;
        Ok(())
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    type Error = R::Error;

    fn run_started(&mut self, start: &RunStart) -> Result<(), Self::Error> {
        (**self).run_started(start)
    }

    fn example_started(&mut self, example: &Example) -> Result<(), Self::Error> {
        (**self).example_started(example)
    }

    fn example_finished(&mut self, record: &ExampleRecord) -> Result<(), Self::Error> {
        (**self).example_finished(record)
    }

    fn group_failed(&mut self, failure: &GroupFailure) -> Result<(), Self::Error> {
        (**self).group_failed(failure)
    }

    fn run_finished(&mut self, summary: &RunSummary) -> Result<(), Self::Error> {
        (**self).run_finished(summary)
    }
}

/// The events delivered to the reporter thread.
#[derive(Debug)]
pub(crate) enum ReportEvent<'t> {
    Started(&'t Example),
    Finished(ExampleRecord),
    GroupFailed(GroupFailure),
}

/// Calls a reporter method and tags a failure with the method name.
macro_rules! named_report {
    ($reporter:ident.$method:ident($($arg:expr),* $(,)?)) => {
        $reporter
            .$method($($arg),*)
            .map_err(|err| (::std::stringify!($method), err))
    };
}

pub(crate) use named_report;

pub(crate) trait ReportErrors<E> {
    fn push_on_error(&mut self, result: Result<(), (&'static str, E)>);
}

impl<E> ReportErrors<E> for Vec<(&'static str, E)> {
    fn push_on_error(&mut self, result: Result<(), (&'static str, E)>) {
        if let Err(err) = result {
            tracing::warn!(event = err.0, "reporter failed");
            self.push(err);
        }
    }
}
