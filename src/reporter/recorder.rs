use std::{
    convert::Infallible,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    report::{ExampleRecord, GroupFailure, RunSummary},
    reporter::{Reporter, RunStart},
    tree::Example,
};

#[derive(Debug, Default)]
pub struct Recorded {
    pub start: Option<RunStart>,

    /// Full descriptions of started examples, in order.
    pub started: Vec<String>,
    pub records: Vec<ExampleRecord>,
    pub group_failures: Vec<GroupFailure>,
    pub summary: Option<RunSummary>,
}

/// A reporter that keeps every event in memory.
///
/// Clones share the same storage, so a clone can be handed to the runner and
/// the original inspected afterwards.
#[derive(Debug, Default, Clone)]
pub struct Recorder(Arc<Mutex<Recorded>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access what was recorded so far.
    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn records(&self) -> Vec<ExampleRecord> {
        self.recorded().records.clone()
    }
}

impl Reporter for Recorder {
    type Error = Infallible;

    fn run_started(&mut self, start: &RunStart) -> Result<(), Self::Error> {
        self.recorded().start = Some(*start);
        Ok(())
    }

    fn example_started(&mut self, example: &Example) -> Result<(), Self::Error> {
        self.recorded()
            .started
            .push(example.full_description.clone());
        Ok(())
    }

    fn example_finished(&mut self, record: &ExampleRecord) -> Result<(), Self::Error> {
        self.recorded().records.push(record.clone());
        Ok(())
    }

    fn group_failed(&mut self, failure: &GroupFailure) -> Result<(), Self::Error> {
        self.recorded().group_failures.push(failure.clone());
        Ok(())
    }

    fn run_finished(&mut self, summary: &RunSummary) -> Result<(), Self::Error> {
        self.recorded().summary = Some(summary.clone());
        Ok(())
    }
}
