use std::sync::{Arc, Mutex, Once, PoisonError};

use kispec::{ExampleCtx, GroupCtx, RunReport, outcome::ExampleStatus};

static TRACING: Once = Once::new();

/// Route kispec's tracing output through the test writer, `RUST_LOG` decides.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// An example body or hook that logs `entry`.
    pub fn step(&self, entry: &'static str) -> impl Fn(&mut ExampleCtx<'_>) + Send + Sync + 'static {
        let log = self.clone();
        move |_: &mut ExampleCtx<'_>| log.push(entry)
    }
}

pub fn status_name(status: &ExampleStatus) -> &'static str {
    match status {
        ExampleStatus::Passed => "passed",
        ExampleStatus::Failed(_) => "failed",
        ExampleStatus::Pending { .. } => "pending",
        ExampleStatus::Skipped { .. } => "skipped",
        ExampleStatus::NotRun => "not run",
        _ => "unknown",
    }
}

/// Full description and status of every record, in run order.
pub fn statuses<E>(report: &RunReport<E>) -> Vec<(String, &'static str)> {
    report
        .records
        .iter()
        .map(|record| (record.full_description.clone(), status_name(record.status())))
        .collect()
}

pub fn descriptions<E>(report: &RunReport<E>) -> Vec<String> {
    report
        .records
        .iter()
        .map(|record| record.full_description.clone())
        .collect()
}

/// Owned `(String, &str)` pairs, for comparing against [`statuses`].
pub fn expected(pairs: &[(&str, &'static str)]) -> Vec<(String, &'static str)> {
    pairs.iter().map(|(d, s)| (d.to_string(), *s)).collect()
}

/// Fail the calling body or hook with a panic.
pub fn fail(message: &str) {
    panic!("{message}")
}

/// Skip the calling example.
pub fn skip(ctx: &ExampleCtx<'_>, reason: &'static str) {
    ctx.skip(reason)
}

impl Log {
    /// A group hook that logs `entry`.
    pub fn group_step(&self, entry: &'static str) -> impl Fn(&mut GroupCtx<'_>) + Send + Sync + 'static {
        let log = self.clone();
        move |_: &mut GroupCtx<'_>| log.push(entry)
    }
}
