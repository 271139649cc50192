use std::{borrow::Cow, fmt, time::Duration};

use crate::example::SourceLocation;

/// An optional human readable reason for pending or skipped examples.
pub type Reason = Option<Cow<'static, str>>;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExampleOutcome {
    pub status: ExampleStatus,

    /// Failures recorded after the primary one, mostly from after hooks.
    pub secondary_failures: Vec<ExampleFailure>,
    pub duration: Duration,
}

impl ExampleOutcome {
    pub(crate) fn unstarted() -> Self {
        Self {
            status: ExampleStatus::NotRun,
            secondary_failures: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn passed(&self) -> bool {
        self.status.passed()
    }

    pub fn failed(&self) -> bool {
        self.status.failed()
    }

    pub fn pending(&self) -> bool {
        self.status.pending()
    }

    pub fn skipped(&self) -> bool {
        self.status.skipped()
    }

    pub fn not_run(&self) -> bool {
        self.status.not_run()
    }

    /// The primary failure followed by all secondary ones.
    pub fn failures(&self) -> impl Iterator<Item = &ExampleFailure> {
        let primary = match &self.status {
            ExampleStatus::Failed(failure) => Some(failure),
            ExampleStatus::Pending { failure, .. } => Some(failure),
            _ => None,
        };
        primary.into_iter().chain(self.secondary_failures.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExampleStatus {
    Passed,
    Failed(ExampleFailure),

    /// The example was expected to fail and did.
    Pending {
        reason: Reason,
        failure: ExampleFailure,
    },
    Skipped {
        reason: Reason,
    },

    /// The run stopped before reaching the example (fail fast or interrupt).
    NotRun,
}

impl ExampleStatus {
    pub fn passed(&self) -> bool {
        matches!(self, ExampleStatus::Passed)
    }

    pub fn failed(&self) -> bool {
        matches!(self, ExampleStatus::Failed(_))
    }

    pub fn pending(&self) -> bool {
        matches!(self, ExampleStatus::Pending { .. })
    }

    pub fn skipped(&self) -> bool {
        matches!(self, ExampleStatus::Skipped { .. })
    }

    pub fn not_run(&self) -> bool {
        matches!(self, ExampleStatus::NotRun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ExampleFailure {
    pub kind: FailureKind,
    pub origin: FailureOrigin,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl ExampleFailure {
    pub(crate) fn new(kind: FailureKind, origin: FailureOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            location: None,
        }
    }

    pub(crate) fn with_location(self, location: Option<SourceLocation>) -> Self {
        Self { location, ..self }
    }
}

impl fmt::Display for ExampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.kind, self.origin, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureKind {
    /// The body or hook returned `Err`.
    Error,
    Panicked,

    /// A pending example passed.
    PendingFixed,

    /// An around hook returned without running the example.
    AroundDidNotRun,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Error => "error",
            FailureKind::Panicked => "panic",
            FailureKind::PendingFixed => "expected pending example to fail",
            FailureKind::AroundDidNotRun => "example not run",
        })
    }
}

/// The stage a failure was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureOrigin {
    Body,
    BeforeHook,
    AfterHook,
    AroundHook,
    BeforeContextHook,
    AfterContextHook,
    BeforeSuiteHook,
    AfterSuiteHook,

    /// Dropping helper values or state after the example.
    Teardown,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureOrigin::Body => "example body",
            FailureOrigin::BeforeHook => "before hook",
            FailureOrigin::AfterHook => "after hook",
            FailureOrigin::AroundHook => "around hook",
            FailureOrigin::BeforeContextHook => "before(context) hook",
            FailureOrigin::AfterContextHook => "after(context) hook",
            FailureOrigin::BeforeSuiteHook => "before(suite) hook",
            FailureOrigin::AfterSuiteHook => "after(suite) hook",
            FailureOrigin::Teardown => "teardown",
        })
    }
}

/// Primary and secondary failures of a single example execution.
#[derive(Debug, Default)]
pub(crate) struct FailureRecord {
    pub(crate) primary: Option<ExampleFailure>,
    pub(crate) secondary: Vec<ExampleFailure>,
}

impl FailureRecord {
    /// The first failure becomes the primary one, every later one is kept as
    /// secondary.
    pub(crate) fn push(&mut self, failure: ExampleFailure) {
        match self.primary {
            None => self.primary = Some(failure),
            Some(_) => self.secondary.push(failure),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.primary.is_none()
    }
}
