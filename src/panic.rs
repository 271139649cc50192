//! Turning panics and errors of bodies and hooks into failures.

use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind, resume_unwind},
};

use crate::{
    capture,
    example::ExampleResult,
    outcome::{ExampleFailure, FailureKind, FailureOrigin, Reason},
};

/// Panic payload used to abort an example as skipped.
///
/// Raised through [`resume_unwind`] so the panic hook never sees it.
#[derive(Debug)]
pub(crate) struct SkipSignal(pub(crate) Reason);

pub(crate) fn raise_skip(reason: Reason) -> ! {
    resume_unwind(Box::new(SkipSignal(reason)))
}

/// Why a body or hook did not complete normally.
#[derive(Debug)]
pub(crate) enum Interruption {
    Failed(ExampleFailure),
    Skipped(Reason),
}

/// Convert a panic payload into a string.
///
/// This matches the common payload types produced by `panic!` (`&'static str` and `String`).
/// Other payload types are formatted as a generic placeholder.
pub(crate) fn payload_as_string(err: Box<dyn Any + Send + 'static>) -> String {
    err.downcast::<&'static str>()
        .map(|s| s.to_string())
        .or_else(|err| err.downcast::<String>().map(|s| *s))
        .unwrap_or_else(|_| String::from("Box<dyn Any>"))
}

/// Run `f`, catching panics.
///
/// Expects a [`CapturePanicGuard`](crate::capture::CapturePanicGuard) to be
/// alive for panic locations to be known.
pub(crate) fn catch<F>(origin: FailureOrigin, f: F) -> Result<(), Interruption>
where
    F: FnOnce() -> ExampleResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(ExampleResult(Ok(()))) => Ok(()),
        Ok(ExampleResult(Err(message))) => Err(Interruption::Failed(ExampleFailure::new(
            FailureKind::Error,
            origin,
            message,
        ))),
        Err(payload) => match payload.downcast::<SkipSignal>() {
            Ok(skip) => Err(Interruption::Skipped(skip.0)),
            Err(payload) => {
                let message = payload_as_string(payload);
                let location = capture::take_panic_location();
                Err(Interruption::Failed(
                    ExampleFailure::new(FailureKind::Panicked, origin, message)
                        .with_location(location),
                ))
            }
        },
    }
}
