use std::convert::Infallible;

use crate::reporter::Reporter;

/// A reporter that discards every event.
///
/// Useful when only the returned [`RunReport`](crate::RunReport) matters.
#[derive(Debug, Default, Clone)]
pub struct NoReporter;

impl Reporter for NoReporter {
    type Error = Infallible;
}
