use std::{
    borrow::Cow,
    fmt::{self, Debug, Display},
    panic::Location,
    sync::Arc,
};

use crate::context::ExampleCtx;

/// The value an example body or hook returns.
///
/// Bodies usually return `()` and fail by panicking (for example through
/// `assert!`). Returning `Err` fails the example as well.
#[derive(Debug)]
pub struct ExampleResult(pub Result<(), String>);

impl From<()> for ExampleResult {
    fn from(_: ()) -> Self {
        Self(Ok(()))
    }
}

impl<E: Debug> From<Result<(), E>> for ExampleResult {
    fn from(v: Result<(), E>) -> Self {
        ExampleResult(v.map_err(|e| format!("{e:#?}")))
    }
}

/// A type erased example body.
pub type ExampleFn = Arc<dyn Fn(&mut ExampleCtx<'_>) -> ExampleResult + Send + Sync>;

pub(crate) fn example_fn<F, R>(f: F) -> ExampleFn
where
    F: Fn(&mut ExampleCtx<'_>) -> R + Send + Sync + 'static,
    R: Into<ExampleResult>,
{
    Arc::new(move |ctx: &mut ExampleCtx<'_>| -> ExampleResult { f(ctx).into() })
}

/// Where something was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: Cow<'static, str>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(value: &Location<'_>) -> Self {
        Self {
            file: value.file().to_string().into(),
            line: value.line(),
            column: value.column(),
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
