//! Fatal errors of kispec.
//!
//! Everything in here aborts a run before any example executes. Failures of
//! single examples are never errors, they become
//! [`ExampleOutcome`](crate::outcome::ExampleOutcome)s instead.

use std::borrow::Cow;

use thiserror::Error;

use crate::{
    example::SourceLocation,
    hook::{HookKind, HookScope},
};

/// Result type alias using the kispec [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a world from being finalized or run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("{} declaration error(s):\n{}", .0.len(), render_all(.0))]
    Declaration(Vec<DeclarationError>),

    #[error("no shared group named {name:?} is registered (included from {group:?} at {location})")]
    UnknownSharedGroup {
        name: String,
        group: String,
        location: SourceLocation,
    },

    #[error("shared group {name:?} includes itself (included from {group:?} at {location})")]
    RecursiveInclusion {
        name: String,
        group: String,
        location: SourceLocation,
    },

    #[error("the world is already finalized, no more declarations are accepted")]
    AlreadyFinalized,

    #[error("the world already ran, reset it before running again")]
    AlreadyRan,

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A structural authoring error found while declaring or finalizing groups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("in {group:?}: {kind}")]
pub struct DeclarationError {
    /// Full description of the group the misuse happened in.
    ///
    /// Empty for global hooks.
    pub group: String,
    pub kind: DeclarationErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeclarationErrorKind {
    #[error("metadata key {0:?} is reserved")]
    ReservedMetadataKey(Cow<'static, str>),

    #[error("metadata keys must not be empty")]
    EmptyMetadataKey,

    #[error("helper names must not be empty")]
    EmptyHelperName,

    #[error("{kind} hooks cannot be declared with {scope} scope")]
    UnsupportedHook { kind: HookKind, scope: HookScope },

    #[error("suite hooks can only be declared on the world")]
    SuiteHookInGroup,

    #[error("the body given to a {kind}({scope}) hook has the wrong shape")]
    HookBodyMismatch { kind: HookKind, scope: HookScope },

    #[error("malformed metadata filter: {0}")]
    MalformedFilter(String),
}

fn render_all(errors: &[DeclarationError]) -> String {
    errors
        .iter()
        .map(|err| format!("  - {err}"))
        .collect::<Vec<_>>()
        .join("\n")
}
