//! Pluggable parts of a run.
//!
//! Each strategy is a trait with a default implementation. The
//! [`Runner`](crate::Runner) is generic over them and swaps them through its
//! `with_*` methods.

pub mod filter;
pub mod mark;
pub mod ordering;
