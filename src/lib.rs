//! kispec, a behaviour driven test framework.
//!
//! Examples are declared in nested groups on a [`World`]. Groups carry
//! metadata, hooks, memoized helpers and shared group inclusions, all of which
//! apply to every example below them. Running the world executes each example
//! in isolation and reports the outcome of each.
//!
//! ```
//! use kispec::World;
//!
//! let mut world = World::new();
//! world
//!     .describe("Vec", |g| {
//!         g.let_("vec", |_| vec![1, 2, 3]);
//!         g.it("has a length", |ctx| {
//!             assert_eq!(ctx.get::<Vec<i32>>("vec").len(), 3);
//!         });
//!     })
//!     .unwrap();
//!
//! let report = world.run().unwrap();
//! assert_eq!(report.summary.passed, 1);
//! ```

pub mod context;
pub mod error;
pub mod example;
pub mod helper;
pub mod hook;
pub mod metadata;
pub mod outcome;
pub mod reporter;
pub mod shared;
pub mod tree;

mod capture;
mod declare;
mod panic;

mod strategy;
pub use strategy::*;

mod config;
pub use config::*;

mod report;
pub use report::*;

mod runner;
pub use runner::*;

mod world;
pub use world::*;

pub use context::{Around, ExampleCtx, GroupCtx, State};
pub use declare::GroupBuilder;
pub use error::{Error, Result};
pub use metadata::{MetaFilter, MetaValue, Metadata};

#[cfg(test)]
mod test_support;
