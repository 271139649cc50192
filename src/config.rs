//! Run configuration.
//!
//! [`RunConfig`] bundles the settings a [`World`](crate::World) hands to its
//! [`Runner`](crate::Runner): ordering, fail fast and metadata filters. It is
//! built in code with `with_*` methods, [`RunConfig::from_env`] additionally
//! reads the `KISPEC_*` environment variables.

use std::{env, num::NonZeroUsize, str::FromStr};

use crate::{
    error::{Error, Result},
    filter::MetadataFilter,
    metadata::{MetaFilter, MetaKey},
    ordering::{DefinedOrder, ExampleOrdering, OrderScope, RandomOrder, ReverseOrder},
    tree::TreeItem,
};

pub const SEED_VAR: &str = "KISPEC_SEED";
pub const ORDER_VAR: &str = "KISPEC_ORDER";
pub const FAIL_FAST_VAR: &str = "KISPEC_FAIL_FAST";

/// The built in orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderMode {
    #[default]
    Defined,
    Reverse,
    Random(RandomOrder),
}

impl ExampleOrdering for OrderMode {
    fn order(&self, scope: &OrderScope<'_>, items: &mut [TreeItem]) {
        match self {
            OrderMode::Defined => DefinedOrder.order(scope, items),
            OrderMode::Reverse => ReverseOrder.order(scope, items),
            OrderMode::Random(random) => random.order(scope, items),
        }
    }

    fn seed(&self) -> Option<u64> {
        match self {
            OrderMode::Random(random) => random.seed(),
            _ => None,
        }
    }
}

impl FromStr for OrderMode {
    type Err = Error;

    /// Parse `defined`, `reverse`, `random` or `random:<seed>`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "defined" => Ok(OrderMode::Defined),
            "reverse" => Ok(OrderMode::Reverse),
            "random" | "rand" => Ok(OrderMode::Random(RandomOrder::from_entropy())),
            other => match other.split_once(':') {
                Some(("random" | "rand", seed)) => parse_seed(seed).map(random),
                _ => Err(Error::Config(format!("unknown order {other:?}"))),
            },
        }
    }
}

fn random(seed: u64) -> OrderMode {
    OrderMode::Random(RandomOrder::new(seed))
}

fn parse_seed(seed: &str) -> Result<u64> {
    seed.trim()
        .parse()
        .map_err(|err| Error::Config(format!("invalid seed {seed:?}: {err}")))
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub ordering: OrderMode,
    pub fail_fast: Option<NonZeroUsize>,
    pub filter: MetadataFilter,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ordering: OrderMode::Defined,
            fail_fast: None,
            filter: MetadataFilter::new().with_focus("focus"),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default configuration with the `KISPEC_*` environment applied.
    pub fn from_env() -> Result<Self> {
        Self::new().with_env_lookup(|key| env::var(key).ok())
    }

    /// Apply settings from a variable lookup.
    ///
    /// `KISPEC_ORDER` is applied before `KISPEC_SEED`, so a seed always
    /// results in random order.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(order) = lookup(ORDER_VAR) {
            self.ordering = order.parse()?;
        }
        if let Some(seed) = lookup(SEED_VAR) {
            self.ordering = random(parse_seed(&seed)?);
        }
        if let Some(fail_fast) = lookup(FAIL_FAST_VAR) {
            let threshold: usize = fail_fast.trim().parse().map_err(|err| {
                Error::Config(format!("invalid {FAIL_FAST_VAR} {fail_fast:?}: {err}"))
            })?;
            self.fail_fast = Some(NonZeroUsize::new(threshold).ok_or_else(|| {
                Error::Config(format!("{FAIL_FAST_VAR} must not be zero"))
            })?);
        }
        Ok(self)
    }

    pub fn with_ordering(self, ordering: OrderMode) -> Self {
        Self { ordering, ..self }
    }

    /// Random order with a fixed seed.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_ordering(random(seed))
    }

    /// Stop the run after `threshold` failed examples, `0` disables.
    pub fn with_fail_fast(self, threshold: usize) -> Self {
        Self {
            fail_fast: NonZeroUsize::new(threshold),
            ..self
        }
    }

    pub fn with_inclusion(self, filter: impl Into<MetaFilter>) -> Self {
        Self {
            filter: self.filter.with_inclusion(filter),
            ..self
        }
    }

    pub fn with_exclusion(self, filter: impl Into<MetaFilter>) -> Self {
        Self {
            filter: self.filter.with_exclusion(filter),
            ..self
        }
    }

    /// Use `key` as the focus key, `focus` by default.
    pub fn with_focus(self, key: impl Into<MetaKey>) -> Self {
        Self {
            filter: self.filter.with_focus(key),
            ..self
        }
    }

    pub fn without_focus(self) -> Self {
        Self {
            filter: self.filter.without_focus(),
            ..self
        }
    }
}
