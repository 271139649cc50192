use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    ordering::{ExampleOrdering, OrderScope},
    tree::TreeItem,
};

/// A seeded shuffle of every scope.
///
/// Each scope gets its own generator derived from the seed and the group, so
/// the order of one group does not depend on how many other groups were
/// shuffled before it. The same seed on the same tree always yields the same
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomOrder {
    seed: u64,
}

impl RandomOrder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Pick a seed from the thread rng.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    fn scope_seed(&self, scope: &OrderScope<'_>) -> u64 {
        match scope {
            OrderScope::Roots => self.seed,
            OrderScope::Group(group) => mix(self.seed ^ mix(group.id.0 as u64 + 1)),
        }
    }
}

impl ExampleOrdering for RandomOrder {
    fn order(&self, scope: &OrderScope<'_>, items: &mut [TreeItem]) {
        let mut rng = StdRng::seed_from_u64(self.scope_seed(scope));
        items.shuffle(&mut rng);
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
