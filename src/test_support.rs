use std::sync::{Arc, Mutex, PoisonError};

use crate::World;

/// A shared, ordered log for asserting the order hooks and bodies ran in.
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
}

/// Run `declare` on a fresh world.
pub fn world_with(declare: impl FnOnce(&mut World)) -> World {
    let mut world = World::new();
    declare(&mut world);
    world
}

/// Full descriptions of a report's records with a short status, in run order.
pub fn statuses<E>(report: &crate::RunReport<E>) -> Vec<(String, &'static str)> {
    report
        .records
        .iter()
        .map(|record| {
            let status = match record.status() {
                crate::outcome::ExampleStatus::Passed => "passed",
                crate::outcome::ExampleStatus::Failed(_) => "failed",
                crate::outcome::ExampleStatus::Pending { .. } => "pending",
                crate::outcome::ExampleStatus::Skipped { .. } => "skipped",
                crate::outcome::ExampleStatus::NotRun => "not run",
            };
            (record.full_description.clone(), status)
        })
        .collect()
}
