//! In-memory record of modules the worker failed to reconcile.

use modprox_core::ModuleCoordinate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;

/// The latest failure recorded for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub module: ModuleCoordinate,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub message: String,
}

impl Problem {
    pub fn new(module: ModuleCoordinate, message: impl Into<String>) -> Self {
        Self {
            module,
            time: OffsetDateTime::now_utc(),
            message: message.into(),
        }
    }
}

/// Problems keyed by coordinate. A later problem for the same coordinate
/// replaces the earlier one.
#[derive(Debug, Default)]
pub struct ProblemTracker {
    problems: RwLock<HashMap<ModuleCoordinate, Problem>>,
}

impl ProblemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, problem: Problem) {
        let mut problems = self
            .problems
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        problems.insert(problem.module.clone(), problem);
    }

    pub fn problem(&self, module: &ModuleCoordinate) -> Option<Problem> {
        self.problems
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(module)
            .cloned()
    }

    /// Every tracked problem, ordered by source and then by time.
    pub fn problems(&self) -> Vec<Problem> {
        let mut all: Vec<Problem> = self
            .problems
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| {
            a.module
                .source
                .cmp(&b.module.source)
                .then(a.time.cmp(&b.time))
        });
        all
    }
}
