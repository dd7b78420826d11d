//! Settle-all batch results.
//!
//! Every stage produces one [`ItemOutcome`] per input path, in input order,
//! whether the item succeeded or not. Nothing is dropped and nothing
//! short-circuits, so counts are always `succeeded / attempted`.

use std::fmt;
use std::path::{Path, PathBuf};

use recpost_common::error::RecpostError;

/// Result of processing one input path.
#[derive(Debug)]
pub struct ItemOutcome<T> {
    /// The input this outcome belongs to.
    pub input: PathBuf,

    /// What the stage produced for it.
    pub result: Result<T, RecpostError>,
}

impl<T> ItemOutcome<T> {
    pub fn new(input: impl Into<PathBuf>, result: Result<T, RecpostError>) -> Self {
        Self {
            input: input.into(),
            result,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Ordered outcomes for one stage.
#[derive(Debug)]
pub struct BatchReport<T> {
    outcomes: Vec<ItemOutcome<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// An empty report (0/0).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ItemOutcome<T>) {
        self.outcomes.push(outcome);
    }

    /// Number of inputs processed.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of inputs that succeeded.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of inputs that failed.
    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn outcomes(&self) -> &[ItemOutcome<T>] {
        &self.outcomes
    }

    /// Successful values, in input order.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed inputs with their errors, in input order.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &RecpostError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.input.as_path(), e)))
    }

    pub fn into_successes(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect()
    }

    /// Compact `succeeded/attempted` counts, detached from the values.
    pub fn tally(&self) -> Tally {
        Tally {
            succeeded: self.succeeded(),
            attempted: self.attempted(),
        }
    }
}

impl<T> FromIterator<ItemOutcome<T>> for BatchReport<T> {
    fn from_iter<I: IntoIterator<Item = ItemOutcome<T>>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl<T> fmt::Display for BatchReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tally().fmt(f)
    }
}

/// `N/M` counts for a finished stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub attempted: usize,
}

impl Tally {
    /// Sum two tallies, e.g. the mp4 and png passes of the purge stage.
    pub fn combine(self, other: Tally) -> Tally {
        Tally {
            succeeded: self.succeeded + other.succeeded,
            attempted: self.attempted + other.attempted,
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.succeeded, self.attempted)
    }
}
