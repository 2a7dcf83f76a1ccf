//! Found/missing partition of accumulated products against a dataset index

use crate::core::query::QueryAccumulator;
use crate::types::{ScrapeError, ScrapeResult};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Result of one existence check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Exists,
    NotExists,
    /// The index could not answer; never treated as "missing"
    Error(String),
}

/// Idempotent "does this identifier exist" check against an index
pub trait ExistenceProbe {
    fn exists(&self, identifier: &str) -> ProbeOutcome;
}

impl<P: ExistenceProbe + ?Sized> ExistenceProbe for &P {
    fn exists(&self, identifier: &str) -> ProbeOutcome {
        (**self).exists(identifier)
    }
}

/// Index held in memory, for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    identifiers: HashSet<String>,
    broken: HashSet<String>,
}

impl InMemoryIndex {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            broken: HashSet::new(),
        }
    }

    /// Make probes for `identifier` fail as if the index were down
    pub fn with_failure(mut self, identifier: impl Into<String>) -> Self {
        self.broken.insert(identifier.into());
        self
    }
}

impl ExistenceProbe for InMemoryIndex {
    fn exists(&self, identifier: &str) -> ProbeOutcome {
        if self.broken.contains(identifier) {
            ProbeOutcome::Error(format!("index unavailable for {}", identifier))
        } else if self.identifiers.contains(identifier) {
            ProbeOutcome::Exists
        } else {
            ProbeOutcome::NotExists
        }
    }
}

/// Disjoint found/missing sets covering every accumulated identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub found: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Catalog-declared total, for cross-checking only
    pub total_expected: Option<u64>,
}

impl ReconciliationResult {
    pub fn total(&self) -> usize {
        self.found.len() + self.missing.len()
    }
}

fn classify(identifier: &str, outcome: ProbeOutcome) -> ScrapeResult<bool> {
    match outcome {
        ProbeOutcome::Exists => Ok(true),
        ProbeOutcome::NotExists => Ok(false),
        ProbeOutcome::Error(detail) => Err(ScrapeError::Index {
            identifier: identifier.to_string(),
            detail,
        }),
    }
}

fn partition(
    accumulator: &QueryAccumulator,
    classified: Vec<(String, bool)>,
) -> ReconciliationResult {
    let mut result = ReconciliationResult {
        total_expected: accumulator.total_results_expected(),
        ..ReconciliationResult::default()
    };
    for (identifier, exists) in classified {
        if exists {
            result.found.insert(identifier);
        } else {
            result.missing.insert(identifier);
        }
    }

    if let Some(expected) = result.total_expected {
        if expected != accumulator.len() as u64 {
            log::info!(
                "Catalog declared {} results, accumulated {} unique products",
                expected,
                accumulator.len()
            );
        }
    }
    result
}

/// Probe every identifier in order; the first index error aborts
pub fn reconcile<P: ExistenceProbe>(
    accumulator: &QueryAccumulator,
    probe: &P,
) -> ScrapeResult<ReconciliationResult> {
    let mut classified = Vec::with_capacity(accumulator.len());
    for identifier in accumulator.identifiers() {
        let exists = classify(identifier, probe.exists(identifier))?;
        log::debug!("{} {}", identifier, if exists { "found" } else { "missing" });
        classified.push((identifier.to_string(), exists));
    }
    Ok(partition(accumulator, classified))
}

/// Probe identifiers on the rayon pool; an index error stops outstanding probes
pub fn reconcile_parallel<P: ExistenceProbe + Sync>(
    accumulator: &QueryAccumulator,
    probe: &P,
) -> ScrapeResult<ReconciliationResult> {
    let identifiers: Vec<&str> = accumulator.identifiers().collect();
    let classified = identifiers
        .par_iter()
        .map(|identifier| {
            classify(identifier, probe.exists(identifier)).map(|exists| (identifier.to_string(), exists))
        })
        .collect::<ScrapeResult<Vec<(String, bool)>>>()?;
    Ok(partition(accumulator, classified))
}
