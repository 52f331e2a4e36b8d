//! Trigger to listener refresh protocol.
//!
//! A trigger produces parameters when activated. Each listener it names is
//! fetched from its own source with the merged request, and on success the
//! trigger's parameters are folded into the listener's accumulated set so
//! later refreshes, from any trigger, carry them forward.

#![allow(missing_docs)]

use std::thread;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::backend::Fetcher;
use crate::codec::Document;
use crate::error::{ConfigError, FetchError};
use crate::tuid::Tuid;

/// Flat string-keyed request parameters, in insertion order.
pub type Parameters = IndexMap<String, String>;

/// Request for one listener refresh.
///
/// Precedence from lowest to highest: session parameters, the listener's
/// accumulated parameters, then the parameters produced by the firing
/// trigger. A fresh value from the trigger is never shadowed by a stale
/// accumulated one.
#[must_use]
pub fn merge_parameters(
    session: &Parameters,
    accumulated: &Parameters,
    produced: &Parameters,
) -> Parameters {
    let mut merged = session.clone();
    for (key, value) in accumulated.iter().chain(produced) {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Per-listener refresh state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerPhase {
    #[default]
    Idle,
    Fetching,
    Updated,
    Failed,
}

/// Source binding and accumulated state of a refreshable component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshBinding {
    pub source: Option<String>,
    pub accumulated: Parameters,
    pub phase: ListenerPhase,
    /// Error of the most recent failed fetch, cleared by the next success.
    pub last_error: Option<FetchError>,
}

impl RefreshBinding {
    #[must_use]
    pub fn new(source: Option<String>) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn request(&self, session: &Parameters, produced: &Parameters) -> Parameters {
        merge_parameters(session, &self.accumulated, produced)
    }

    pub fn begin(&mut self) {
        self.phase = ListenerPhase::Fetching;
    }

    /// Marks a successful fetch and keeps the trigger's parameters.
    pub fn complete(&mut self, produced: &Parameters) {
        for (key, value) in produced {
            self.accumulated.insert(key.clone(), value.clone());
        }
        self.phase = ListenerPhase::Updated;
        self.last_error = None;
    }

    /// Marks a failed fetch. Accumulated parameters are left unchanged.
    pub fn fail(&mut self, error: FetchError) {
        self.phase = ListenerPhase::Failed;
        self.last_error = Some(error);
    }

    /// Returns to idle once the outcome has been applied.
    pub fn settle(&mut self) {
        self.phase = ListenerPhase::Idle;
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

/// One listener fetch within a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub listener: Tuid,
    pub endpoint: String,
    /// Full request sent to the endpoint.
    pub request: Parameters,
    /// Parameters the trigger contributed, folded in on success.
    pub produced: Parameters,
}

/// Runs every job against `fetcher`. Jobs run concurrently when there is more
/// than one; results come back in job order.
pub fn fetch_all<F>(fetcher: &F, jobs: Vec<FetchJob>) -> Vec<(FetchJob, Result<Document, FetchError>)>
where
    F: Fetcher + ?Sized,
{
    if jobs.len() <= 1 {
        return jobs
            .into_iter()
            .map(|job| {
                let result = run_job(fetcher, &job);
                (job, result)
            })
            .collect();
    }
    thread::scope(|scope| {
        let handles = jobs
            .into_iter()
            .map(|job| {
                scope.spawn(move || {
                    let result = run_job(fetcher, &job);
                    (job, result)
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(outcome) => outcome,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

fn run_job<F>(fetcher: &F, job: &FetchJob) -> Result<Document, FetchError>
where
    F: Fetcher + ?Sized,
{
    debug!(listener = %job.listener, endpoint = %job.endpoint, "fetching listener");
    let result = fetcher.fetch(&job.endpoint, &job.request);
    if let Err(err) = &result {
        warn!(listener = %job.listener, endpoint = %job.endpoint, "listener fetch failed: {err}");
    }
    result
}

/// Outcome of one trigger activation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FanOutReport {
    /// Listeners whose content was replaced.
    pub refreshed: Vec<Tuid>,
    /// Listeners left untouched because their fetch or decode failed.
    pub failed: Vec<(Tuid, FetchError)>,
    /// Listeners skipped without a fetch because they are wired wrongly.
    pub miswired: Vec<(Tuid, ConfigError)>,
}

impl FanOutReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.miswired.is_empty()
    }

    /// Listeners that were fetched, whatever the outcome.
    #[must_use]
    pub fn touched(&self) -> usize {
        self.refreshed.len() + self.failed.len()
    }
}
