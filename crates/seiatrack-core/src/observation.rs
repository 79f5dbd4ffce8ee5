//! Observations raised by reviewing agencies and the responses that
//! answer them.
//!
//! Resolution state only moves forward (`pending → partial → answered`);
//! the single backward move is the explicit re-open applied when a review
//! qualifies the response as insufficient.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Formal classification of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Amendment,
    Clarification,
    Rectification,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Amendment => "amendment",
            ObservationKind::Clarification => "clarification",
            ObservationKind::Rectification => "rectification",
        }
    }
}

/// Review priority assigned by the issuing agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Important,
    Minor,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::Important => "important",
            Priority::Minor => "minor",
        }
    }
}

/// Resolution state of an observation.
///
/// Ordering follows the declaration: `Pending < Partial < Answered`,
/// which is what the monotonicity check leans on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Pending,
    Partial,
    Answered,
}

impl ResolutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Pending => "pending",
            ResolutionState::Partial => "partial",
            ResolutionState::Answered => "answered",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single question raised by a reviewing agency (OAECA) within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub agency: String,
    pub chapter: String,
    pub kind: ObservationKind,
    pub priority: Priority,
    pub body: String,
    pub resolution: ResolutionState,
}

impl Observation {
    /// Advance resolution state; backward moves are rejected at write time.
    pub(crate) fn advance_resolution(&mut self, to: ResolutionState) -> Result<(), TrackerError> {
        if to < self.resolution {
            return Err(TrackerError::Validation {
                field: "resolution",
                reason: format!(
                    "observation {} cannot move from {} back to {}",
                    self.id, self.resolution, to
                ),
            });
        }
        self.resolution = to;
        Ok(())
    }

    /// Revert to pending after an insufficient review qualification.
    pub(crate) fn reopen(&mut self) {
        self.resolution = ResolutionState::Pending;
    }
}

/// Input for creating an observation at round issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationDraft {
    pub agency: String,
    pub chapter: String,
    pub kind: ObservationKind,
    pub priority: Priority,
    pub body: String,
}

/// Resolution claimed by a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResolution {
    Answered,
    Partial,
    Unanswered,
}

impl ResponseResolution {
    pub fn as_observation_state(&self) -> ResolutionState {
        match self {
            ResponseResolution::Answered => ResolutionState::Answered,
            ResponseResolution::Partial => ResolutionState::Partial,
            ResponseResolution::Unanswered => ResolutionState::Pending,
        }
    }
}

/// Agency qualification of a response, set only after review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sufficiency {
    Sufficient,
    Insufficient,
}

/// One answer to a single observation, carried by an adenda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub observation_id: u64,
    pub body: String,
    pub attachments: Vec<String>,
    pub resolution: ResponseResolution,
    pub qualification: Option<Sufficiency>,
}

/// Input for filing a response within an adenda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDraft {
    pub observation_id: u64,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub resolution: ResponseResolution,
}

/// Counts of observations grouped by agency, priority, and resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSummary {
    pub total: usize,
    pub by_agency: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_resolution: BTreeMap<String, usize>,
    /// Agencies holding at least one critical observation not yet answered.
    pub agencies_with_open_critical: Vec<String>,
}

impl ObservationSummary {
    pub fn collect<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> Self {
        let mut summary = ObservationSummary::default();
        let mut open_critical = BTreeSet::new();
        for obs in observations {
            summary.total += 1;
            *summary.by_agency.entry(obs.agency.clone()).or_default() += 1;
            *summary
                .by_priority
                .entry(obs.priority.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_resolution
                .entry(obs.resolution.as_str().to_string())
                .or_default() += 1;
            if obs.priority == Priority::Critical && obs.resolution != ResolutionState::Answered {
                open_critical.insert(obs.agency.clone());
            }
        }
        summary.agencies_with_open_critical = open_critical.into_iter().collect();
        summary
    }
}
