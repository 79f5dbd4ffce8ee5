//! ICSARA rounds and the adendas that answer them.
//!
//! A round is the reviewing body's consolidated set of observations; the
//! adenda is the applicant's written reply. Round numbering and the cap on
//! rounds are owned by the process; this module enforces everything local
//! to one round: due-date ordering, single active adenda, response
//! references, and status recomputation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::observation::{
    Observation, ObservationDraft, ObservationSummary, Priority, ResolutionState, Response,
    ResponseDraft, Sufficiency,
};

/// Lifecycle of an ICSARA round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Emitted,
    Responded,
    PartiallyResponded,
    Expired,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Emitted => "emitted",
            RoundStatus::Responded => "responded",
            RoundStatus::PartiallyResponded => "partially_responded",
            RoundStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of an adenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdendaStatus {
    Drafting,
    Submitted,
    UnderReview,
    Accepted,
    Observed,
    Rejected,
}

impl AdendaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdendaStatus::Drafting => "drafting",
            AdendaStatus::Submitted => "submitted",
            AdendaStatus::UnderReview => "under_review",
            AdendaStatus::Accepted => "accepted",
            AdendaStatus::Observed => "observed",
            AdendaStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AdendaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agency review outcome for an adenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewResult {
    Sufficient,
    Insufficient,
    PartiallySufficient,
}

impl ReviewResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewResult::Sufficient => "sufficient",
            ReviewResult::Insufficient => "insufficient",
            ReviewResult::PartiallySufficient => "partially_sufficient",
        }
    }
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewResult {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sufficient" => Ok(ReviewResult::Sufficient),
            "insufficient" => Ok(ReviewResult::Insufficient),
            "partially_sufficient" | "partial" => Ok(ReviewResult::PartiallySufficient),
            other => Err(TrackerError::Validation {
                field: "review_result",
                reason: format!("unknown review result {other:?}"),
            }),
        }
    }
}

/// One applicant reply to a round. Immutable once accepted or rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adenda {
    /// 1-based per round.
    pub submission_number: u32,
    pub submitted_on: NaiveDate,
    pub status: AdendaStatus,
    pub responses: Vec<Response>,
    pub reviewed_on: Option<NaiveDate>,
    pub review_result: Option<ReviewResult>,
}

impl Adenda {
    /// A rejected adenda no longer stands for its round; anything else does.
    pub fn is_active(&self) -> bool {
        !matches!(self.status, AdendaStatus::Rejected)
    }

    fn is_closed(&self) -> bool {
        matches!(self.status, AdendaStatus::Accepted | AdendaStatus::Rejected)
    }
}

/// One formal questioning cycle within a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based, strictly increasing per process.
    pub number: u32,
    pub emitted_on: NaiveDate,
    pub due_on: NaiveDate,
    pub status: RoundStatus,
    pub observations: Vec<Observation>,
    pub adendas: Vec<Adenda>,
}

impl Round {
    pub(crate) fn new(
        number: u32,
        emitted_on: NaiveDate,
        due_on: NaiveDate,
    ) -> Result<Self, TrackerError> {
        if due_on < emitted_on {
            return Err(TrackerError::InvalidDueDate {
                emitted: emitted_on,
                due: due_on,
            });
        }
        Ok(Self {
            number,
            emitted_on,
            due_on,
            status: RoundStatus::Emitted,
            observations: Vec::new(),
            adendas: Vec::new(),
        })
    }

    pub fn observation(&self, id: u64) -> Option<&Observation> {
        self.observations.iter().find(|o| o.id == id)
    }

    fn observation_mut(&mut self, id: u64) -> Option<&mut Observation> {
        self.observations.iter_mut().find(|o| o.id == id)
    }

    /// The adenda currently standing for this round, if any.
    pub fn active_adenda(&self) -> Option<&Adenda> {
        self.adendas.iter().rev().find(|a| a.is_active())
    }

    /// Critical observations still pending.
    pub fn critical_pending(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.priority == Priority::Critical && o.resolution == ResolutionState::Pending)
            .count()
    }

    /// Counts by agency, priority, and resolution for this round.
    pub fn summary(&self) -> ObservationSummary {
        ObservationSummary::collect(&self.observations)
    }

    /// Add an observation while the round can still take them.
    pub(crate) fn add_observation(
        &mut self,
        id: u64,
        draft: ObservationDraft,
    ) -> Result<(), TrackerError> {
        if !matches!(
            self.status,
            RoundStatus::Emitted | RoundStatus::PartiallyResponded
        ) {
            return Err(TrackerError::InvalidRoundState {
                round: self.number,
                status: self.status,
            });
        }
        if draft.agency.trim().is_empty() {
            return Err(TrackerError::Validation {
                field: "agency",
                reason: "must not be empty".into(),
            });
        }
        if draft.body.trim().is_empty() {
            return Err(TrackerError::Validation {
                field: "body",
                reason: "must not be empty".into(),
            });
        }
        self.observations.push(Observation {
            id,
            agency: draft.agency,
            chapter: draft.chapter,
            kind: draft.kind,
            priority: draft.priority,
            body: draft.body,
            resolution: ResolutionState::Pending,
        });
        Ok(())
    }

    /// File an adenda answering this round's observations.
    ///
    /// Returns the submission number. Fails before mutating anything: one
    /// active adenda per round, every response must reference an
    /// observation of this round, and no response may move a resolution
    /// backward.
    pub(crate) fn file_adenda(
        &mut self,
        submitted_on: NaiveDate,
        drafts: Vec<ResponseDraft>,
    ) -> Result<u32, TrackerError> {
        if let Some(active) = self.active_adenda() {
            return Err(TrackerError::DuplicateSubmission {
                round: self.number,
                submission: active.submission_number,
            });
        }
        for (i, draft) in drafts.iter().enumerate() {
            let Some(obs) = self.observation(draft.observation_id) else {
                return Err(TrackerError::ObservationNotInRound {
                    id: draft.observation_id,
                    round: self.number,
                });
            };
            if drafts[..i]
                .iter()
                .any(|d| d.observation_id == draft.observation_id)
            {
                return Err(TrackerError::Validation {
                    field: "responses",
                    reason: format!("duplicate response for observation {}", draft.observation_id),
                });
            }
            let target = draft.resolution.as_observation_state();
            if target < obs.resolution {
                return Err(TrackerError::Validation {
                    field: "resolution",
                    reason: format!(
                        "observation {} cannot move from {} back to {}",
                        obs.id, obs.resolution, target
                    ),
                });
            }
        }

        let submission_number = self.adendas.len() as u32 + 1;
        let mut responses = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if let Some(obs) = self.observation_mut(draft.observation_id) {
                obs.advance_resolution(draft.resolution.as_observation_state())?;
            }
            responses.push(Response {
                observation_id: draft.observation_id,
                body: draft.body,
                attachments: draft.attachments,
                resolution: draft.resolution,
                qualification: None,
            });
        }
        self.adendas.push(Adenda {
            submission_number,
            submitted_on,
            status: AdendaStatus::Submitted,
            responses,
            reviewed_on: None,
            review_result: None,
        });
        self.recompute_status();
        Ok(submission_number)
    }

    /// Create or update a response on the standing adenda before review.
    pub(crate) fn record_response(&mut self, draft: ResponseDraft) -> Result<(), TrackerError> {
        if self.observation(draft.observation_id).is_none() {
            return Err(TrackerError::UnknownObservation {
                id: draft.observation_id,
            });
        }
        let number = self.number;
        let Some(adenda) = self
            .adendas
            .iter_mut()
            .rev()
            .find(|a| a.is_active() && !a.is_closed())
        else {
            return Err(TrackerError::Validation {
                field: "adenda",
                reason: format!("round {number} has no adenda open for amendment"),
            });
        };
        let target = draft.resolution.as_observation_state();
        let response = Response {
            observation_id: draft.observation_id,
            body: draft.body,
            attachments: draft.attachments,
            resolution: draft.resolution,
            qualification: None,
        };
        match adenda
            .responses
            .iter_mut()
            .find(|r| r.observation_id == draft.observation_id)
        {
            Some(existing) => *existing = response,
            None => adenda.responses.push(response),
        }
        if let Some(obs) = self.observation_mut(draft.observation_id) {
            obs.advance_resolution(target)?;
        }
        self.recompute_status();
        Ok(())
    }

    /// Review the standing adenda.
    ///
    /// `Sufficient` accepts the adenda, which requires every observation
    /// answered. `PartiallySufficient` leaves it standing as observed.
    /// `Insufficient` rejects it and re-opens every observation it
    /// referenced; the count of re-opened observations is returned.
    pub(crate) fn qualify_adenda(
        &mut self,
        review_date: NaiveDate,
        result: ReviewResult,
    ) -> Result<usize, TrackerError> {
        let number = self.number;
        let Some(idx) = self.adendas.iter().rposition(|a| a.is_active()) else {
            return Err(TrackerError::Validation {
                field: "adenda",
                reason: format!("round {number} has no adenda to review"),
            });
        };
        if self.adendas[idx].is_closed() {
            return Err(TrackerError::Validation {
                field: "adenda",
                reason: format!("adenda {} of round {number} is already closed", idx + 1),
            });
        }

        match result {
            ReviewResult::Sufficient => {
                let pending = self
                    .observations
                    .iter()
                    .filter(|o| o.resolution != ResolutionState::Answered)
                    .count();
                if pending > 0 {
                    return Err(TrackerError::AdendaIncomplete {
                        round: number,
                        pending,
                    });
                }
                let adenda = &mut self.adendas[idx];
                adenda.status = AdendaStatus::Accepted;
                adenda.reviewed_on = Some(review_date);
                adenda.review_result = Some(result);
                for response in &mut adenda.responses {
                    response.qualification = Some(Sufficiency::Sufficient);
                }
                Ok(0)
            }
            ReviewResult::PartiallySufficient => {
                let adenda = &mut self.adendas[idx];
                adenda.status = AdendaStatus::Observed;
                adenda.reviewed_on = Some(review_date);
                adenda.review_result = Some(result);
                for response in &mut adenda.responses {
                    response.qualification = Some(match response.resolution.as_observation_state()
                    {
                        ResolutionState::Answered => Sufficiency::Sufficient,
                        _ => Sufficiency::Insufficient,
                    });
                }
                Ok(0)
            }
            ReviewResult::Insufficient => {
                let referenced: Vec<u64> = {
                    let adenda = &mut self.adendas[idx];
                    adenda.status = AdendaStatus::Rejected;
                    adenda.reviewed_on = Some(review_date);
                    adenda.review_result = Some(result);
                    for response in &mut adenda.responses {
                        response.qualification = Some(Sufficiency::Insufficient);
                    }
                    adenda.responses.iter().map(|r| r.observation_id).collect()
                };
                let mut reopened = 0;
                for id in referenced {
                    if let Some(obs) = self.observation_mut(id)
                        && obs.resolution != ResolutionState::Pending
                    {
                        obs.reopen();
                        reopened += 1;
                    }
                }
                self.recompute_status();
                Ok(reopened)
            }
        }
    }

    /// Mark the round expired when its due date has passed unanswered.
    /// Returns whether this call changed anything, so the scan stays
    /// idempotent.
    pub(crate) fn expire(&mut self, as_of: NaiveDate) -> bool {
        if matches!(self.status, RoundStatus::Emitted)
            && self.adendas.is_empty()
            && self.due_on < as_of
        {
            self.status = RoundStatus::Expired;
            true
        } else {
            false
        }
    }

    fn recompute_status(&mut self) {
        let all_answered = self
            .observations
            .iter()
            .all(|o| o.resolution == ResolutionState::Answered);
        self.status = if all_answered {
            RoundStatus::Responded
        } else {
            RoundStatus::PartiallyResponded
        };
    }
}
