//! The process state machine: one legal journey per submitted project.
//!
//! States follow the SEIA sequence: admissibility, the bounded
//! ICSARA/Adenda cycle, technical consolidation (ICE), commission, and
//! the final ruling (RCA). Transition functions do no I/O: they mutate
//! the aggregate, append to its transition history, and return the
//! domain events produced; persistence is the caller's side effect.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{DayCount, Instrument, InstrumentConfig};
use crate::deadline::{self, DeadlineReport};
use crate::error::TrackerError;
use crate::event::{DomainEvent, TransitionRecord};
use crate::observation::{ObservationDraft, Priority, ResolutionState, ResponseDraft};
use crate::round::{ReviewResult, Round, RoundStatus};

/// Overall status of a process before the evaluating body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    NotSubmitted,
    Submitted,
    InAdmissibility,
    Admitted,
    Inadmitted,
    InEvaluation,
    IcsaraIssued,
    AdendaInReview,
    IceIssued,
    InCommission,
    RulingApproved,
    RulingRejected,
    Withdrawn,
    Lapsed,
}

impl ProcessStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Inadmitted
                | ProcessStatus::RulingApproved
                | ProcessStatus::RulingRejected
                | ProcessStatus::Withdrawn
                | ProcessStatus::Lapsed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::NotSubmitted => "not_submitted",
            ProcessStatus::Submitted => "submitted",
            ProcessStatus::InAdmissibility => "in_admissibility",
            ProcessStatus::Admitted => "admitted",
            ProcessStatus::Inadmitted => "inadmitted",
            ProcessStatus::InEvaluation => "in_evaluation",
            ProcessStatus::IcsaraIssued => "icsara_issued",
            ProcessStatus::AdendaInReview => "adenda_in_review",
            ProcessStatus::IceIssued => "ice_issued",
            ProcessStatus::InCommission => "in_commission",
            ProcessStatus::RulingApproved => "ruling_approved",
            ProcessStatus::RulingRejected => "ruling_rejected",
            ProcessStatus::Withdrawn => "withdrawn",
            ProcessStatus::Lapsed => "lapsed",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the admissibility examination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissibilityResult {
    Admitted,
    Inadmitted,
}

impl std::str::FromStr for AdmissibilityResult {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admitted" => Ok(AdmissibilityResult::Admitted),
            "inadmitted" => Ok(AdmissibilityResult::Inadmitted),
            other => Err(TrackerError::Validation {
                field: "admissibility_result",
                reason: format!("unknown admissibility result {other:?}"),
            }),
        }
    }
}

/// Outcome of the final ruling (RCA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulingResult {
    Approved,
    Rejected,
}

impl RulingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RulingResult::Approved => "approved",
            RulingResult::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RulingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RulingResult {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approved" => Ok(RulingResult::Approved),
            "rejected" => Ok(RulingResult::Rejected),
            other => Err(TrackerError::Validation {
                field: "ruling_result",
                reason: format!("unknown ruling result {other:?}"),
            }),
        }
    }
}

/// A numbered condition attached to the final ruling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulingCondition {
    /// 1-based, strictly sequential.
    pub number: u32,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub responsible: String,
}

/// The final ruling closing the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruling {
    pub result: RulingResult,
    pub document_ref: String,
    pub ruled_on: NaiveDate,
    pub conditions: Vec<RulingCondition>,
}

/// A formal pause of the legal clock. Open while `to` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
    pub reason: String,
}

/// One evaluation process per project submission. Append-only for legal
/// audit: rounds, observations, and transition records are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub project_id: String,
    pub instrument: Instrument,
    pub status: ProcessStatus,
    pub submitted_on: Option<NaiveDate>,
    pub admissibility_on: Option<NaiveDate>,
    pub admissibility: Option<AdmissibilityResult>,
    pub legal_limit_days: i64,
    pub max_rounds: u32,
    pub day_count: DayCount,
    pub rounds: Vec<Round>,
    pub suspensions: Vec<Suspension>,
    pub ruling: Option<Ruling>,
    pub transitions: Vec<TransitionRecord>,
    next_observation_id: u64,
}

impl Process {
    /// Create the process record for a formally submitted project.
    ///
    /// The instrument configuration is copied into the record so later
    /// registry changes never alter a running process.
    pub fn start(
        project_id: impl Into<String>,
        instrument: Instrument,
        submitted_on: NaiveDate,
        config: &InstrumentConfig,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<(Self, Vec<DomainEvent>), TrackerError> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() || project_id.contains(['/', '\\']) {
            return Err(TrackerError::Validation {
                field: "project_id",
                reason: "must be non-empty and contain no path separators".into(),
            });
        }
        if config.legal_limit_days <= 0 {
            return Err(TrackerError::Validation {
                field: "legal_limit_days",
                reason: "must be positive".into(),
            });
        }
        if config.max_icsara_rounds == 0 {
            return Err(TrackerError::Validation {
                field: "max_icsara_rounds",
                reason: "must allow at least one round".into(),
            });
        }

        let mut process = Self {
            project_id,
            instrument,
            status: ProcessStatus::NotSubmitted,
            submitted_on: Some(submitted_on),
            admissibility_on: None,
            admissibility: None,
            legal_limit_days: config.legal_limit_days,
            max_rounds: config.max_icsara_rounds,
            day_count: config.day_count.clone(),
            rounds: Vec::new(),
            suspensions: Vec::new(),
            ruling: None,
            transitions: Vec::new(),
            next_observation_id: 1,
        };
        let mut events = Vec::new();
        process.transition(
            ProcessStatus::Submitted,
            &format!("project formally submitted {submitted_on}"),
            now,
            actor,
            &mut events,
        );
        Ok((process, events))
    }

    pub fn round(&self, number: u32) -> Result<&Round, TrackerError> {
        self.rounds
            .iter()
            .find(|r| r.number == number)
            .ok_or(TrackerError::RoundNotFound(number))
    }

    fn round_mut(&mut self, number: u32) -> Result<&mut Round, TrackerError> {
        self.rounds
            .iter_mut()
            .find(|r| r.number == number)
            .ok_or(TrackerError::RoundNotFound(number))
    }

    /// The suspension currently pausing the legal clock, if any.
    pub fn open_suspension(&self) -> Option<&Suspension> {
        self.suspensions.iter().find(|s| s.to.is_none())
    }

    /// Critical observations still pending across all rounds.
    pub fn pending_critical_count(&self) -> usize {
        self.rounds.iter().map(Round::critical_pending).sum()
    }

    /// Critical observations not yet fully answered, for steer-to-ICE
    /// summaries.
    pub fn unresolved_critical_count(&self) -> usize {
        self.rounds
            .iter()
            .flat_map(|r| &r.observations)
            .filter(|o| {
                o.priority == Priority::Critical && o.resolution != ResolutionState::Answered
            })
            .count()
    }

    /// Suspended legal days accumulated up to `as_of`. Open suspensions
    /// accrue up to the given date.
    pub fn suspended_days(&self, as_of: NaiveDate) -> i64 {
        self.suspensions
            .iter()
            .map(|s| {
                let end = s.to.unwrap_or(as_of).min(as_of);
                if end <= s.from {
                    0
                } else {
                    self.day_count.days_between(s.from, end).max(0)
                }
            })
            .sum()
    }

    /// Deadline arithmetic as of the given date. Pure; safe on every read.
    pub fn deadline(&self, as_of: NaiveDate) -> DeadlineReport {
        deadline::assess(
            self.submitted_on,
            self.legal_limit_days,
            self.suspended_days(as_of),
            as_of,
            &self.day_count,
        )
    }

    // ── Admissibility ──

    pub fn begin_admissibility(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(&[ProcessStatus::Submitted], "begin_admissibility")?;
        let mut events = Vec::new();
        self.transition(
            ProcessStatus::InAdmissibility,
            &format!("admissibility examination opened {date}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    pub fn register_admissibility(
        &mut self,
        result: AdmissibilityResult,
        date: NaiveDate,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(
            &[ProcessStatus::Submitted, ProcessStatus::InAdmissibility],
            "register_admissibility",
        )?;
        if let Some(submitted) = self.submitted_on
            && date < submitted
        {
            return Err(TrackerError::Validation {
                field: "date",
                reason: format!("admissibility date {date} precedes submission {submitted}"),
            });
        }
        self.admissibility_on = Some(date);
        self.admissibility = Some(result);
        let mut events = Vec::new();
        match result {
            AdmissibilityResult::Admitted => self.transition(
                ProcessStatus::Admitted,
                &format!("declared admissible {date}"),
                now,
                actor,
                &mut events,
            ),
            AdmissibilityResult::Inadmitted => self.transition(
                ProcessStatus::Inadmitted,
                &format!("declared inadmissible {date}"),
                now,
                actor,
                &mut events,
            ),
        }
        Ok(events)
    }

    pub fn begin_evaluation(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(&[ProcessStatus::Admitted], "begin_evaluation")?;
        let mut events = Vec::new();
        self.transition(
            ProcessStatus::InEvaluation,
            &format!("technical evaluation opened {date}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    // ── ICSARA / Adenda cycle ──

    /// Issue the next ICSARA round.
    ///
    /// Fails `RoundLimitExceeded` at the cap, leaving the process
    /// untouched; the error carries the unresolved-critical count so the
    /// caller is steered toward issuing the ICE instead.
    pub fn issue_round(
        &mut self,
        emitted_on: NaiveDate,
        due_on: NaiveDate,
        drafts: Vec<ObservationDraft>,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<(u32, Vec<DomainEvent>), TrackerError> {
        self.guard(&[ProcessStatus::InEvaluation], "issue_round")?;
        if drafts.is_empty() {
            return Err(TrackerError::Validation {
                field: "observations",
                reason: "a round must carry at least one observation".into(),
            });
        }
        if self.rounds.len() as u32 >= self.max_rounds {
            return Err(TrackerError::RoundLimitExceeded {
                cap: self.max_rounds,
                unresolved_critical: self.unresolved_critical_count(),
            });
        }

        let number = self.rounds.len() as u32 + 1;
        let mut round = Round::new(number, emitted_on, due_on)?;
        for draft in drafts {
            round.add_observation(self.next_observation_id, draft)?;
            self.next_observation_id += 1;
        }
        let observations = round.observations.len();
        self.rounds.push(round);

        let mut events = vec![DomainEvent::RoundIssued {
            project_id: self.project_id.clone(),
            round: number,
            observations,
            due_on,
        }];
        self.transition(
            ProcessStatus::IcsaraIssued,
            &format!("icsara round {number} issued with {observations} observation(s)"),
            now,
            actor,
            &mut events,
        );
        Ok((number, events))
    }

    /// Add a late observation to an open round.
    pub fn add_observation(
        &mut self,
        round_number: u32,
        draft: ObservationDraft,
    ) -> Result<u64, TrackerError> {
        if self.status.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                action: "add_observation",
            });
        }
        let id = self.next_observation_id;
        self.round_mut(round_number)?.add_observation(id, draft)?;
        self.next_observation_id += 1;
        Ok(id)
    }

    pub fn file_adenda(
        &mut self,
        round_number: u32,
        submitted_on: NaiveDate,
        responses: Vec<ResponseDraft>,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(&[ProcessStatus::IcsaraIssued], "file_adenda")?;
        let project_id = self.project_id.clone();
        let round = self.round_mut(round_number)?;
        let submission = round.file_adenda(submitted_on, responses)?;
        let fully_responded = round.status == RoundStatus::Responded;

        let mut events = vec![DomainEvent::AdendaFiled {
            project_id,
            round: round_number,
            submission,
            fully_responded,
        }];
        self.transition(
            ProcessStatus::AdendaInReview,
            &format!("adenda {submission} filed for round {round_number}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    /// Amend a response on the adenda under review.
    pub fn record_response(
        &mut self,
        round_number: u32,
        draft: ResponseDraft,
    ) -> Result<(), TrackerError> {
        self.guard(&[ProcessStatus::AdendaInReview], "record_response")?;
        self.round_mut(round_number)?.record_response(draft)
    }

    pub fn qualify_adenda(
        &mut self,
        round_number: u32,
        review_date: NaiveDate,
        result: ReviewResult,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(&[ProcessStatus::AdendaInReview], "qualify_adenda")?;
        let reopened = self.round_mut(round_number)?.qualify_adenda(review_date, result)?;
        if reopened > 0 {
            warn!(
                project = %self.project_id,
                round = round_number,
                reopened,
                "insufficient review re-opened observations"
            );
        }
        let mut events = vec![DomainEvent::AdendaQualified {
            project_id: self.project_id.clone(),
            round: round_number,
            result,
            reopened,
        }];
        self.transition(
            ProcessStatus::InEvaluation,
            &format!("adenda for round {round_number} reviewed as {result}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    // ── Consolidation and ruling ──

    /// Issue the consolidated technical report (ICE).
    ///
    /// With critical observations still pending this fails unless the
    /// explicit override flag is set; the override is recorded as a
    /// warning, not silently absorbed: the regulator makes that call,
    /// not the tool.
    pub fn issue_ice(
        &mut self,
        date: NaiveDate,
        override_critical: bool,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(
            &[ProcessStatus::InEvaluation, ProcessStatus::IcsaraIssued],
            "issue_ice",
        )?;
        let pending = self.pending_critical_count();
        let mut events = Vec::new();
        if pending > 0 {
            if !override_critical {
                return Err(TrackerError::CriticalObservationsPending { pending });
            }
            warn!(
                project = %self.project_id,
                pending,
                "ICE issued with critical observations pending (override)"
            );
            events.push(DomainEvent::CriticalOverride {
                project_id: self.project_id.clone(),
                pending,
            });
            self.transition(
                ProcessStatus::IceIssued,
                &format!("ICE issued {date}; override with {pending} critical observation(s) pending"),
                now,
                actor,
                &mut events,
            );
        } else {
            self.transition(
                ProcessStatus::IceIssued,
                &format!("ICE issued {date}"),
                now,
                actor,
                &mut events,
            );
        }
        Ok(events)
    }

    pub fn enter_commission(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(&[ProcessStatus::IceIssued], "enter_commission")?;
        let mut events = Vec::new();
        self.transition(
            ProcessStatus::InCommission,
            &format!("evaluation commission convened {date}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    pub fn register_ruling(
        &mut self,
        result: RulingResult,
        document_ref: &str,
        date: NaiveDate,
        conditions: Vec<RulingCondition>,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        self.guard(&[ProcessStatus::InCommission], "register_ruling")?;
        if document_ref.trim().is_empty() {
            return Err(TrackerError::Validation {
                field: "document_ref",
                reason: "must not be empty".into(),
            });
        }
        for (i, condition) in conditions.iter().enumerate() {
            if condition.number != i as u32 + 1 {
                return Err(TrackerError::Validation {
                    field: "conditions",
                    reason: format!(
                        "condition numbers must run 1..={}, found {} at position {}",
                        conditions.len(),
                        condition.number,
                        i + 1
                    ),
                });
            }
        }

        let condition_count = conditions.len();
        self.ruling = Some(Ruling {
            result,
            document_ref: document_ref.to_string(),
            ruled_on: date,
            conditions,
        });
        let mut events = vec![DomainEvent::RulingRegistered {
            project_id: self.project_id.clone(),
            result,
            conditions: condition_count,
        }];
        let to = match result {
            RulingResult::Approved => ProcessStatus::RulingApproved,
            RulingResult::Rejected => ProcessStatus::RulingRejected,
        };
        self.transition(
            to,
            &format!("RCA {result} {date}, resolution {document_ref}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    pub fn withdraw(
        &mut self,
        date: NaiveDate,
        reason: &str,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        if self.status.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                action: "withdraw",
            });
        }
        let mut events = Vec::new();
        self.transition(
            ProcessStatus::Withdrawn,
            &format!("withdrawn by applicant {date}: {reason}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    pub fn lapse(
        &mut self,
        date: NaiveDate,
        reason: &str,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        if self.status.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                action: "lapse",
            });
        }
        let mut events = Vec::new();
        self.transition(
            ProcessStatus::Lapsed,
            &format!("lapsed {date}: {reason}"),
            now,
            actor,
            &mut events,
        );
        Ok(events)
    }

    // ── Suspensions ──

    pub fn register_suspension(
        &mut self,
        from: NaiveDate,
        to: Option<NaiveDate>,
        reason: &str,
    ) -> Result<Vec<DomainEvent>, TrackerError> {
        if self.status.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                action: "register_suspension",
            });
        }
        if let Some(to_date) = to
            && to_date < from
        {
            return Err(TrackerError::Validation {
                field: "suspension",
                reason: format!("end {to_date} precedes start {from}"),
            });
        }
        if self.open_suspension().is_some() {
            return Err(TrackerError::Validation {
                field: "suspension",
                reason: "a suspension is already open".into(),
            });
        }
        self.suspensions.push(Suspension {
            from,
            to,
            reason: reason.to_string(),
        });
        info!(project = %self.project_id, %from, "legal clock suspended");
        Ok(vec![DomainEvent::SuspensionRegistered {
            project_id: self.project_id.clone(),
            from,
            to,
        }])
    }

    pub fn lift_suspension(&mut self, to: NaiveDate) -> Result<Vec<DomainEvent>, TrackerError> {
        if self.status.is_terminal() {
            return Err(TrackerError::InvalidTransition {
                from: self.status,
                action: "lift_suspension",
            });
        }
        let Some(open) = self.suspensions.iter_mut().find(|s| s.to.is_none()) else {
            return Err(TrackerError::Validation {
                field: "suspension",
                reason: "no suspension is open".into(),
            });
        };
        if to < open.from {
            return Err(TrackerError::Validation {
                field: "suspension",
                reason: format!("end {to} precedes start {}", open.from),
            });
        }
        open.to = Some(to);
        info!(project = %self.project_id, %to, "legal clock resumed");
        Ok(vec![DomainEvent::SuspensionLifted {
            project_id: self.project_id.clone(),
            to,
        }])
    }

    // ── Expiry scan ──

    /// Mark overdue unanswered rounds expired. Idempotent: a second run
    /// on the same date reports nothing new.
    pub fn expire_rounds(&mut self, as_of: NaiveDate) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        if self.status.is_terminal() {
            return events;
        }
        let project_id = self.project_id.clone();
        for round in &mut self.rounds {
            if round.expire(as_of) {
                warn!(
                    project = %project_id,
                    round = round.number,
                    due = %round.due_on,
                    "round expired unanswered"
                );
                events.push(DomainEvent::RoundExpired {
                    project_id: project_id.clone(),
                    round: round.number,
                    due_on: round.due_on,
                });
            }
        }
        events
    }

    // ── Internals ──

    fn guard(
        &self,
        expected: &[ProcessStatus],
        action: &'static str,
    ) -> Result<(), TrackerError> {
        if expected.contains(&self.status) {
            Ok(())
        } else {
            Err(TrackerError::InvalidTransition {
                from: self.status,
                action,
            })
        }
    }

    fn transition(
        &mut self,
        to: ProcessStatus,
        reason: &str,
        now: DateTime<Utc>,
        actor: &str,
        events: &mut Vec<DomainEvent>,
    ) {
        let from = self.status;
        self.transitions.push(TransitionRecord {
            at: now,
            from,
            to,
            reason: reason.to_string(),
            actor: actor.to_string(),
        });
        self.status = to;
        info!(project = %self.project_id, %from, %to, reason, "process transition");
        events.push(DomainEvent::StatusChanged {
            project_id: self.project_id.clone(),
            from,
            to,
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{ObservationKind, ResponseResolution};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        date(2026, 1, 15).and_time(chrono::NaiveTime::MIN).and_utc()
    }

    fn eia_config() -> InstrumentConfig {
        InstrumentConfig {
            legal_limit_days: 120,
            max_icsara_rounds: 2,
            day_count: DayCount::Calendar,
        }
    }

    fn started() -> Process {
        let (process, _) = Process::start(
            "mina-quebrada-norte",
            Instrument::Eia,
            date(2026, 1, 5),
            &eia_config(),
            now(),
            "sea",
        )
        .unwrap();
        process
    }

    fn in_evaluation() -> Process {
        let mut process = started();
        process
            .register_admissibility(AdmissibilityResult::Admitted, date(2026, 1, 10), now(), "sea")
            .unwrap();
        process.begin_evaluation(date(2026, 1, 12), now(), "sea").unwrap();
        process
    }

    fn obs(agency: &str, priority: Priority) -> ObservationDraft {
        ObservationDraft {
            agency: agency.to_string(),
            chapter: "air quality".to_string(),
            kind: ObservationKind::Amendment,
            priority,
            body: "re-run the dispersion model with winter data".to_string(),
        }
    }

    fn answer(id: u64) -> ResponseDraft {
        ResponseDraft {
            observation_id: id,
            body: "model re-run attached".to_string(),
            attachments: vec![],
            resolution: ResponseResolution::Answered,
        }
    }

    #[test]
    fn start_lands_in_submitted_with_one_transition() {
        let process = started();
        assert_eq!(process.status, ProcessStatus::Submitted);
        assert_eq!(process.transitions.len(), 1);
        assert_eq!(process.transitions[0].from, ProcessStatus::NotSubmitted);
        assert_eq!(process.transitions[0].to, ProcessStatus::Submitted);
    }

    #[test]
    fn admissibility_sets_result_and_date() {
        let mut process = started();
        process
            .register_admissibility(AdmissibilityResult::Admitted, date(2026, 1, 10), now(), "sea")
            .unwrap();
        assert_eq!(process.status, ProcessStatus::Admitted);
        assert_eq!(process.admissibility, Some(AdmissibilityResult::Admitted));
        assert_eq!(process.admissibility_on, Some(date(2026, 1, 10)));
    }

    #[test]
    fn inadmissibility_is_terminal() {
        let mut process = started();
        process
            .register_admissibility(
                AdmissibilityResult::Inadmitted,
                date(2026, 1, 10),
                now(),
                "sea",
            )
            .unwrap();
        assert!(process.status.is_terminal());
        let result = process.begin_evaluation(date(2026, 1, 12), now(), "sea");
        assert!(matches!(result, Err(TrackerError::InvalidTransition { .. })));
    }

    #[test]
    fn round_numbers_increase_from_one() {
        let mut process = in_evaluation();
        let (n1, _) = process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![obs("DGA", Priority::Minor)],
                now(),
                "sea",
            )
            .unwrap();
        process
            .file_adenda(1, date(2026, 3, 1), vec![answer(1)], now(), "titular")
            .unwrap();
        process
            .qualify_adenda(1, date(2026, 3, 5), ReviewResult::PartiallySufficient, now(), "sea")
            .unwrap();
        let (n2, _) = process
            .issue_round(
                date(2026, 3, 10),
                date(2026, 4, 20),
                vec![obs("CONAF", Priority::Minor)],
                now(),
                "sea",
            )
            .unwrap();
        assert_eq!((n1, n2), (1, 2));
    }

    #[test]
    fn round_cap_fails_and_leaves_state_unchanged() {
        // Cap of 2: the third issuance must fail without touching state.
        let mut process = in_evaluation();
        for round in 1..=2u32 {
            process
                .issue_round(
                    date(2026, 2, 1),
                    date(2026, 3, 15),
                    vec![obs("DGA", Priority::Critical)],
                    now(),
                    "sea",
                )
                .unwrap();
            process
                .file_adenda(round, date(2026, 3, 1), vec![], now(), "titular")
                .unwrap();
            process
                .qualify_adenda(round, date(2026, 3, 5), ReviewResult::Insufficient, now(), "sea")
                .unwrap();
        }
        let before_status = process.status;
        let before_transitions = process.transitions.len();
        let result = process.issue_round(
            date(2026, 4, 1),
            date(2026, 5, 15),
            vec![obs("DGA", Priority::Minor)],
            now(),
            "sea",
        );
        assert!(matches!(
            result,
            Err(TrackerError::RoundLimitExceeded { cap: 2, unresolved_critical: 2 })
        ));
        assert_eq!(process.status, before_status);
        assert_eq!(process.transitions.len(), before_transitions);
        assert_eq!(process.rounds.len(), 2);
    }

    #[test]
    fn ruling_outside_commission_is_invalid() {
        // A ruling can only come out of the commission.
        let mut process = in_evaluation();
        process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![obs("DGA", Priority::Minor)],
                now(),
                "sea",
            )
            .unwrap();
        let before = process.status;
        let result = process.register_ruling(
            RulingResult::Approved,
            "RCA-042",
            date(2026, 6, 1),
            vec![],
            now(),
            "comision",
        );
        assert!(matches!(
            result,
            Err(TrackerError::InvalidTransition { action: "register_ruling", .. })
        ));
        assert_eq!(process.status, before);
        assert!(process.ruling.is_none());
    }

    #[test]
    fn full_cycle_to_approved_ruling() {
        let mut process = in_evaluation();
        process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![obs("DGA", Priority::Critical)],
                now(),
                "sea",
            )
            .unwrap();
        process
            .file_adenda(1, date(2026, 3, 1), vec![answer(1)], now(), "titular")
            .unwrap();
        process
            .qualify_adenda(1, date(2026, 3, 5), ReviewResult::Sufficient, now(), "sea")
            .unwrap();
        process.issue_ice(date(2026, 4, 1), false, now(), "sea").unwrap();
        process.enter_commission(date(2026, 4, 15), now(), "sea").unwrap();
        let events = process
            .register_ruling(
                RulingResult::Approved,
                "RCA-2026-117",
                date(2026, 5, 2),
                vec![RulingCondition {
                    number: 1,
                    description: "quarterly groundwater monitoring".to_string(),
                    deadline: None,
                    responsible: "titular".to_string(),
                }],
                now(),
                "comision",
            )
            .unwrap();
        assert_eq!(process.status, ProcessStatus::RulingApproved);
        assert!(process.ruling.is_some());
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::RulingRegistered { conditions: 1, .. })));
    }

    #[test]
    fn ice_blocked_by_pending_critical_without_override() {
        let mut process = in_evaluation();
        process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![obs("DGA", Priority::Critical)],
                now(),
                "sea",
            )
            .unwrap();
        process
            .file_adenda(1, date(2026, 3, 1), vec![], now(), "titular")
            .unwrap();
        process
            .qualify_adenda(1, date(2026, 3, 5), ReviewResult::PartiallySufficient, now(), "sea")
            .unwrap();
        let result = process.issue_ice(date(2026, 4, 1), false, now(), "sea");
        assert!(matches!(
            result,
            Err(TrackerError::CriticalObservationsPending { pending: 1 })
        ));

        let events = process.issue_ice(date(2026, 4, 1), true, now(), "sea").unwrap();
        assert_eq!(process.status, ProcessStatus::IceIssued);
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::CriticalOverride { pending: 1, .. })));
    }

    #[test]
    fn no_transition_leaves_a_terminal_state() {
        let mut process = in_evaluation();
        process.withdraw(date(2026, 2, 1), "project cancelled", now(), "titular").unwrap();
        assert_eq!(process.status, ProcessStatus::Withdrawn);

        assert!(process.begin_evaluation(date(2026, 2, 2), now(), "sea").is_err());
        assert!(process
            .issue_round(date(2026, 2, 2), date(2026, 3, 1), vec![obs("DGA", Priority::Minor)], now(), "sea")
            .is_err());
        assert!(process.issue_ice(date(2026, 2, 2), true, now(), "sea").is_err());
        assert!(process.enter_commission(date(2026, 2, 2), now(), "sea").is_err());
        assert!(process
            .register_ruling(RulingResult::Approved, "RCA-1", date(2026, 2, 2), vec![], now(), "sea")
            .is_err());
        assert!(process.withdraw(date(2026, 2, 2), "again", now(), "titular").is_err());
        assert!(process.lapse(date(2026, 2, 2), "timeout", now(), "sea").is_err());
        assert!(process
            .register_suspension(date(2026, 2, 2), None, "pause")
            .is_err());
        assert_eq!(process.status, ProcessStatus::Withdrawn);
    }

    #[test]
    fn every_terminal_state_rejects_every_mutation() {
        let terminals = [
            ProcessStatus::Inadmitted,
            ProcessStatus::RulingApproved,
            ProcessStatus::RulingRejected,
            ProcessStatus::Withdrawn,
            ProcessStatus::Lapsed,
        ];
        for terminal in terminals {
            let mut process = started();
            process.status = terminal;
            let before = process.transitions.len();

            assert!(process.begin_admissibility(date(2026, 2, 1), now(), "sea").is_err());
            assert!(process
                .register_admissibility(AdmissibilityResult::Admitted, date(2026, 2, 1), now(), "sea")
                .is_err());
            assert!(process.begin_evaluation(date(2026, 2, 1), now(), "sea").is_err());
            assert!(process
                .issue_round(date(2026, 2, 1), date(2026, 3, 1), vec![obs("DGA", Priority::Minor)], now(), "sea")
                .is_err());
            assert!(process.issue_ice(date(2026, 2, 1), true, now(), "sea").is_err());
            assert!(process.enter_commission(date(2026, 2, 1), now(), "sea").is_err());
            assert!(process
                .register_ruling(RulingResult::Approved, "RCA-1", date(2026, 2, 1), vec![], now(), "sea")
                .is_err());
            assert!(process.withdraw(date(2026, 2, 1), "late", now(), "titular").is_err());
            assert!(process.lapse(date(2026, 2, 1), "late", now(), "sea").is_err());
            assert!(process.register_suspension(date(2026, 2, 1), None, "pause").is_err());
            assert!(process.lift_suspension(date(2026, 2, 1)).is_err());
            assert!(process.expire_rounds(date(2026, 2, 1)).is_empty());

            assert_eq!(process.status, terminal, "state must not leave {terminal}");
            assert_eq!(process.transitions.len(), before);
        }
    }

    #[test]
    fn suspension_accrues_and_stops_at_lift() {
        let mut process = in_evaluation();
        process
            .register_suspension(date(2026, 2, 1), None, "adenda preparation")
            .unwrap();
        assert_eq!(process.suspended_days(date(2026, 2, 11)), 10);
        process.lift_suspension(date(2026, 2, 15)).unwrap();
        assert_eq!(process.suspended_days(date(2026, 3, 1)), 14);
        // Suspended days feed the deadline report.
        let report = process.deadline(date(2026, 3, 1));
        assert_eq!(report.suspended_days, 14);
    }

    #[test]
    fn only_one_open_suspension_at_a_time() {
        let mut process = in_evaluation();
        process
            .register_suspension(date(2026, 2, 1), None, "adenda preparation")
            .unwrap();
        let result = process.register_suspension(date(2026, 2, 5), None, "another");
        assert!(matches!(
            result,
            Err(TrackerError::Validation { field: "suspension", .. })
        ));
    }

    #[test]
    fn expiry_scan_is_idempotent() {
        let mut process = in_evaluation();
        process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![obs("DGA", Priority::Minor)],
                now(),
                "sea",
            )
            .unwrap();
        let first = process.expire_rounds(date(2026, 4, 1));
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0], DomainEvent::RoundExpired { round: 1, .. }));
        let second = process.expire_rounds(date(2026, 4, 1));
        assert!(second.is_empty());
    }

    #[test]
    fn ruling_conditions_must_be_sequential() {
        let mut process = in_evaluation();
        process.issue_ice(date(2026, 4, 1), false, now(), "sea").unwrap();
        process.enter_commission(date(2026, 4, 15), now(), "sea").unwrap();
        let result = process.register_ruling(
            RulingResult::Approved,
            "RCA-9",
            date(2026, 5, 1),
            vec![RulingCondition {
                number: 3,
                description: "monitoring".to_string(),
                deadline: None,
                responsible: "titular".to_string(),
            }],
            now(),
            "comision",
        );
        assert!(matches!(
            result,
            Err(TrackerError::Validation { field: "conditions", .. })
        ));
        assert_eq!(process.status, ProcessStatus::InCommission);
    }

    #[test]
    fn empty_adenda_is_a_valid_filing_but_answers_nothing() {
        let mut process = in_evaluation();
        process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![obs("DGA", Priority::Critical)],
                now(),
                "sea",
            )
            .unwrap();
        process
            .file_adenda(1, date(2026, 3, 1), vec![], now(), "titular")
            .unwrap();
        assert_eq!(process.status, ProcessStatus::AdendaInReview);
        assert_eq!(process.round(1).unwrap().status, RoundStatus::PartiallyResponded);
        assert_eq!(process.pending_critical_count(), 1);
    }
}
