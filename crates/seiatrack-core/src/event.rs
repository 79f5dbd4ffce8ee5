//! Domain events and the append-only transition history.
//!
//! Every mutating operation returns the events it produced; the hosting
//! layer commits state and fans the events out to whatever notification
//! component subscribes. The tracker itself carries no scheduling or
//! cooldown logic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::process::{ProcessStatus, RulingResult};
use crate::round::ReviewResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    StatusChanged {
        project_id: String,
        from: ProcessStatus,
        to: ProcessStatus,
        reason: String,
    },
    RoundIssued {
        project_id: String,
        round: u32,
        observations: usize,
        due_on: NaiveDate,
    },
    RoundExpired {
        project_id: String,
        round: u32,
        due_on: NaiveDate,
    },
    AdendaFiled {
        project_id: String,
        round: u32,
        submission: u32,
        fully_responded: bool,
    },
    AdendaQualified {
        project_id: String,
        round: u32,
        result: ReviewResult,
        reopened: usize,
    },
    SuspensionRegistered {
        project_id: String,
        from: NaiveDate,
        to: Option<NaiveDate>,
    },
    SuspensionLifted {
        project_id: String,
        to: NaiveDate,
    },
    CriticalOverride {
        project_id: String,
        pending: usize,
    },
    RulingRegistered {
        project_id: String,
        result: RulingResult,
        conditions: usize,
    },
}

/// One transition in a process's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub at: DateTime<Utc>,
    pub from: ProcessStatus,
    pub to: ProcessStatus,
    pub reason: String,
    pub actor: String,
}

/// A transition as written to the external audit sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub process_id: String,
    pub from: ProcessStatus,
    pub to: ProcessStatus,
    pub reason: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn from_transition(process_id: &str, record: &TransitionRecord) -> Self {
        Self {
            process_id: process_id.to_string(),
            from: record.from,
            to: record.to,
            reason: record.reason.clone(),
            actor: record.actor.clone(),
            at: record.at,
        }
    }
}
