use chrono::NaiveDate;
use thiserror::Error;

use crate::process::ProcessStatus;
use crate::round::RoundStatus;

/// Error taxonomy for the evaluation process tracker.
///
/// Every failure is a value returned to the caller. Nothing here aborts
/// the hosting process; the only variant a caller should retry on is
/// [`StaleProcessState`](TrackerError::StaleProcessState), and the retry
/// decision belongs to the caller.
#[derive(Debug, Error)]
pub enum TrackerError {
    // ── Validation ──
    #[error("invalid value for {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("response due date {due} precedes emission date {emitted}")]
    InvalidDueDate { emitted: NaiveDate, due: NaiveDate },

    // ── State conflicts ──
    #[error("{action} is not valid while the process is {from}")]
    InvalidTransition {
        from: ProcessStatus,
        action: &'static str,
    },

    #[error(
        "icsara round cap of {cap} reached; {unresolved_critical} critical observation(s) remain unresolved"
    )]
    RoundLimitExceeded { cap: u32, unresolved_critical: usize },

    #[error("round {round} already has an active adenda (submission {submission})")]
    DuplicateSubmission { round: u32, submission: u32 },

    #[error("stale process state: expected revision {expected}, found {found}")]
    StaleProcessState { expected: u64, found: u64 },

    #[error("{pending} critical observation(s) still pending; set the override flag to proceed")]
    CriticalObservationsPending { pending: usize },

    #[error("adenda for round {round} cannot be accepted: {pending} observation(s) not fully answered")]
    AdendaIncomplete { round: u32, pending: usize },

    // ── Consistency (caller bugs, never coerced) ──
    #[error("observation {id} does not exist in the round being answered")]
    UnknownObservation { id: u64 },

    #[error("observation {id} does not belong to round {round}")]
    ObservationNotInRound { id: u64, round: u32 },

    #[error("round {round} is {status}; observations can only be added while emitted or partially responded")]
    InvalidRoundState { round: u32, status: RoundStatus },

    // ── Not found ──
    #[error("no process for project {0}")]
    ProcessNotFound(String),

    #[error("process has no round {0}")]
    RoundNotFound(u32),
}
