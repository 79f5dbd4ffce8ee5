//! Read-only projection of a process for display and notification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::Instrument;
use crate::deadline::{DeadlineReport, RiskStatus};
use crate::observation::ObservationSummary;
use crate::process::{Process, ProcessStatus};
use crate::round::RoundStatus;

/// The next move the process is waiting on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NextAction {
    Submit,
    ResolveAdmissibility,
    BeginEvaluation,
    IssueRoundOrIce,
    FileAdenda { round: u32, due_on: NaiveDate },
    QualifyAdenda { round: u32 },
    EnterCommission,
    RegisterRuling,
    Closed,
}

/// Human-facing snapshot: state, binding deadline, observation counts,
/// risk flags, and the next required action. Derived on every read,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub project_id: String,
    pub instrument: Instrument,
    pub status: ProcessStatus,
    pub as_of: NaiveDate,
    pub deadline: DeadlineReport,
    pub rounds_used: u32,
    pub rounds_cap: u32,
    pub observations: ObservationSummary,
    pub next_action: NextAction,
    pub warnings: Vec<String>,
}

impl ProcessSummary {
    pub fn project(process: &Process, as_of: NaiveDate) -> Self {
        let deadline = process.deadline(as_of);
        let observations =
            ObservationSummary::collect(process.rounds.iter().flat_map(|r| &r.observations));

        let mut warnings = Vec::new();
        match deadline.risk {
            RiskStatus::Alert => warnings.push(format!(
                "legal deadline at {:.0}% consumed",
                deadline.percent_consumed
            )),
            RiskStatus::Critical => warnings.push(format!(
                "legal deadline critical: {} day(s) remaining",
                deadline.remaining_days
            )),
            RiskStatus::Expired => warnings.push(format!(
                "legal deadline expired {} day(s) ago",
                -deadline.remaining_days
            )),
            RiskStatus::NotStarted | RiskStatus::Normal => {}
        }
        for round in &process.rounds {
            if round.status == RoundStatus::Expired {
                warnings.push(format!(
                    "round {} expired unanswered on {}",
                    round.number, round.due_on
                ));
            }
        }
        let pending_critical = process.pending_critical_count();
        if pending_critical > 0 {
            warnings.push(format!("{pending_critical} critical observation(s) pending"));
        }
        if let Some(suspension) = process.open_suspension() {
            warnings.push(format!(
                "suspended since {} ({})",
                suspension.from, suspension.reason
            ));
        }

        Self {
            project_id: process.project_id.clone(),
            instrument: process.instrument,
            status: process.status,
            as_of,
            deadline,
            rounds_used: process.rounds.len() as u32,
            rounds_cap: process.max_rounds,
            observations,
            next_action: next_action(process),
            warnings,
        }
    }
}

fn next_action(process: &Process) -> NextAction {
    match process.status {
        ProcessStatus::NotSubmitted => NextAction::Submit,
        ProcessStatus::Submitted | ProcessStatus::InAdmissibility => {
            NextAction::ResolveAdmissibility
        }
        ProcessStatus::Admitted => NextAction::BeginEvaluation,
        ProcessStatus::InEvaluation => NextAction::IssueRoundOrIce,
        ProcessStatus::IcsaraIssued => match process.rounds.last() {
            Some(round) => NextAction::FileAdenda {
                round: round.number,
                due_on: round.due_on,
            },
            None => NextAction::IssueRoundOrIce,
        },
        ProcessStatus::AdendaInReview => match process.rounds.last() {
            Some(round) => NextAction::QualifyAdenda {
                round: round.number,
            },
            None => NextAction::IssueRoundOrIce,
        },
        ProcessStatus::IceIssued => NextAction::EnterCommission,
        ProcessStatus::InCommission => NextAction::RegisterRuling,
        ProcessStatus::Inadmitted
        | ProcessStatus::RulingApproved
        | ProcessStatus::RulingRejected
        | ProcessStatus::Withdrawn
        | ProcessStatus::Lapsed => NextAction::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DayCount, InstrumentConfig};
    use crate::observation::{ObservationDraft, ObservationKind, Priority};
    use crate::process::AdmissibilityResult;
    use chrono::{NaiveTime, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> chrono::DateTime<Utc> {
        date(2026, 1, 15).and_time(NaiveTime::MIN).and_utc()
    }

    fn process_with_round() -> Process {
        let config = InstrumentConfig {
            legal_limit_days: 120,
            max_icsara_rounds: 2,
            day_count: DayCount::Calendar,
        };
        let (mut process, _) = Process::start(
            "puerto-seco-maipo",
            Instrument::Eia,
            date(2026, 1, 5),
            &config,
            now(),
            "sea",
        )
        .unwrap();
        process
            .register_admissibility(AdmissibilityResult::Admitted, date(2026, 1, 10), now(), "sea")
            .unwrap();
        process.begin_evaluation(date(2026, 1, 12), now(), "sea").unwrap();
        process
            .issue_round(
                date(2026, 2, 1),
                date(2026, 3, 15),
                vec![ObservationDraft {
                    agency: "DGA".to_string(),
                    chapter: "hydrology".to_string(),
                    kind: ObservationKind::Clarification,
                    priority: Priority::Critical,
                    body: "justify the water balance".to_string(),
                }],
                now(),
                "sea",
            )
            .unwrap();
        process
    }

    #[test]
    fn next_action_tracks_the_open_round() {
        let process = process_with_round();
        let summary = ProcessSummary::project(&process, date(2026, 2, 10));
        assert_eq!(
            summary.next_action,
            NextAction::FileAdenda { round: 1, due_on: date(2026, 3, 15) }
        );
        assert_eq!(summary.rounds_used, 1);
        assert_eq!(summary.rounds_cap, 2);
    }

    #[test]
    fn pending_critical_raises_a_warning() {
        let process = process_with_round();
        let summary = ProcessSummary::project(&process, date(2026, 2, 10));
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("1 critical observation(s) pending")));
        assert_eq!(
            summary.observations.agencies_with_open_critical,
            vec!["DGA".to_string()]
        );
    }

    #[test]
    fn expired_deadline_surfaces_in_summary() {
        // An EIA at day 130 of its 120-day limit reads as expired, -10 remaining.
        let process = process_with_round();
        let summary = ProcessSummary::project(&process, date(2026, 5, 15));
        assert_eq!(summary.deadline.remaining_days, -10);
        assert_eq!(summary.deadline.risk, RiskStatus::Expired);
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("expired 10 day(s) ago")));
    }

    #[test]
    fn expired_round_is_flagged() {
        let mut process = process_with_round();
        process.expire_rounds(date(2026, 4, 1));
        let summary = ProcessSummary::project(&process, date(2026, 4, 1));
        assert!(summary
            .warnings
            .iter()
            .any(|w| w.contains("round 1 expired unanswered")));
    }

    #[test]
    fn terminal_process_has_no_next_action() {
        let mut process = process_with_round();
        process
            .withdraw(date(2026, 3, 1), "financing fell through", now(), "titular")
            .unwrap();
        let summary = ProcessSummary::project(&process, date(2026, 3, 1));
        assert_eq!(summary.next_action, NextAction::Closed);
    }

    #[test]
    fn projection_is_read_only() {
        let process = process_with_round();
        let a = ProcessSummary::project(&process, date(2026, 2, 10));
        let b = ProcessSummary::project(&process, date(2026, 2, 10));
        assert_eq!(a, b);
    }
}
