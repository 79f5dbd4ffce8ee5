//! Legal-deadline arithmetic.
//!
//! Pure functions over a start date, a legal limit, and accumulated
//! suspended days. Safe to call on every read; calling twice with the
//! same inputs yields the same report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::DayCount;

/// Four-value risk classification plus the not-started sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    NotStarted,
    Normal,
    Alert,
    Critical,
    Expired,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::NotStarted => "not_started",
            RiskStatus::Normal => "normal",
            RiskStatus::Alert => "alert",
            RiskStatus::Critical => "critical",
            RiskStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed, effective, and remaining legal days as of a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineReport {
    pub elapsed_days: i64,
    pub suspended_days: i64,
    /// `elapsed - suspended`, floored at zero.
    pub effective_days: i64,
    /// `legal_limit - effective`. Negative once the limit is blown.
    pub remaining_days: i64,
    pub percent_consumed: f64,
    pub risk: RiskStatus,
}

impl DeadlineReport {
    /// Sentinel report for a process with no start date yet.
    pub fn not_started(legal_limit_days: i64) -> Self {
        Self {
            elapsed_days: 0,
            suspended_days: 0,
            effective_days: 0,
            remaining_days: legal_limit_days,
            percent_consumed: 0.0,
            risk: RiskStatus::NotStarted,
        }
    }
}

/// Assess the legal deadline as of `as_of`.
///
/// A `None` start date yields the not-started sentinel, never an error.
pub fn assess(
    start: Option<NaiveDate>,
    legal_limit_days: i64,
    suspended_days: i64,
    as_of: NaiveDate,
    day_count: &DayCount,
) -> DeadlineReport {
    let Some(start) = start else {
        return DeadlineReport::not_started(legal_limit_days);
    };

    let elapsed_days = day_count.days_between(start, as_of).max(0);
    let effective_days = (elapsed_days - suspended_days).max(0);
    let remaining_days = legal_limit_days - effective_days;
    let percent_consumed = if legal_limit_days > 0 {
        effective_days as f64 / legal_limit_days as f64 * 100.0
    } else {
        100.0
    };

    let risk = if remaining_days <= 0 {
        RiskStatus::Expired
    } else if percent_consumed >= 90.0 || remaining_days <= 5 {
        RiskStatus::Critical
    } else if percent_consumed >= 70.0 {
        RiskStatus::Alert
    } else {
        RiskStatus::Normal
    };

    DeadlineReport {
        elapsed_days,
        suspended_days,
        effective_days,
        remaining_days,
        percent_consumed,
        risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar(start: NaiveDate, limit: i64, suspended: i64, as_of: NaiveDate) -> DeadlineReport {
        assess(Some(start), limit, suspended, as_of, &DayCount::Calendar)
    }

    #[test]
    fn fresh_process_is_normal() {
        let report = calendar(date(2026, 1, 1), 120, 0, date(2026, 1, 31));
        assert_eq!(report.elapsed_days, 30);
        assert_eq!(report.effective_days, 30);
        assert_eq!(report.remaining_days, 90);
        assert_eq!(report.risk, RiskStatus::Normal);
    }

    #[test]
    fn alert_at_seventy_percent() {
        let report = calendar(date(2026, 1, 1), 100, 0, date(2026, 3, 12));
        assert_eq!(report.effective_days, 70);
        assert_eq!(report.risk, RiskStatus::Alert);
    }

    #[test]
    fn critical_at_ninety_percent() {
        let report = calendar(date(2026, 1, 1), 100, 0, date(2026, 4, 1));
        assert_eq!(report.effective_days, 90);
        assert_eq!(report.risk, RiskStatus::Critical);
    }

    #[test]
    fn critical_when_five_days_remain_regardless_of_percent() {
        // 35 of 40 days consumed is 87.5%; remaining 5 still flips critical.
        let report = calendar(date(2026, 1, 1), 40, 0, date(2026, 2, 5));
        assert!(report.percent_consumed < 90.0);
        assert_eq!(report.remaining_days, 5);
        assert_eq!(report.risk, RiskStatus::Critical);
    }

    #[test]
    fn expired_past_the_limit() {
        // 120-day limit read at day 130.
        let report = calendar(date(2026, 1, 1), 120, 0, date(2026, 5, 11));
        assert_eq!(report.elapsed_days, 130);
        assert_eq!(report.remaining_days, -10);
        assert_eq!(report.risk, RiskStatus::Expired);
    }

    #[test]
    fn suspension_pushes_back_the_clock() {
        let report = calendar(date(2026, 1, 1), 120, 40, date(2026, 5, 11));
        assert_eq!(report.elapsed_days, 130);
        assert_eq!(report.effective_days, 90);
        assert_eq!(report.remaining_days, 30);
        assert_eq!(report.risk, RiskStatus::Alert);
    }

    #[test]
    fn null_start_gives_sentinel() {
        let report = assess(None, 120, 0, date(2026, 1, 1), &DayCount::Calendar);
        assert_eq!(report.risk, RiskStatus::NotStarted);
        assert_eq!(report.remaining_days, 120);
        assert_eq!(report.percent_consumed, 0.0);
    }

    #[test]
    fn as_of_before_start_clamps_to_zero() {
        let report = calendar(date(2026, 6, 1), 120, 0, date(2026, 1, 1));
        assert_eq!(report.elapsed_days, 0);
        assert_eq!(report.risk, RiskStatus::Normal);
    }

    #[test]
    fn suspension_beyond_elapsed_floors_at_zero() {
        let report = calendar(date(2026, 1, 1), 120, 500, date(2026, 1, 10));
        assert_eq!(report.effective_days, 0);
        assert_eq!(report.remaining_days, 120);
    }

    #[test]
    fn business_day_counting_is_honoured() {
        let count = DayCount::Business { holidays: vec![] };
        // Mon 2026-01-05 + two full weeks of weekdays = 10 business days.
        let report = assess(Some(date(2026, 1, 5)), 60, 0, date(2026, 1, 19), &count);
        assert_eq!(report.elapsed_days, 10);
    }

    #[test]
    fn pure_function_is_idempotent() {
        let a = calendar(date(2026, 1, 1), 120, 12, date(2026, 4, 1));
        let b = calendar(date(2026, 1, 1), 120, 12, date(2026, 4, 1));
        assert_eq!(a, b);
    }
}
