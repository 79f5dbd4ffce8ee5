//! Per-instrument configuration: legal limits, round caps, and day counting.
//!
//! Limits vary by submission instrument (EIA vs DIA), and deployments add
//! sector variants by registering entries at runtime rather than by code
//! change. The configuration is resolved once, at process creation, and
//! copied into the process record so later registry edits never rewrite
//! history.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// The two SEIA submission instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    /// Full Environmental Impact Study.
    Eia,
    /// Environmental Impact Declaration.
    Dia,
}

impl Instrument {
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Eia => "eia",
            Instrument::Dia => "dia",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eia" => Ok(Instrument::Eia),
            "dia" => Ok(Instrument::Dia),
            other => Err(TrackerError::Validation {
                field: "instrument",
                reason: format!("unknown instrument {other:?}, expected eia or dia"),
            }),
        }
    }
}

/// How legal days are counted for an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DayCount {
    /// Plain calendar days.
    Calendar,
    /// Monday to Friday, minus the listed holidays.
    Business { holidays: Vec<NaiveDate> },
}

impl DayCount {
    /// Days from `start` (exclusive) to `end` (inclusive).
    ///
    /// Calendar counting goes negative when `end` precedes `start`;
    /// business counting bottoms out at zero.
    pub fn days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        match self {
            DayCount::Calendar => (end - start).num_days(),
            DayCount::Business { holidays } => {
                if end <= start {
                    return 0;
                }
                let mut days = 0;
                let mut cursor = start;
                while cursor < end {
                    let Some(next) = cursor.succ_opt() else { break };
                    cursor = next;
                    let weekend = matches!(cursor.weekday(), Weekday::Sat | Weekday::Sun);
                    if !weekend && !holidays.contains(&cursor) {
                        days += 1;
                    }
                }
                days
            }
        }
    }
}

/// Limits and counting rules for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub legal_limit_days: i64,
    pub max_icsara_rounds: u32,
    pub day_count: DayCount,
}

/// Registry of per-instrument configuration, injected at process creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRegistry {
    entries: HashMap<Instrument, InstrumentConfig>,
}

impl Default for ConfigRegistry {
    /// Statutory defaults: 120 days and up to two ICSARA rounds for an
    /// EIA, 60 days and a single round for a DIA, calendar counting.
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            Instrument::Eia,
            InstrumentConfig {
                legal_limit_days: 120,
                max_icsara_rounds: 2,
                day_count: DayCount::Calendar,
            },
        );
        entries.insert(
            Instrument::Dia,
            InstrumentConfig {
                legal_limit_days: 60,
                max_icsara_rounds: 1,
                day_count: DayCount::Calendar,
            },
        );
        Self { entries }
    }
}

impl ConfigRegistry {
    pub fn get(&self, instrument: Instrument) -> Result<&InstrumentConfig, TrackerError> {
        self.entries
            .get(&instrument)
            .ok_or_else(|| TrackerError::Validation {
                field: "instrument",
                reason: format!("no configuration registered for {instrument}"),
            })
    }

    /// Register or replace the configuration for an instrument.
    pub fn set(
        &mut self,
        instrument: Instrument,
        config: InstrumentConfig,
    ) -> Result<(), TrackerError> {
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
        self.entries.insert(instrument, config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_cover_both_instruments() {
        let registry = ConfigRegistry::default();
        assert_eq!(registry.get(Instrument::Eia).unwrap().legal_limit_days, 120);
        assert_eq!(registry.get(Instrument::Dia).unwrap().legal_limit_days, 60);
        assert_eq!(registry.get(Instrument::Eia).unwrap().max_icsara_rounds, 2);
    }

    #[test]
    fn set_rejects_zero_limit() {
        let mut registry = ConfigRegistry::default();
        let result = registry.set(
            Instrument::Dia,
            InstrumentConfig {
                legal_limit_days: 0,
                max_icsara_rounds: 1,
                day_count: DayCount::Calendar,
            },
        );
        assert!(matches!(
            result,
            Err(TrackerError::Validation { field: "legal_limit_days", .. })
        ));
    }

    #[test]
    fn set_overrides_instrument_entry() {
        let mut registry = ConfigRegistry::default();
        registry
            .set(
                Instrument::Eia,
                InstrumentConfig {
                    legal_limit_days: 180,
                    max_icsara_rounds: 3,
                    day_count: DayCount::Calendar,
                },
            )
            .unwrap();
        assert_eq!(registry.get(Instrument::Eia).unwrap().legal_limit_days, 180);
    }

    #[test]
    fn calendar_days_are_plain_differences() {
        let count = DayCount::Calendar;
        assert_eq!(count.days_between(date(2026, 1, 5), date(2026, 1, 15)), 10);
        assert_eq!(count.days_between(date(2026, 1, 15), date(2026, 1, 5)), -10);
        assert_eq!(count.days_between(date(2026, 1, 5), date(2026, 1, 5)), 0);
    }

    #[test]
    fn business_days_skip_weekends() {
        let count = DayCount::Business { holidays: vec![] };
        // Mon 2026-01-05 through Mon 2026-01-12: five weekdays.
        assert_eq!(count.days_between(date(2026, 1, 5), date(2026, 1, 12)), 5);
    }

    #[test]
    fn business_days_skip_holidays() {
        let count = DayCount::Business {
            holidays: vec![date(2026, 1, 9)],
        };
        assert_eq!(count.days_between(date(2026, 1, 5), date(2026, 1, 12)), 4);
    }

    #[test]
    fn business_days_never_negative() {
        let count = DayCount::Business { holidays: vec![] };
        assert_eq!(count.days_between(date(2026, 1, 12), date(2026, 1, 5)), 0);
    }

    #[test]
    fn instrument_parses_case_insensitively() {
        assert_eq!("EIA".parse::<Instrument>().unwrap(), Instrument::Eia);
        assert_eq!("dia".parse::<Instrument>().unwrap(), Instrument::Dia);
        assert!("seia".parse::<Instrument>().is_err());
    }
}
